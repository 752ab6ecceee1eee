//! Lowering tests: slot allocation, constant pooling, instruction
//! selection, and the error paths.

use vela_ast::{
    BinaryExpression, CallExpression, ClassDecl, Expression, ExpressionStatement, FieldDecl,
    Identifier, InterfaceDecl, Literal, LiteralValue, Member, MethodDecl, Module, NewExpression,
    ParamDecl, PropertyDecl, ReturnStatement, Span, SpaceDecl, Statement, TypeDecl, VariableDecl,
};
use vela_bytecode::{
    unpack_operand, Constant, Instruction, ModuleKind, Opcode, Program, TypeDef,
};
use vela_compiler::{lower, CompileError, DEFAULT_ENTRY_POINT};

// ===== AST builders =====

fn int(value: i32) -> Expression {
    Expression::Literal(Literal {
        value: LiteralValue::Int(value),
        span: Span::zero(),
    })
}

fn ident(name: &str) -> Expression {
    Expression::Identifier(Identifier {
        name: name.to_string(),
        span: Span::zero(),
    })
}

fn binary(op: &str, left: Expression, right: Expression) -> Expression {
    Expression::Binary(BinaryExpression {
        op: op.to_string(),
        left: Box::new(left),
        right: Box::new(right),
        span: Span::zero(),
    })
}

fn call(target: Expression, method: &str, arguments: Vec<Expression>) -> Expression {
    Expression::Call(CallExpression {
        target: Box::new(target),
        method: method.to_string(),
        arguments,
        span: Span::zero(),
    })
}

fn expr_stmt(expression: Expression) -> Statement {
    Statement::Expression(ExpressionStatement {
        expression,
        span: Span::zero(),
    })
}

fn ret(value: Option<Expression>) -> Statement {
    Statement::Return(ReturnStatement {
        value,
        span: Span::zero(),
    })
}

fn let_stmt(name: &str, initializer: Option<Expression>) -> Statement {
    Statement::VariableDecl(VariableDecl {
        name: name.to_string(),
        initializer,
        span: Span::zero(),
    })
}

fn method(name: &str, parameters: &[&str], body: Vec<Statement>) -> MethodDecl {
    MethodDecl {
        name: name.to_string(),
        parameters: parameters
            .iter()
            .map(|p| ParamDecl {
                name: p.to_string(),
                type_name: "i32".to_string(),
            })
            .collect(),
        return_type: "void".to_string(),
        body,
        span: Span::zero(),
    }
}

fn class(name: &str, members: Vec<Member>) -> TypeDecl {
    TypeDecl::Class(ClassDecl {
        name: name.to_string(),
        members,
        span: Span::zero(),
    })
}

fn space(name: &str, declarations: Vec<TypeDecl>, children: Vec<SpaceDecl>) -> SpaceDecl {
    SpaceDecl {
        name: name.to_string(),
        declarations,
        children,
        span: Span::zero(),
    }
}

fn module_with_body(body: Vec<Statement>) -> Module {
    let main = method("main", &[], body);
    let root = space("app", vec![class("Program", vec![Member::Method(main)])], vec![]);
    Module::new("app", true, Some(root))
}

fn only_method(program: &Program) -> &vela_bytecode::MethodDef {
    let TypeDef::Class(class) = &program.root.types[0];
    &class.methods[0]
}

// ===== Module shape =====

#[test]
fn executable_module_gets_entry_point() {
    let program = lower(&Module::new("app", true, Some(space("app", vec![], vec![])))).unwrap();
    assert_eq!(program.kind, ModuleKind::Executable);
    assert_eq!(program.entry_point.as_deref(), Some(DEFAULT_ENTRY_POINT));
}

#[test]
fn library_module_has_no_entry_point() {
    let program = lower(&Module::new("lib", false, Some(space("lib", vec![], vec![])))).unwrap();
    assert_eq!(program.kind, ModuleKind::Library);
    assert_eq!(program.entry_point, None);
}

#[test]
fn missing_root_space_is_rejected() {
    let result = lower(&Module::new("app", true, None));
    assert!(matches!(result, Err(CompileError::MissingRootSpace)));
}

#[test]
fn space_names_are_qualified_from_root() {
    let grandchild = space("pixels", vec![], vec![]);
    let child = space("render", vec![], vec![grandchild]);
    let root = space("app", vec![], vec![child]);
    let program = lower(&Module::new("app", false, Some(root))).unwrap();

    assert_eq!(program.root.name, "app");
    assert_eq!(program.root.subspaces[0].name, "app.render");
    assert_eq!(program.root.subspaces[0].subspaces[0].name, "app.render.pixels");
}

#[test]
fn interface_declaration_is_rejected() {
    let decl = TypeDecl::Interface(InterfaceDecl {
        name: "Drawable".to_string(),
        span: Span::zero(),
    });
    let result = lower(&Module::new("app", false, Some(space("app", vec![decl], vec![]))));
    assert!(matches!(
        result,
        Err(CompileError::UnsupportedDeclaration { kind: "interface" })
    ));
}

// ===== Slot allocation =====

#[test]
fn local_table_starts_with_receiver_and_parameters() {
    let m = method("area", &["width", "height"], vec![]);
    let root = space("app", vec![class("Rect", vec![Member::Method(m)])], vec![]);
    let program = lower(&Module::new("app", false, Some(root))).unwrap();

    assert_eq!(only_method(&program).locals, vec!["this", "width", "height"]);
}

#[test]
fn first_seen_identifiers_append_slots_in_use_order() {
    let body = vec![
        expr_stmt(ident("a")),
        expr_stmt(ident("b")),
        expr_stmt(ident("a")),
    ];
    let program = lower(&module_with_body(body)).unwrap();
    let method = only_method(&program);

    assert_eq!(method.locals, vec!["this", "a", "b"]);
    let slots: Vec<i32> = method
        .instructions
        .iter()
        .filter(|i| i.opcode == Opcode::LoadLocal)
        .map(|i| i.operand)
        .collect();
    assert_eq!(slots, vec![1, 2, 1]);
}

#[test]
fn parameters_resolve_to_their_slots() {
    let body = vec![ret(Some(ident("y")))];
    let m = method("pick", &["x", "y"], body);
    let root = space("app", vec![class("P", vec![Member::Method(m)])], vec![]);
    let program = lower(&Module::new("app", false, Some(root))).unwrap();

    assert_eq!(
        only_method(&program).instructions,
        vec![
            Instruction::with_operand(Opcode::LoadLocal, 2),
            Instruction::new(Opcode::Ret),
        ]
    );
}

// ===== Statements =====

#[test]
fn bare_return_lowers_to_single_ret() {
    let program = lower(&module_with_body(vec![ret(None)])).unwrap();
    assert_eq!(
        only_method(&program).instructions,
        vec![Instruction::new(Opcode::Ret)]
    );
}

#[test]
fn return_value_lowers_to_load_const_then_ret() {
    let program = lower(&module_with_body(vec![ret(Some(int(5)))])).unwrap();
    let method = only_method(&program);

    assert_eq!(
        method.instructions,
        vec![
            Instruction::with_operand(Opcode::LoadConst, 0),
            Instruction::new(Opcode::Ret),
        ]
    );
    assert_eq!(program.constants.len(), 1);
    assert_eq!(program.constants.get(0), Some(&Constant::Int(5)));
}

#[test]
fn expression_statement_pops_its_value() {
    let body = vec![expr_stmt(binary("+", ident("x"), int(3)))];
    let program = lower(&module_with_body(body)).unwrap();
    let method = only_method(&program);

    assert_eq!(
        method.instructions,
        vec![
            Instruction::with_operand(Opcode::LoadLocal, 1),
            Instruction::with_operand(Opcode::LoadConst, 0),
            Instruction::new(Opcode::Add),
            Instruction::new(Opcode::Pop),
        ]
    );
    assert_eq!(program.constants.get(0), Some(&Constant::Int(3)));
}

#[test]
fn uninitialized_variable_stores_default() {
    let program = lower(&module_with_body(vec![let_stmt("x", None)])).unwrap();
    let method = only_method(&program);

    assert_eq!(
        method.instructions,
        vec![
            Instruction::new(Opcode::LoadDefault),
            Instruction::with_operand(Opcode::StoreLocal, 1),
        ]
    );
    assert_eq!(method.locals, vec!["this", "x"]);
}

#[test]
fn initialized_variable_stores_lowered_value() {
    let program = lower(&module_with_body(vec![let_stmt("x", Some(int(7)))])).unwrap();
    let method = only_method(&program);

    assert_eq!(
        method.instructions,
        vec![
            Instruction::with_operand(Opcode::LoadConst, 0),
            Instruction::with_operand(Opcode::StoreLocal, 1),
        ]
    );
}

// ===== Operators =====

#[test]
fn every_operator_maps_to_its_opcode() {
    let table = [
        ("+", Opcode::Add),
        ("-", Opcode::Sub),
        ("*", Opcode::Mul),
        ("/", Opcode::Div),
        ("==", Opcode::Eq),
        ("!=", Opcode::Neq),
        ("<", Opcode::Lt),
        ("<=", Opcode::Leq),
        (">", Opcode::Gt),
        (">=", Opcode::Geq),
    ];
    for (op, opcode) in table {
        let program = lower(&module_with_body(vec![expr_stmt(binary(
            op,
            int(1),
            int(2),
        ))]))
        .unwrap();
        let method = only_method(&program);
        assert_eq!(method.instructions[2], Instruction::new(opcode), "operator {op}");
    }
}

#[test]
fn unknown_operator_is_rejected() {
    let result = lower(&module_with_body(vec![expr_stmt(binary(
        "%",
        int(1),
        int(2),
    ))]));
    assert!(matches!(result, Err(CompileError::UnknownOperator { op }) if op == "%"));
}

// ===== Constant pooling =====

#[test]
fn equal_literals_occupy_distinct_pool_slots() {
    let body = vec![expr_stmt(int(5)), expr_stmt(int(5))];
    let program = lower(&module_with_body(body)).unwrap();

    assert_eq!(program.constants.len(), 2);
    assert_eq!(program.constants.get(0), Some(&Constant::Int(5)));
    assert_eq!(program.constants.get(1), Some(&Constant::Int(5)));
}

#[test]
fn repeated_call_names_share_one_pool_slot() {
    let body = vec![
        expr_stmt(call(ident("obj"), "update", vec![])),
        expr_stmt(call(ident("obj"), "update", vec![])),
    ];
    let program = lower(&module_with_body(body)).unwrap();

    let updates: Vec<_> = program
        .constants
        .iter()
        .filter(|c| **c == Constant::Str("update".to_string()))
        .collect();
    assert_eq!(updates.len(), 1);
}

#[test]
fn constant_pool_spans_the_whole_module() {
    // Two methods each loading the literal 5: the pool is module-level
    // and literals append, so both values land in it.
    let first = method("first", &[], vec![ret(Some(int(5)))]);
    let second = method("second", &[], vec![ret(Some(int(5)))]);
    let root = space(
        "app",
        vec![class(
            "Program",
            vec![Member::Method(first), Member::Method(second)],
        )],
        vec![],
    );
    let program = lower(&Module::new("app", true, Some(root))).unwrap();

    assert_eq!(program.constants.len(), 2);
    let TypeDef::Class(class) = &program.root.types[0];
    assert_eq!(class.methods[0].instructions[0].operand, 0);
    assert_eq!(class.methods[1].instructions[0].operand, 1);
}

// ===== Calls =====

#[test]
fn call_lowers_target_then_arguments_then_packed_call() {
    let body = vec![expr_stmt(call(ident("obj"), "add", vec![int(1), int(2)]))];
    let program = lower(&module_with_body(body)).unwrap();
    let method = only_method(&program);

    assert_eq!(method.instructions.len(), 5); // target, 2 args, Call, Pop
    assert_eq!(method.instructions[0].opcode, Opcode::LoadLocal);
    assert_eq!(method.instructions[1].opcode, Opcode::LoadConst);
    assert_eq!(method.instructions[2].opcode, Opcode::LoadConst);

    let call_instr = method.instructions[3];
    assert_eq!(call_instr.opcode, Opcode::Call);
    let (argc, name_index) = unpack_operand(call_instr.operand);
    assert_eq!(argc, 2);
    assert_eq!(
        program.constants.get(name_index),
        Some(&Constant::Str("add".to_string()))
    );
}

#[test]
fn call_with_too_many_arguments_is_rejected() {
    let arguments: Vec<Expression> = (0..256).map(int).collect();
    let result = lower(&module_with_body(vec![expr_stmt(call(
        ident("obj"),
        "spray",
        arguments,
    ))]));
    assert!(matches!(
        result,
        Err(CompileError::TooManyArguments { count: 256 })
    ));
}

// ===== New expressions =====

#[test]
fn new_resolves_class_by_depth_first_index() {
    let target = space("models", vec![class("Point", vec![])], vec![]);
    let body = vec![expr_stmt(Expression::New(NewExpression {
        type_name: "Point".to_string(),
        arguments: vec![int(3), int(4)],
        span: Span::zero(),
    }))];
    let main = method("main", &[], body);
    let root = space(
        "app",
        vec![class("Program", vec![Member::Method(main)])],
        vec![target],
    );
    let program = lower(&Module::new("app", true, Some(root))).unwrap();

    let TypeDef::Class(class) = &program.root.types[0];
    let new_instr = class.methods[0]
        .instructions
        .iter()
        .find(|i| i.opcode == Opcode::New)
        .unwrap();
    let (argc, type_index) = unpack_operand(new_instr.operand);
    assert_eq!(argc, 2);
    assert_eq!(type_index, 1); // Program is 0, Point is 1
}

#[test]
fn new_with_unknown_type_is_rejected() {
    let body = vec![expr_stmt(Expression::New(NewExpression {
        type_name: "Ghost".to_string(),
        arguments: vec![],
        span: Span::zero(),
    }))];
    let result = lower(&module_with_body(body));
    assert!(matches!(result, Err(CompileError::UnknownType { name }) if name == "Ghost"));
}

// ===== Fields and properties =====

#[test]
fn field_initializer_evaluates_to_constant() {
    let field = Member::Field(FieldDecl {
        name: "limit".to_string(),
        type_name: Some("i32".to_string()),
        initializer: Some(int(10)),
        span: Span::zero(),
    });
    let bare = Member::Field(FieldDecl {
        name: "label".to_string(),
        type_name: None,
        initializer: None,
        span: Span::zero(),
    });
    let root = space("app", vec![class("Config", vec![field, bare])], vec![]);
    let program = lower(&Module::new("app", false, Some(root))).unwrap();

    let TypeDef::Class(class) = &program.root.types[0];
    assert_eq!(class.fields[0].initial_value, Some(Constant::Int(10)));
    assert_eq!(class.fields[1].initial_value, None);
}

#[test]
fn non_literal_field_initializer_is_rejected() {
    let field = Member::Field(FieldDecl {
        name: "limit".to_string(),
        type_name: None,
        initializer: Some(ident("other")),
        span: Span::zero(),
    });
    let root = space("app", vec![class("Config", vec![field])], vec![]);
    let result = lower(&Module::new("app", false, Some(root)));
    assert!(matches!(
        result,
        Err(CompileError::UnsupportedConstantExpression { kind: "identifier" })
    ));
}

#[test]
fn property_flags_pass_through() {
    let property = Member::Property(PropertyDecl {
        name: "size".to_string(),
        type_name: "i32".to_string(),
        has_getter: true,
        has_setter: false,
        span: Span::zero(),
    });
    let root = space("app", vec![class("Buffer", vec![property])], vec![]);
    let program = lower(&Module::new("app", false, Some(root))).unwrap();

    let TypeDef::Class(class) = &program.root.types[0];
    assert_eq!(class.properties[0].name, "size");
    assert!(class.properties[0].has_getter);
    assert!(!class.properties[0].has_setter);
}
