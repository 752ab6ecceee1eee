//! Tree-to-bytecode lowering
//!
//! Walks the program tree depth-first and produces one flat
//! instruction stream per method. The constant pool is module-level
//! and lives for the whole lowering; everything method-local
//! (instruction buffer, local slot table) lives in a [`MethodContext`]
//! constructed fresh per method and threaded through the recursion, so
//! every `lower` call is independent and reentrant.

mod expr;
mod stmt;

use crate::error::{CompileError, CompileResult};
use rustc_hash::FxHashMap;
use vela_ast::{
    ClassDecl, FieldDecl, Member, MethodDecl, Module, PropertyDecl, SpaceDecl, TypeDecl,
};
use vela_bytecode::{
    ClassDef, Constant, ConstantPool, FieldDef, Instruction, MethodDef, ParamDef, Program,
    PropertyDef, Space, TypeDef,
};

/// Entry-point method of an executable module
pub const DEFAULT_ENTRY_POINT: &str = "Program.main";

/// Lower a program tree into a bytecode program
///
/// Convenience wrapper around [`Lowerer`]; one fresh engine per call.
pub fn lower(module: &Module) -> CompileResult<Program> {
    Lowerer::new().lower_module(module)
}

/// Per-method lowering state
///
/// Holds the instruction buffer and the local slot table for the
/// method currently being lowered. Slot 0 is the receiver, slots 1..N
/// the parameters; body locals and implicitly declared identifiers
/// take subsequent slots in first-use order.
pub(crate) struct MethodContext {
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) locals: Vec<String>,
}

impl MethodContext {
    fn new(parameters: &[ParamDef]) -> Self {
        Self {
            instructions: Vec::new(),
            locals: MethodDef::base_locals(parameters),
        }
    }

    /// Append an instruction
    pub(crate) fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Find the slot of a declared name
    pub(crate) fn slot(&self, name: &str) -> Option<u32> {
        self.locals.iter().position(|n| n == name).map(|i| i as u32)
    }

    /// Allocate a new slot for a name and return it
    pub(crate) fn declare(&mut self, name: &str) -> u32 {
        let slot = self.locals.len() as u32;
        self.locals.push(name.to_string());
        slot
    }

    /// Resolve a name, allocating a slot on first sight
    pub(crate) fn slot_or_declare(&mut self, name: &str) -> u32 {
        match self.slot(name) {
            Some(slot) => slot,
            None => self.declare(name),
        }
    }
}

/// Lowering engine
///
/// Owns the module-level constant pool and the class-name index used
/// to resolve `new` expressions. Construct one per module; the engine
/// is consumed by [`Lowerer::lower_module`].
pub struct Lowerer {
    constants: ConstantPool,
    classes: FxHashMap<String, u32>,
}

impl Lowerer {
    /// Create a fresh lowering engine
    pub fn new() -> Self {
        Self {
            constants: ConstantPool::new(),
            classes: FxHashMap::default(),
        }
    }

    /// Lower a whole module
    ///
    /// Fails if the module has no root space, declares a type kind the
    /// compiler cannot lower, or contains an expression that violates
    /// the lowering rules. On failure nothing is returned; the partial
    /// state dies with the engine.
    pub fn lower_module(mut self, module: &Module) -> CompileResult<Program> {
        let root = module.root.as_ref().ok_or(CompileError::MissingRootSpace)?;

        let mut next_index = 0;
        self.collect_classes(root, &mut next_index);

        let root_space = self.lower_space(root, None)?;

        Ok(if module.is_executable {
            Program::executable(&module.name, DEFAULT_ENTRY_POINT, self.constants, root_space)
        } else {
            Program::library(&module.name, self.constants, root_space)
        })
    }

    /// Index every class by simple name, in depth-first declaration
    /// order. The first declaration of a name wins.
    fn collect_classes(&mut self, space: &SpaceDecl, next_index: &mut u32) {
        for decl in &space.declarations {
            if let TypeDecl::Class(class) = decl {
                self.classes.entry(class.name.clone()).or_insert(*next_index);
                *next_index += 1;
            }
        }
        for child in &space.children {
            self.collect_classes(child, next_index);
        }
    }

    /// Class index for a `new` expression target
    pub(crate) fn class_index(&self, name: &str) -> Option<u32> {
        self.classes.get(name).copied()
    }

    fn lower_space(&mut self, space: &SpaceDecl, parent: Option<&str>) -> CompileResult<Space> {
        let name = match parent {
            Some(parent) => format!("{parent}.{}", space.name),
            None => space.name.clone(),
        };

        let mut types = Vec::with_capacity(space.declarations.len());
        for decl in &space.declarations {
            match decl {
                TypeDecl::Class(class) => types.push(TypeDef::Class(self.lower_class(class)?)),
                other => {
                    return Err(CompileError::UnsupportedDeclaration {
                        kind: other.kind_name(),
                    })
                }
            }
        }

        let mut subspaces = Vec::with_capacity(space.children.len());
        for child in &space.children {
            subspaces.push(self.lower_space(child, Some(&name))?);
        }

        Ok(Space {
            name,
            types,
            subspaces,
        })
    }

    fn lower_class(&mut self, class: &ClassDecl) -> CompileResult<ClassDef> {
        let mut methods = Vec::new();
        let mut fields = Vec::new();
        let mut properties = Vec::new();

        for member in &class.members {
            match member {
                Member::Method(method) => methods.push(self.lower_method(method)?),
                Member::Field(field) => fields.push(Self::lower_field(field)?),
                Member::Property(property) => properties.push(Self::lower_property(property)),
            }
        }

        Ok(ClassDef {
            name: class.name.clone(),
            methods,
            fields,
            properties,
        })
    }

    fn lower_method(&mut self, method: &MethodDecl) -> CompileResult<MethodDef> {
        let parameters: Vec<ParamDef> = method
            .parameters
            .iter()
            .map(|p| ParamDef {
                name: p.name.clone(),
                type_name: p.type_name.clone(),
            })
            .collect();

        let mut ctx = MethodContext::new(&parameters);
        for statement in &method.body {
            self.lower_stmt(&mut ctx, statement)?;
        }

        Ok(MethodDef {
            name: method.name.clone(),
            parameters,
            locals: ctx.locals,
            instructions: ctx.instructions,
        })
    }

    fn lower_field(field: &FieldDecl) -> CompileResult<FieldDef> {
        let initial_value = field
            .initializer
            .as_ref()
            .map(Self::eval_constant)
            .transpose()?;

        Ok(FieldDef {
            name: field.name.clone(),
            type_name: field.type_name.clone(),
            initial_value,
        })
    }

    fn lower_property(property: &PropertyDecl) -> PropertyDef {
        PropertyDef {
            name: property.name.clone(),
            type_name: property.type_name.clone(),
            has_getter: property.has_getter,
            has_setter: property.has_setter,
        }
    }

    /// Evaluate a field initializer to its constant value. Only
    /// literals are compile-time constants.
    fn eval_constant(expr: &vela_ast::Expression) -> CompileResult<Constant> {
        match expr {
            vela_ast::Expression::Literal(lit) => Ok(expr::constant_value(&lit.value)),
            other => Err(CompileError::UnsupportedConstantExpression {
                kind: other.kind_name(),
            }),
        }
    }
}

impl Default for Lowerer {
    fn default() -> Self {
        Self::new()
    }
}
