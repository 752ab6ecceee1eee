//! Expression lowering

use super::{Lowerer, MethodContext};
use crate::error::{CompileError, CompileResult};
use vela_ast::{BinaryExpression, CallExpression, Expression, LiteralValue, NewExpression};
use vela_bytecode::opcode::{MAX_PACKED_ARGS, MAX_PACKED_INDEX};
use vela_bytecode::{pack_operand, Constant, Instruction, Opcode};

impl Lowerer {
    /// Lower an expression into the method context
    ///
    /// Expressions leave exactly one value on the stack.
    pub(crate) fn lower_expr(
        &mut self,
        ctx: &mut MethodContext,
        expr: &Expression,
    ) -> CompileResult<()> {
        match expr {
            Expression::Literal(lit) => {
                // Literal loads always append; equal literals occupy
                // distinct pool slots (names interned at call sites do
                // not, see lower_call).
                let index = self.constants.push(constant_value(&lit.value));
                ctx.emit(Instruction::with_operand(Opcode::LoadConst, index as i32));
            }
            Expression::Identifier(ident) => {
                // First sight of a name allocates its slot.
                let slot = ctx.slot_or_declare(&ident.name);
                ctx.emit(Instruction::with_operand(Opcode::LoadLocal, slot as i32));
            }
            Expression::Call(call) => self.lower_call(ctx, call)?,
            Expression::Binary(binary) => self.lower_binary(ctx, binary)?,
            Expression::New(new) => self.lower_new(ctx, new)?,
        }
        Ok(())
    }

    fn lower_call(&mut self, ctx: &mut MethodContext, call: &CallExpression) -> CompileResult<()> {
        self.lower_expr(ctx, &call.target)?;
        for argument in &call.arguments {
            self.lower_expr(ctx, argument)?;
        }

        let name_index = self.constants.intern(Constant::Str(call.method.clone()));
        let operand = packed_operand(call.arguments.len(), name_index)?;
        ctx.emit(Instruction::with_operand(Opcode::Call, operand));
        Ok(())
    }

    fn lower_binary(
        &mut self,
        ctx: &mut MethodContext,
        binary: &BinaryExpression,
    ) -> CompileResult<()> {
        self.lower_expr(ctx, &binary.left)?;
        self.lower_expr(ctx, &binary.right)?;

        let opcode = binary_opcode(&binary.op).ok_or_else(|| CompileError::UnknownOperator {
            op: binary.op.clone(),
        })?;
        ctx.emit(Instruction::new(opcode));
        Ok(())
    }

    fn lower_new(&mut self, ctx: &mut MethodContext, new: &NewExpression) -> CompileResult<()> {
        for argument in &new.arguments {
            self.lower_expr(ctx, argument)?;
        }

        let type_index =
            self.class_index(&new.type_name)
                .ok_or_else(|| CompileError::UnknownType {
                    name: new.type_name.clone(),
                })?;
        let operand = packed_operand(new.arguments.len(), type_index)?;
        ctx.emit(Instruction::with_operand(Opcode::New, operand));
        Ok(())
    }
}

/// Map a binary operator token to its opcode
pub(crate) fn binary_opcode(op: &str) -> Option<Opcode> {
    match op {
        "+" => Some(Opcode::Add),
        "-" => Some(Opcode::Sub),
        "*" => Some(Opcode::Mul),
        "/" => Some(Opcode::Div),
        "==" => Some(Opcode::Eq),
        "!=" => Some(Opcode::Neq),
        "<" => Some(Opcode::Lt),
        "<=" => Some(Opcode::Leq),
        ">" => Some(Opcode::Gt),
        ">=" => Some(Opcode::Geq),
        _ => None,
    }
}

/// Convert an AST literal value into a pool constant
pub(crate) fn constant_value(value: &LiteralValue) -> Constant {
    match value {
        LiteralValue::Int(v) => Constant::Int(*v),
        LiteralValue::Bool(v) => Constant::Bool(*v),
        LiteralValue::Str(v) => Constant::Str(v.clone()),
    }
}

/// Pack an argument count and an index, rejecting out-of-range values
/// rather than truncating them.
fn packed_operand(arg_count: usize, index: u32) -> CompileResult<i32> {
    if arg_count > MAX_PACKED_ARGS as usize {
        return Err(CompileError::TooManyArguments { count: arg_count });
    }
    if index >= MAX_PACKED_INDEX {
        return Err(CompileError::IndexOverflow { index });
    }
    Ok(pack_operand(arg_count as u8, index))
}
