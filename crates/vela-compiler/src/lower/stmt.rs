//! Statement lowering

use super::{Lowerer, MethodContext};
use crate::error::CompileResult;
use vela_ast::{Statement, VariableDecl};
use vela_bytecode::{Instruction, Opcode};

impl Lowerer {
    /// Lower a statement into the method context
    pub(crate) fn lower_stmt(
        &mut self,
        ctx: &mut MethodContext,
        stmt: &Statement,
    ) -> CompileResult<()> {
        match stmt {
            Statement::Expression(expr_stmt) => {
                self.lower_expr(ctx, &expr_stmt.expression)?;
                ctx.emit(Instruction::new(Opcode::Pop));
            }
            Statement::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.lower_expr(ctx, value)?;
                }
                ctx.emit(Instruction::new(Opcode::Ret));
            }
            Statement::VariableDecl(decl) => self.lower_var_decl(ctx, decl)?,
        }
        Ok(())
    }

    /// Lower `let x;` / `let x = expr;`
    ///
    /// The initializer (or the default value) is computed first, then
    /// stored into a freshly allocated slot; the name enters the local
    /// table at that slot.
    fn lower_var_decl(&mut self, ctx: &mut MethodContext, decl: &VariableDecl) -> CompileResult<()> {
        match &decl.initializer {
            Some(initializer) => self.lower_expr(ctx, initializer)?,
            None => ctx.emit(Instruction::new(Opcode::LoadDefault)),
        }

        let slot = ctx.declare(&decl.name);
        ctx.emit(Instruction::with_operand(Opcode::StoreLocal, slot as i32));
        Ok(())
    }
}
