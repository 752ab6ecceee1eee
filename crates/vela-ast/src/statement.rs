//! Statement AST nodes

use crate::expression::Expression;
use crate::span::Span;

/// Statement inside a method body
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Expression evaluated for its side effect, result discarded
    Expression(ExpressionStatement),

    /// Return from the enclosing method, with or without a value
    Return(ReturnStatement),

    /// Local variable declaration: `let x;` or `let x = expr;`
    VariableDecl(VariableDecl),
}

impl Statement {
    /// Get the span of this statement
    pub fn span(&self) -> &Span {
        match self {
            Statement::Expression(s) => &s.span,
            Statement::Return(s) => &s.span,
            Statement::VariableDecl(s) => &s.span,
        }
    }
}

/// Expression statement: `expr;`
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    /// The evaluated expression
    pub expression: Expression,
    /// Source span
    pub span: Span,
}

/// Return statement: `return;` or `return expr;`
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    /// Returned value, if any
    pub value: Option<Expression>,
    /// Source span
    pub span: Span,
}

/// Local variable declaration: `let x;` or `let x = expr;`
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    /// Declared name
    pub name: String,
    /// Initializer expression, if any
    pub initializer: Option<Expression>,
    /// Source span
    pub span: Span,
}
