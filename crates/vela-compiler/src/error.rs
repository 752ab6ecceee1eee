//! Compiler error types

use thiserror::Error;

/// Errors that can occur while lowering a program tree
///
/// Any error aborts lowering of the whole module; the compiler never
/// returns a partially lowered program.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The module has no root space to lower
    #[error("Module has no root space")]
    MissingRootSpace,

    /// A type declaration kind the compiler cannot lower
    #[error("Unsupported type declaration kind: {kind}")]
    UnsupportedDeclaration {
        /// Name of the offending declaration kind
        kind: &'static str,
    },

    /// A field initializer that is not a compile-time constant
    #[error("Unsupported constant expression kind: {kind}")]
    UnsupportedConstantExpression {
        /// Name of the offending expression kind
        kind: &'static str,
    },

    /// A binary operator with no opcode mapping
    #[error("Unknown binary operator '{op}'")]
    UnknownOperator {
        /// The operator as written in source
        op: String,
    },

    /// A constructed type name that resolves to no class in the module
    #[error("Unknown type '{name}' in new expression")]
    UnknownType {
        /// The unresolved type name
        name: String,
    },

    /// More call arguments than the packed operand can carry
    #[error("Too many arguments: {count} (limit 255)")]
    TooManyArguments {
        /// Number of arguments at the call site
        count: usize,
    },

    /// A pool or class index beyond the 24-bit packed operand range
    #[error("Operand index {index} exceeds the 24-bit range")]
    IndexOverflow {
        /// The out-of-range index
        index: u32,
    },
}

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;
