//! Vela bytecode definitions
//!
//! This crate provides the instruction set, constant pool, and binary
//! module container for compiled Vela programs. The compiler lowers a
//! program tree into the module model defined here; the model encodes
//! to and decodes from the versioned `.vlm` byte format.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod constants;
pub mod encoder;
pub mod module;
pub mod opcode;

pub use constants::{Constant, ConstantPool};
pub use encoder::{BytecodeReader, BytecodeWriter, DecodeError};
pub use module::{
    ClassDef, FieldDef, Instruction, MethodDef, ModuleError, ModuleKind, ParamDef, Program,
    PropertyDef, Space, TypeDef, MAGIC, VERSION,
};
pub use opcode::{pack_operand, unpack_operand, Opcode};
