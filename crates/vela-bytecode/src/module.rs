//! Binary module format
//!
//! A compiled Vela program persists as a `.vlm` container: a 3-byte
//! magic tag and a version byte, followed by the entry point, the
//! module constant pool, and the recursive root space record. All
//! multi-byte integers are little-endian.

use crate::constants::{Constant, ConstantPool};
use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use crate::opcode::Opcode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Magic tag for Vela module files: "VLM"
pub const MAGIC: [u8; 3] = *b"VLM";

/// Current module format version
pub const VERSION: u8 = 1;

/// Name reserved for the receiver in slot 0 of every local table
pub const RECEIVER_NAME: &str = "this";

/// Module encoding/decoding errors
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Decode error
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Invalid magic tag
    #[error("Invalid magic tag: expected VLM, got {0:?}")]
    InvalidMagic([u8; 3]),

    /// Unsupported format version
    #[error("Unsupported version: {0} (current: {VERSION})")]
    UnsupportedVersion(u8),

    /// I/O failure reading or writing a module file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whether a module runs on its own or is linked into another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleKind {
    /// Module with an entry point, runnable as a program
    Executable,
    /// Module compiled for consumption by other modules
    Library,
}

/// A single lowered instruction: opcode plus fixed 32-bit operand
///
/// The operand's meaning depends on the opcode; opcodes without an
/// operand carry 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Operation to perform
    pub opcode: Opcode,
    /// Opcode-dependent operand
    pub operand: i32,
}

impl Instruction {
    /// Create an instruction with operand 0
    pub fn new(opcode: Opcode) -> Self {
        Self { opcode, operand: 0 }
    }

    /// Create an instruction with an explicit operand
    pub fn with_operand(opcode: Opcode, operand: i32) -> Self {
        Self { opcode, operand }
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_opcode(self.opcode);
        writer.emit_i32(self.operand);
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let opcode = reader.read_opcode()?;
        let operand = reader.read_i32()?;
        Ok(Self { opcode, operand })
    }
}

/// Method parameter: name plus unresolved type name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    /// Parameter name
    pub name: String,
    /// Declared type name
    pub type_name: String,
}

impl ParamDef {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.name);
        writer.emit_string(&self.type_name);
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let name = reader.read_string()?;
        let type_name = reader.read_string()?;
        Ok(Self { name, type_name })
    }
}

/// Lowered method: signature, local table, and instruction stream
///
/// Slot 0 of the local table is always the receiver, followed by one
/// slot per parameter and then any locals declared in the body. The
/// table is a compiler artifact and is not serialized; decoding
/// reconstructs the receiver and parameter slots, and equality
/// compares only the persisted parts (name, parameters, instructions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDef {
    /// Method name
    pub name: String,
    /// Parameters in declaration order
    pub parameters: Vec<ParamDef>,
    /// Local variable names, indexed by slot
    pub locals: Vec<String>,
    /// Instructions in execution order
    pub instructions: Vec<Instruction>,
}

impl MethodDef {
    /// The local table implied by a signature: the receiver slot
    /// followed by one slot per parameter.
    pub fn base_locals(parameters: &[ParamDef]) -> Vec<String> {
        let mut locals = Vec::with_capacity(parameters.len() + 1);
        locals.push(RECEIVER_NAME.to_string());
        locals.extend(parameters.iter().map(|p| p.name.clone()));
        locals
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        debug_assert!(self.parameters.len() <= u8::MAX as usize);
        debug_assert!(self.instructions.len() <= u8::MAX as usize);

        writer.emit_string(&self.name);
        writer.emit_u8(self.parameters.len() as u8);
        for param in &self.parameters {
            param.encode(writer);
        }
        writer.emit_u8(self.instructions.len() as u8);
        for instruction in &self.instructions {
            instruction.encode(writer);
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let name = reader.read_string()?;

        let param_count = reader.read_u8()? as usize;
        let mut parameters = Vec::with_capacity(param_count);
        for _ in 0..param_count {
            parameters.push(ParamDef::decode(reader)?);
        }

        let instruction_count = reader.read_u8()? as usize;
        let mut instructions = Vec::with_capacity(instruction_count);
        for _ in 0..instruction_count {
            instructions.push(Instruction::decode(reader)?);
        }

        let locals = Self::base_locals(&parameters);
        Ok(Self {
            name,
            parameters,
            locals,
            instructions,
        })
    }
}

impl PartialEq for MethodDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.parameters == other.parameters
            && self.instructions == other.instructions
    }
}

/// Class field carried in the in-memory model
///
/// Fields are not part of the binary container yet; a program that
/// round-trips through bytes must not rely on them surviving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Declared type name; `None` when inferred
    pub type_name: Option<String>,
    /// Constant initial value, if an initializer was declared
    pub initial_value: Option<Constant>,
}

/// Class property carried in the in-memory model (not serialized)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    /// Property name
    pub name: String,
    /// Declared type name
    pub type_name: String,
    /// Whether a getter accessor was declared
    pub has_getter: bool,
    /// Whether a setter accessor was declared
    pub has_setter: bool,
}

/// Lowered class: name plus members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    /// Class name
    pub name: String,
    /// Methods in declaration order
    pub methods: Vec<MethodDef>,
    /// Fields in declaration order (in-memory only)
    pub fields: Vec<FieldDef>,
    /// Properties in declaration order (in-memory only)
    pub properties: Vec<PropertyDef>,
}

impl ClassDef {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.name);
        writer.emit_u32(self.methods.len() as u32);
        for method in &self.methods {
            method.encode(writer);
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let name = reader.read_string()?;
        let method_count = reader.read_u32()? as usize;
        let mut methods = Vec::with_capacity(method_count.min(1024));
        for _ in 0..method_count {
            methods.push(MethodDef::decode(reader)?);
        }
        Ok(Self {
            name,
            methods,
            fields: Vec::new(),
            properties: Vec::new(),
        })
    }
}

/// Lowered type declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeDef {
    /// Class type
    Class(ClassDef),
}

impl TypeDef {
    /// Declared type name
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Class(c) => &c.name,
        }
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        match self {
            TypeDef::Class(c) => c.encode(writer),
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        Ok(TypeDef::Class(ClassDef::decode(reader)?))
    }
}

/// Lowered space: qualified name, types, and child spaces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    /// Fully qualified name, dot-joined from the root
    pub name: String,
    /// Types declared directly in this space
    pub types: Vec<TypeDef>,
    /// Nested child spaces
    pub subspaces: Vec<Space>,
}

impl Space {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.name);
        writer.emit_u32(self.types.len() as u32);
        for ty in &self.types {
            ty.encode(writer);
        }
        writer.emit_u32(self.subspaces.len() as u32);
        for subspace in &self.subspaces {
            subspace.encode(writer);
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let name = reader.read_string()?;

        let type_count = reader.read_u32()? as usize;
        let mut types = Vec::with_capacity(type_count.min(1024));
        for _ in 0..type_count {
            types.push(TypeDef::decode(reader)?);
        }

        let subspace_count = reader.read_u32()? as usize;
        let mut subspaces = Vec::with_capacity(subspace_count.min(1024));
        for _ in 0..subspace_count {
            subspaces.push(Space::decode(reader)?);
        }

        Ok(Self {
            name,
            types,
            subspaces,
        })
    }
}

/// A compiled Vela module
///
/// Constructed either by the compiler (lowering a program tree) or by
/// [`Program::decode`]; immutable once built. The entry point is
/// present exactly when the module kind is [`ModuleKind::Executable`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// Module name. Not part of the container; [`Program::decode`]
    /// falls back to the root space name, and equality skips it.
    pub name: String,
    /// Executable or library
    pub kind: ModuleKind,
    /// Entry-point method name; set iff the module is executable
    pub entry_point: Option<String>,
    /// Module-level constant pool
    pub constants: ConstantPool,
    /// Root of the space hierarchy
    pub root: Space,
}

impl Program {
    /// Create an executable program with the given entry point
    pub fn executable(
        name: impl Into<String>,
        entry_point: impl Into<String>,
        constants: ConstantPool,
        root: Space,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ModuleKind::Executable,
            entry_point: Some(entry_point.into()),
            constants,
            root,
        }
    }

    /// Create a library program (no entry point)
    pub fn library(name: impl Into<String>, constants: ConstantPool, root: Space) -> Self {
        Self {
            name: name.into(),
            kind: ModuleKind::Library,
            entry_point: None,
            constants,
            root,
        }
    }

    /// Encode the program to the binary container format
    ///
    /// The encoding is deterministic: equal programs produce identical
    /// bytes. No semantic validation is performed; the program is
    /// assumed well-formed.
    ///
    /// Format:
    /// - Magic tag (3 bytes) + version (u8)
    /// - Entry point: u8 length + UTF-8 bytes (length 0 = library)
    /// - Constant pool
    /// - Root space record, recursive
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BytecodeWriter::with_capacity(256);

        writer.emit_bytes(&MAGIC);
        writer.emit_u8(VERSION);

        match &self.entry_point {
            Some(entry) => {
                debug_assert!(entry.len() <= u8::MAX as usize);
                writer.emit_u8(entry.len() as u8);
                writer.emit_bytes(entry.as_bytes());
            }
            None => writer.emit_u8(0),
        }

        self.constants.encode(&mut writer);
        self.root.encode(&mut writer);

        writer.into_bytes()
    }

    /// Decode a program from the binary container format
    ///
    /// The header is validated before any other field is touched. The
    /// module kind is derived from the entry point: absent means
    /// library.
    pub fn decode(data: &[u8]) -> Result<Self, ModuleError> {
        let mut reader = BytecodeReader::new(data);

        let magic: [u8; 3] = reader
            .read_bytes(3)?
            .try_into()
            .map_err(|_| DecodeError::UnexpectedEnd(0))?;
        if magic != MAGIC {
            return Err(ModuleError::InvalidMagic(magic));
        }

        let version = reader.read_u8()?;
        if version != VERSION {
            return Err(ModuleError::UnsupportedVersion(version));
        }

        let entry_len = reader.read_u8()? as usize;
        let entry_point = if entry_len == 0 {
            None
        } else {
            let offset = reader.position();
            let bytes = reader.read_bytes(entry_len)?;
            let entry = String::from_utf8(bytes.to_vec())
                .map_err(|_| DecodeError::InvalidUtf8(offset))?;
            Some(entry)
        };

        let constants = ConstantPool::decode(&mut reader)?;
        let root = Space::decode(&mut reader)?;

        let kind = match entry_point {
            Some(_) => ModuleKind::Executable,
            None => ModuleKind::Library,
        };

        Ok(Self {
            name: root.name.clone(),
            kind,
            entry_point,
            constants,
            root,
        })
    }

    /// Write the encoded program to a file
    ///
    /// The file handle is scoped to this call and released on every
    /// exit path.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), ModuleError> {
        fs::write(path, self.encode())?;
        Ok(())
    }

    /// Read and decode a program from a file
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, ModuleError> {
        let data = fs::read(path)?;
        Self::decode(&data)
    }
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.entry_point == other.entry_point
            && self.constants == other.constants
            && self.root == other.root
    }
}
