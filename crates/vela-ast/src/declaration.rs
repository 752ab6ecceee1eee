//! Declaration AST nodes: spaces, types, and type members

use crate::expression::Expression;
use crate::span::Span;
use crate::statement::Statement;

/// A space declaration: a named grouping of type declarations and
/// nested child spaces.
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceDecl {
    /// Space name as written in source (unqualified)
    pub name: String,
    /// Types declared directly in this space
    pub declarations: Vec<TypeDecl>,
    /// Nested child spaces
    pub children: Vec<SpaceDecl>,
    /// Source span
    pub span: Span,
}

/// Type declaration inside a space
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDecl {
    /// Class declaration
    Class(ClassDecl),

    /// Interface declaration (parsed, not yet compilable)
    Interface(InterfaceDecl),
}

impl TypeDecl {
    /// Declared type name
    pub fn name(&self) -> &str {
        match self {
            TypeDecl::Class(c) => &c.name,
            TypeDecl::Interface(i) => &i.name,
        }
    }

    /// Name of this declaration's kind, for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeDecl::Class(_) => "class",
            TypeDecl::Interface(_) => "interface",
        }
    }
}

/// Class declaration: name plus ordered members
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    /// Class name
    pub name: String,
    /// Members in declaration order
    pub members: Vec<Member>,
    /// Source span
    pub span: Span,
}

/// Interface declaration. Interfaces parse but have no lowering yet;
/// the compiler reports them as unsupported.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    /// Interface name
    pub name: String,
    /// Source span
    pub span: Span,
}

/// Member of a class declaration
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    /// Method member
    Method(MethodDecl),
    /// Field member
    Field(FieldDecl),
    /// Property member
    Property(PropertyDecl),
}

impl Member {
    /// Declared member name
    pub fn name(&self) -> &str {
        match self {
            Member::Method(m) => &m.name,
            Member::Field(f) => &f.name,
            Member::Property(p) => &p.name,
        }
    }
}

/// Method declaration: signature plus body statements
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    /// Method name
    pub name: String,
    /// Parameters in declaration order
    pub parameters: Vec<ParamDecl>,
    /// Declared return type name
    pub return_type: String,
    /// Body statements in source order
    pub body: Vec<Statement>,
    /// Source span
    pub span: Span,
}

/// Method parameter: name plus declared type name
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    /// Parameter name
    pub name: String,
    /// Declared type name (unresolved)
    pub type_name: String,
}

/// Field declaration: `let name;` / `name: Type = init;` at class level
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    /// Field name
    pub name: String,
    /// Declared type name; `None` when inferred from the initializer
    pub type_name: Option<String>,
    /// Initializer expression, if any
    pub initializer: Option<Expression>,
    /// Source span
    pub span: Span,
}

/// Property declaration: a field-like member with accessor flags
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    /// Property name
    pub name: String,
    /// Declared type name
    pub type_name: String,
    /// Whether a getter accessor was declared
    pub has_getter: bool,
    /// Whether a setter accessor was declared
    pub has_setter: bool,
    /// Source span
    pub span: Span,
}
