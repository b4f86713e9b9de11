//! Class, enum, and method declarations.

use qlang_common::token::TokenKind;
use serde::Serialize;

use super::expr::Expr;
use super::Block;

/// A class declaration.
///
/// The parent class is kept as a name and resolved late (at instance
/// construction), so child classes may appear before their parents in the
/// source. `type_params` are placeholder names (`class List<T>`); they are
/// resolved to concrete type names per instance, never per class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Class {
    pub name: String,
    pub parent: Option<String>,
    pub type_params: Vec<String>,
    pub members: Vec<VarDecl>,
    pub methods: Vec<Method>,
    pub is_static: bool,
}

impl Class {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            type_params: Vec::new(),
            members: Vec::new(),
            methods: Vec::new(),
            is_static: false,
        }
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }
}

/// A method declaration. Constructors are methods whose name equals the
/// class name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Method {
    pub name: String,
    /// Kind of the return type token; `Ident` for class returns, `Void`
    /// when absent.
    pub return_kind: TokenKind,
    pub return_type_name: String,
    pub params: Vec<Param>,
    pub body: Block,
    pub is_virtual: bool,
    pub is_override: bool,
    pub line: u32,
}

impl Method {
    pub fn new(name: impl Into<String>, line: u32) -> Self {
        Self {
            name: name.into(),
            return_kind: TokenKind::Void,
            return_type_name: "void".to_owned(),
            params: Vec::new(),
            body: Block::new(),
            is_virtual: false,
            is_override: false,
            line,
        }
    }

    pub fn is_void(&self) -> bool {
        self.return_kind == TokenKind::Void || self.return_type_name == "void"
    }
}

/// A method parameter: `TYPE NAME`. `kind` is `Ident` for class-typed and
/// generic parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub kind: TokenKind,
    pub name: String,
    pub type_name: String,
}

/// A variable or member declaration.
///
/// `kind = Ident` marks class-typed fields/locals (the concrete class name
/// is in `type_name`, which may also be a generic parameter resolved at
/// construction time).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarDecl {
    pub kind: TokenKind,
    pub name: String,
    pub type_name: String,
    pub type_params: Vec<String>,
    pub init: Option<Expr>,
    pub line: u32,
}

impl VarDecl {
    pub fn has_initializer(&self) -> bool {
        self.init.is_some()
    }
}

/// How an instance declaration is initialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InstanceInit {
    /// `Box b;` -- uninitialized, binds null.
    None,
    /// `Box b = new Box(args...);`
    New(Vec<Expr>),
    /// `Vec3 p = obj.GetPosition();` -- general expression initializer.
    Expr(Expr),
}

/// A class-typed local declaration: `ClassName name [= new ClassName(...)]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceDecl {
    pub class_name: String,
    pub name: String,
    /// Concrete type arguments (`List<int32> xs`).
    pub type_args: Vec<String>,
    pub init: InstanceInit,
    pub line: u32,
}

/// An enum declaration: ordered members with explicit or auto-incremented
/// integer values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDef {
    pub name: String,
    pub members: Vec<(String, i32)>,
}

impl EnumDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn value_of(&self, member: &str) -> Option<i32> {
        self.members
            .iter()
            .find(|(name, _)| name == member)
            .map(|&(_, value)| value)
    }
}
