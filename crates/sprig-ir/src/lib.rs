//! Core IR types for the sprig lowering core.
//!
//! The IR is an ESTree-shaped tree for a JavaScript-like target. Every node
//! carries an optional [`Position`] copied from the source node it was
//! derived from, so diagnostics and source maps produced downstream stay
//! accurate.
//!
//! Type-level constructs (aliases, interfaces, annotations) use the separate
//! [`TypeNode`] family.

mod expr;
mod node;
mod position;
mod stmt;
mod types;

pub use expr::*;
pub use node::*;
pub use position::Position;
pub use stmt::*;
pub use types::*;

use serde::{Deserialize, Serialize};

/// A complete lowered compilation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Top-level statements.
    pub body: Vec<Node>,
}

impl Program {
    pub fn new(body: Vec<Node>) -> Self {
        Self { body }
    }
}

/// A function definition, shared by declarations, expressions, arrows and
/// class methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Function name (`None` for anonymous functions).
    pub id: Option<String>,
    /// Parameter patterns.
    pub params: Vec<Node>,
    /// Function body.
    pub body: Vec<Node>,
    pub is_async: bool,
    pub is_generator: bool,
    /// Arrow functions keep the enclosing `this`.
    pub is_arrow: bool,
    pub return_type: Option<TypeNode>,
    pub type_params: Vec<String>,
}

impl Function {
    pub fn new(id: impl Into<String>, params: Vec<Node>, body: Vec<Node>) -> Self {
        Self {
            id: Some(id.into()),
            params,
            body,
            is_async: false,
            is_generator: false,
            is_arrow: false,
            return_type: None,
            type_params: Vec::new(),
        }
    }

    pub fn anonymous(params: Vec<Node>, body: Vec<Node>) -> Self {
        Self {
            id: None,
            ..Self::new("", params, body)
        }
    }

    pub fn arrow(params: Vec<Node>, body: Vec<Node>) -> Self {
        Self {
            is_arrow: true,
            ..Self::anonymous(params, body)
        }
    }
}

/// A class declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    pub super_class: Option<Box<Node>>,
    /// `MethodDefinition` and `PropertyDefinition` nodes.
    pub body: Vec<Node>,
}

/// An enum declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enum {
    pub name: String,
    /// Declared type of raw values (`(enum Status:number ...)`).
    pub raw_type: Option<TypeNode>,
    pub cases: Vec<EnumCase>,
}

/// One case of an enum. A case has a raw value, associated values, or
/// neither, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumCase {
    pub name: String,
    pub raw_value: Option<Node>,
    /// Parameter identifiers for associated values.
    pub associated: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// One member of an interface body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceMember {
    pub key: String,
    pub ty: TypeNode,
    pub optional: bool,
    pub readonly: bool,
}
