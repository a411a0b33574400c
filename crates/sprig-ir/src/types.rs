//! Type-expression IR.
//!
//! Mirrors the productions of the type-expression parser. Types are only
//! carried through to the emitter; nothing in the core checks them.

use serde::{Deserialize, Serialize};

/// A type expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeNode {
    /// Named type with optional arguments: `Map<K, V>`.
    Reference { name: String, args: Vec<TypeNode> },

    /// Literal type: `"a"`, `42`, `true`.
    Literal(TypeLiteral),

    Union(Vec<TypeNode>),

    Intersection(Vec<TypeNode>),

    /// `keyof T`.
    Keyof(Box<TypeNode>),

    /// `T[K]`.
    IndexedAccess {
        object: Box<TypeNode>,
        index: Box<TypeNode>,
    },

    /// `C extends E ? T : F`.
    Conditional {
        check: Box<TypeNode>,
        extends: Box<TypeNode>,
        true_type: Box<TypeNode>,
        false_type: Box<TypeNode>,
    },

    Tuple(Vec<TypeNode>),

    /// `T[]`.
    Array(Box<TypeNode>),

    /// `readonly T`.
    Readonly(Box<TypeNode>),

    /// `infer T`.
    Infer(String),

    /// `typeof expr`.
    Typeof(String),

    /// `{ [K in C]: V }`.
    Mapped {
        param: String,
        constraint: Box<TypeNode>,
        value: Box<TypeNode>,
    },

    /// `(params) => return_type`.
    Function {
        params: Vec<TypeParam>,
        return_type: Box<TypeNode>,
    },

    /// `...T`.
    Rest(Box<TypeNode>),

    /// Free-form type text passed through verbatim.
    Raw(String),
}

/// A literal type value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeLiteral {
    String(String),
    Number(f64),
    Bool(bool),
}

/// A parameter of a function type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParam {
    /// Parameter name, synthesised (`arg0`, ...) when the source gave only a type.
    pub name: String,
    pub ty: TypeNode,
}

impl TypeNode {
    pub fn named(name: impl Into<String>) -> Self {
        TypeNode::Reference {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeNode>) -> Self {
        TypeNode::Reference {
            name: name.into(),
            args,
        }
    }

    pub fn array(element: TypeNode) -> Self {
        TypeNode::Array(Box::new(element))
    }
}
