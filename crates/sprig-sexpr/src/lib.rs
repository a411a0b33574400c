//! S-expression AST for sprig.
//!
//! This crate is the boundary between the external reader and the lowering
//! core. It defines the AST ([`SExp`]), reads AST produced by an external
//! reader from its JSON interchange form, renders AST back to S-expression
//! text for diagnostics, and parses binding patterns.
//!
//! JSON interchange format:
//! - `["add", 1, 2]` → list `(add 1 2)`
//! - `"name"` → symbol
//! - `1`, `true`, `null` → literals
//! - `{"str": "hi"}` → string literal
//! - `{"line": 3, "column": 7, "file": "a.sprig", "node": X}` → `X` at 3:7

mod from_json;
mod pattern;
mod to_sexpr;

pub use from_json::{from_json, from_json_program};
pub use pattern::{parse_params, parse_pattern, ParamList, Pattern, PatternKind, PropertyPattern};
pub use to_sexpr::to_sexpr;

pub use rhizome_sprig_ir::{Literal, Position};

use std::fmt;
use thiserror::Error;

/// An AST node.
#[derive(Debug, Clone, PartialEq)]
pub struct SExp {
    pub kind: SExpKind,
    /// Source location attached by the reader. Read-only afterwards.
    pub position: Option<Position>,
}

/// The three AST shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum SExpKind {
    Symbol(String),
    Literal(Literal),
    List(Vec<SExp>),
}

#[derive(Debug, Error)]
pub enum SExprError {
    #[error("invalid node: {0}")]
    InvalidNode(String),

    #[error("invalid position metadata: {0}")]
    InvalidPosition(String),

    #[error("invalid pattern: {message}")]
    InvalidPattern {
        message: String,
        position: Option<Position>,
    },

    #[error("invalid parameter list: {message}")]
    InvalidParams {
        message: String,
        position: Option<Position>,
    },
}

impl SExprError {
    /// Location of the offending node, when known.
    pub fn position(&self) -> Option<&Position> {
        match self {
            SExprError::InvalidPattern { position, .. }
            | SExprError::InvalidParams { position, .. } => position.as_ref(),
            _ => None,
        }
    }
}

// Builder methods
impl SExp {
    pub fn new(kind: SExpKind) -> Self {
        Self {
            kind,
            position: None,
        }
    }

    pub fn at(mut self, position: Option<Position>) -> Self {
        self.position = position;
        self
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        SExp::new(SExpKind::Symbol(name.into()))
    }

    pub fn list(items: Vec<SExp>) -> Self {
        SExp::new(SExpKind::List(items))
    }

    pub fn string(v: impl Into<String>) -> Self {
        SExp::new(SExpKind::Literal(Literal::String(v.into())))
    }

    pub fn number(v: impl Into<f64>) -> Self {
        SExp::new(SExpKind::Literal(Literal::Number(v.into())))
    }

    pub fn bool(v: bool) -> Self {
        SExp::new(SExpKind::Literal(Literal::Bool(v)))
    }

    pub fn null() -> Self {
        SExp::new(SExpKind::Literal(Literal::Null))
    }
}

// Accessors
impl SExp {
    pub fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            SExpKind::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match &self.kind {
            SExpKind::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match &self.kind {
            SExpKind::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match &self.kind {
            SExpKind::Literal(Literal::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match &self.kind {
            SExpKind::Literal(Literal::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn is_symbol(&self, name: &str) -> bool {
        self.as_symbol() == Some(name)
    }

    /// The leading symbol of a non-empty list.
    pub fn head_symbol(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(SExp::as_symbol)
    }

    /// True for a list whose leading symbol is `name`.
    pub fn is_form(&self, name: &str) -> bool {
        self.head_symbol() == Some(name)
    }
}

impl fmt::Display for SExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_sexpr(self))
    }
}
