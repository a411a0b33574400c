//! Source positions shared by AST and IR nodes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A location in a source file.
///
/// Positions are plain values. Nodes derived from a source node receive a
/// copy, never a reference, so a position can't change under a node that
/// inherited it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub column: usize,
    /// Opaque file path, passed through unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            line,
            column,
            file: None,
        }
    }

    pub fn in_file(line: usize, column: usize, file: impl Into<String>) -> Self {
        Self {
            line,
            column,
            file: Some(file.into()),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}
