//! Lowering core for sprig: S-expression AST to JavaScript-shaped IR.
//!
//! - [`LoweringContext`]: per-unit traversal state; lowers forms and programs
//! - [`FunctionRegistry`]: declared functions, used to check and complete calls
//! - [`pattern`]: binding patterns to IR patterns
//! - [`types`]: type expressions to [`TypeNode`](rhizome_sprig_ir::TypeNode)
//! - [`error`]: located, coded errors with source excerpts
//!
//! ```text
//! let forms = rhizome_sprig_sexpr::from_json_program(&json)?;
//! let program = rhizome_sprig_lower::lower_program(&forms, "src/")?;
//! ```

mod call;
mod context;
pub mod error;
mod forms;
mod lower;
pub mod options;
pub mod pattern;
pub mod registry;
mod resolve;
pub mod symbols;
pub mod types;

pub use context::LoweringContext;
pub use error::{ErrorType, Result, SprigError};
pub use options::{LowerOptions, RedefinitionPolicy};
pub use registry::{FunctionEntry, FunctionRegistry};

use rhizome_sprig_ir::{Node, Program};
use rhizome_sprig_sexpr::SExp;
use std::path::PathBuf;

/// Lower a single node with a fresh context and default options.
pub fn lower(node: &SExp, context_dir: impl Into<PathBuf>) -> Result<Option<Node>> {
    LoweringContext::new(context_dir).lower(node)
}

/// Lower a whole unit with a fresh context and default options.
pub fn lower_program(forms: &[SExp], context_dir: impl Into<PathBuf>) -> Result<Program> {
    LoweringContext::new(context_dir).lower_program(forms)
}
