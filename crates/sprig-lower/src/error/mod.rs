//! Error substrate shared by every lowering phase.
//!
//! All failures are [`SprigError`]s: a type, a numeric code, a message, an
//! optional source location and an optional cause. Source excerpts are only
//! computed when a diagnostic is actually rendered.

pub mod codes;
pub mod context;

pub use context::ContextLine;

use once_cell::sync::OnceCell;
use rhizome_sprig_ir::Position;
use rhizome_sprig_sexpr::SExprError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Location of an error in the source.
pub type SourceLocation = Position;

pub type Result<T, E = SprigError> = std::result::Result<T, E>;

/// Error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    Parse,
    Import,
    Validation,
    Macro,
    Transform,
    Runtime,
    CodeGen,
}

impl ErrorType {
    pub fn name(self) -> &'static str {
        match self {
            ErrorType::Parse => "ParseError",
            ErrorType::Import => "ImportError",
            ErrorType::Validation => "ValidationError",
            ErrorType::Macro => "MacroError",
            ErrorType::Transform => "TransformError",
            ErrorType::Runtime => "RuntimeError",
            ErrorType::CodeGen => "CodeGenError",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A located, coded compiler error.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SprigError {
    error_type: ErrorType,
    code: u32,
    message: String,
    location: Option<SourceLocation>,
    context: OnceCell<Vec<ContextLine>>,
    #[source]
    cause: Option<Cause>,
    reported: AtomicBool,
}

impl SprigError {
    /// Create an error whose code is inferred from the message.
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            error_type,
            code: codes::infer_code(error_type, &message),
            message,
            location: None,
            context: OnceCell::new(),
            cause: None,
            reported: AtomicBool::new(false),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Parse, message)
    }

    pub fn import(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Import, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Validation, message)
    }

    pub fn macro_error(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Macro, message)
    }

    pub fn transform(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Transform, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Runtime, message)
    }

    pub fn codegen(message: impl Into<String>) -> Self {
        Self::new(ErrorType::CodeGen, message)
    }

    /// Override the inferred code.
    pub fn with_code(mut self, code: u32) -> Self {
        self.code = code;
        self
    }

    /// Set the location, replacing any existing one.
    pub fn at(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }

    /// Set the location only if the error has none yet.
    pub fn or_at(mut self, location: Option<&SourceLocation>) -> Self {
        if self.location.is_none() {
            self.location = location.cloned();
        }
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Wrap an unlocated error from inside `form` into a located transform
    /// error. Errors that already carry a location pass through untouched.
    /// The wrapper always carries the transform-failure code; the inner
    /// error keeps its own as the cause.
    pub fn in_form(self, form: &str, location: Option<&SourceLocation>) -> Self {
        if self.location.is_some() {
            return self;
        }
        let message = format!("Failed to transform {}: {}", form, self.message);
        SprigError::transform(message)
            .with_code(codes::TRANSFORM_FAILED)
            .at(location.cloned())
            .with_cause(self)
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Short code label, e.g. `E3001`.
    pub fn code_label(&self) -> String {
        format!("E{:04}", self.code)
    }

    /// Source lines around the error location.
    ///
    /// Computed from `source` on first call and cached; later calls return
    /// the cached lines.
    pub fn context_lines(&self, source: &str) -> &[ContextLine] {
        self.context.get_or_init(|| match &self.location {
            Some(location) => context::extract(source, location),
            None => Vec::new(),
        })
    }

    /// Render the error as header, location, excerpt and caret.
    pub fn format(&self, source: Option<&str>) -> String {
        let mut out = format!(
            "{}[{}]: {}\n",
            self.error_type,
            self.code_label(),
            self.message
        );

        if let Some(location) = &self.location {
            out.push_str(&format!("  --> {}\n", location));
            if let Some(source) = source {
                let lines = self.context_lines(source);
                if !lines.is_empty() {
                    out.push_str(&context::render(lines));
                }
            }
        }

        out
    }

    /// Render the error once. Later calls on the same error return `None`,
    /// so an error caught at several sites is reported a single time.
    pub fn report(&self, source: Option<&str>) -> Option<String> {
        if self.reported.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(self.format(source))
    }

    pub fn is_reported(&self) -> bool {
        self.reported.load(Ordering::Acquire)
    }
}

impl From<SExprError> for SprigError {
    fn from(err: SExprError) -> Self {
        let location = err.position().cloned();
        let code = match &err {
            SExprError::InvalidNode(_) => codes::INVALID_NODE,
            SExprError::InvalidPosition(_) => codes::INVALID_POSITION,
            SExprError::InvalidPattern { .. } => codes::INVALID_PATTERN,
            SExprError::InvalidParams { .. } => codes::INVALID_PARAMS,
        };
        SprigError::parse(capitalize(&err.to_string()))
            .with_code(code)
            .at(location)
            .with_cause(err)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
