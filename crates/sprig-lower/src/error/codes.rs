//! Numeric error codes and keyword-based code inference.
//!
//! Each error type owns a range (`Parse` 1xxx, `Import` 2xxx, ...). When a
//! caller does not pick a code, the message is matched against the type's
//! ordered keyword table; the first pattern found in the message wins, and
//! the type's base code is the fallback.

use super::ErrorType;
use once_cell::sync::Lazy;

// ----- Parse (1xxx) -----
pub const PARSE: u32 = 1000;
pub const UNEXPECTED_EOF: u32 = 1001;
pub const UNCLOSED_DELIMITER: u32 = 1002;
pub const INVALID_NODE: u32 = 1003;
pub const INVALID_PATTERN: u32 = 1004;
pub const INVALID_PARAMS: u32 = 1005;
pub const INVALID_POSITION: u32 = 1006;

// ----- Import (2xxx) -----
pub const IMPORT: u32 = 2000;
pub const MODULE_NOT_FOUND: u32 = 2001;
pub const CIRCULAR_IMPORT: u32 = 2002;
pub const INVALID_IMPORT: u32 = 2003;
pub const INVALID_EXPORT: u32 = 2004;

// ----- Validation (3xxx) -----
pub const VALIDATION: u32 = 3000;
pub const MISSING_ARGUMENT: u32 = 3001;
pub const TOO_MANY_ARGUMENTS: u32 = 3002;
pub const PLACEHOLDER_WITHOUT_DEFAULT: u32 = 3003;
pub const STRUCTURED_ARITY: u32 = 3004;
pub const STRUCTURED_SHAPE: u32 = 3005;
pub const DUPLICATE_DEFINITION: u32 = 3006;
pub const FORM_ARITY: u32 = 3007;
pub const MISPLACED_FORM: u32 = 3008;
pub const INVALID_FORM: u32 = 3009;

// ----- Macro (4xxx) -----
pub const MACRO: u32 = 4000;
pub const MACRO_NOT_DEFINED: u32 = 4001;
pub const MACRO_EXPANSION: u32 = 4002;
pub const MACRO_RECURSION: u32 = 4003;

// ----- Transform (5xxx) -----
pub const TRANSFORM: u32 = 5000;
pub const UNKNOWN_FORM: u32 = 5001;
pub const NOT_CALLABLE: u32 = 5002;
pub const TRANSFORM_FAILED: u32 = 5003;
pub const UNSUPPORTED: u32 = 5004;

// ----- Runtime (6xxx) -----
pub const RUNTIME: u32 = 6000;
pub const UNDEFINED_VALUE: u32 = 6001;
pub const NOT_A_FUNCTION: u32 = 6002;
pub const RUNTIME_TYPE: u32 = 6003;

// ----- CodeGen (7xxx) -----
pub const CODEGEN: u32 = 7000;
pub const EMIT_FAILED: u32 = 7001;
pub const SOURCE_MAP: u32 = 7002;

type Table = Vec<(String, u32)>;

fn table(entries: &[(&str, u32)]) -> Table {
    entries
        .iter()
        .map(|(pattern, code)| (pattern.to_lowercase(), *code))
        .collect()
}

static PARSE_PATTERNS: Lazy<Table> = Lazy::new(|| {
    table(&[
        ("Unexpected end", UNEXPECTED_EOF),
        ("Unclosed", UNCLOSED_DELIMITER),
        ("Invalid pattern", INVALID_PATTERN),
        ("Invalid parameter list", INVALID_PARAMS),
        ("Invalid position", INVALID_POSITION),
        ("Invalid node", INVALID_NODE),
    ])
});

static IMPORT_PATTERNS: Lazy<Table> = Lazy::new(|| {
    table(&[
        ("Not found", MODULE_NOT_FOUND),
        ("Cannot find", MODULE_NOT_FOUND),
        ("Circular", CIRCULAR_IMPORT),
        ("export", INVALID_EXPORT),
        ("import", INVALID_IMPORT),
    ])
});

static VALIDATION_PATTERNS: Lazy<Table> = Lazy::new(|| {
    table(&[
        ("Missing required", MISSING_ARGUMENT),
        ("Too many arguments", TOO_MANY_ARGUMENTS),
        ("Placeholder", PLACEHOLDER_WITHOUT_DEFAULT),
        ("At most one argument", STRUCTURED_ARITY),
        ("Map literal", STRUCTURED_SHAPE),
        ("Already defined", DUPLICATE_DEFINITION),
        ("Duplicate", DUPLICATE_DEFINITION),
        ("Outside", MISPLACED_FORM),
        ("Requires", FORM_ARITY),
        ("Expects", FORM_ARITY),
        ("Invalid", INVALID_FORM),
    ])
});

static MACRO_PATTERNS: Lazy<Table> = Lazy::new(|| {
    table(&[
        ("Not defined", MACRO_NOT_DEFINED),
        ("Recursion", MACRO_RECURSION),
        ("Expansion", MACRO_EXPANSION),
    ])
});

static TRANSFORM_PATTERNS: Lazy<Table> = Lazy::new(|| {
    table(&[
        ("Unknown", UNKNOWN_FORM),
        ("Cannot call", NOT_CALLABLE),
        ("Failed to transform", TRANSFORM_FAILED),
        ("Unsupported", UNSUPPORTED),
    ])
});

static RUNTIME_PATTERNS: Lazy<Table> = Lazy::new(|| {
    table(&[
        ("Not a function", NOT_A_FUNCTION),
        ("Undefined", UNDEFINED_VALUE),
        ("Type", RUNTIME_TYPE),
    ])
});

static CODEGEN_PATTERNS: Lazy<Table> = Lazy::new(|| {
    table(&[("Source map", SOURCE_MAP), ("Emit", EMIT_FAILED)])
});

/// Base code of an error type, used when no keyword matches.
pub fn base_code(error_type: ErrorType) -> u32 {
    match error_type {
        ErrorType::Parse => PARSE,
        ErrorType::Import => IMPORT,
        ErrorType::Validation => VALIDATION,
        ErrorType::Macro => MACRO,
        ErrorType::Transform => TRANSFORM,
        ErrorType::Runtime => RUNTIME,
        ErrorType::CodeGen => CODEGEN,
    }
}

/// Infer a code for `message` from the keyword table of `error_type`.
pub fn infer_code(error_type: ErrorType, message: &str) -> u32 {
    let patterns: &Table = match error_type {
        ErrorType::Parse => &PARSE_PATTERNS,
        ErrorType::Import => &IMPORT_PATTERNS,
        ErrorType::Validation => &VALIDATION_PATTERNS,
        ErrorType::Macro => &MACRO_PATTERNS,
        ErrorType::Transform => &TRANSFORM_PATTERNS,
        ErrorType::Runtime => &RUNTIME_PATTERNS,
        ErrorType::CodeGen => &CODEGEN_PATTERNS,
    };

    let message = message.to_lowercase();
    patterns
        .iter()
        .find(|(pattern, _)| message.contains(pattern.as_str()))
        .map(|(_, code)| *code)
        .unwrap_or_else(|| base_code(error_type))
}
