//! Binding-pattern parsing.
//!
//! Pattern syntax inside binding positions:
//! - `name`, `name:Type` → identifier
//! - `_` → skipped slot
//! - `& rest`, `&rest`, `...rest` → rest element (last only)
//! - `(vector a b)` or `(a b)` → array pattern
//! - `(hash-map key target ...)` → object pattern; keys are string literals,
//!   `key:` keywords or symbols
//! - `target = expr` inside a sequence attaches a default

use crate::{Position, SExp, SExpKind, SExprError};

/// A parsed binding pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub kind: PatternKind,
    /// Unlowered default expression.
    pub default: Option<SExp>,
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternKind {
    Identifier {
        name: String,
        /// Raw annotation text after the `:`.
        type_annotation: Option<String>,
    },
    Array(Vec<Pattern>),
    Object {
        properties: Vec<PropertyPattern>,
        rest: Option<Box<Pattern>>,
    },
    Rest(Box<Pattern>),
    Skip,
}

/// `key target` inside an object pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyPattern {
    pub key: String,
    pub value: Pattern,
}

/// A function parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamList {
    /// Parameters in order; a trailing `PatternKind::Rest` is the rest parameter.
    pub params: Vec<Pattern>,
    /// True for `{key: default ...}` parameter maps.
    pub structured: bool,
}

impl Pattern {
    fn new(kind: PatternKind, position: Option<Position>) -> Self {
        Self {
            kind,
            default: None,
            position,
        }
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Pattern::new(
            PatternKind::Identifier {
                name: name.into(),
                type_annotation: None,
            },
            None,
        )
    }

    /// The bound name of an identifier pattern.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            PatternKind::Identifier { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self.kind, PatternKind::Rest(_))
    }
}

/// Parse a single binding target.
pub fn parse_pattern(node: &SExp) -> Result<Pattern, SExprError> {
    match &node.kind {
        SExpKind::Symbol(name) => symbol_pattern(name, node),
        SExpKind::List(items) => match node.head_symbol() {
            Some("vector") => array_pattern(&items[1..], node),
            Some("empty-array") => Ok(Pattern::new(PatternKind::Array(Vec::new()), node.position.clone())),
            Some("hash-map") => object_pattern(&items[1..], node),
            Some("empty-map") => Ok(Pattern::new(
                PatternKind::Object {
                    properties: Vec::new(),
                    rest: None,
                },
                node.position.clone(),
            )),
            _ => array_pattern(items, node),
        },
        SExpKind::Literal(_) => Err(invalid_pattern(
            format!("literal {} cannot be a binding target", node),
            node,
        )),
    }
}

/// Parse a function parameter list.
pub fn parse_params(node: &SExp) -> Result<ParamList, SExprError> {
    let items = node.as_list().ok_or_else(|| SExprError::InvalidParams {
        message: format!("expected a parameter list, got {}", node),
        position: node.position.clone(),
    })?;

    match node.head_symbol() {
        Some("hash-map") => structured_params(&items[1..], node),
        Some("empty-map") => Ok(ParamList {
            params: Vec::new(),
            structured: true,
        }),
        Some("empty-array") => Ok(ParamList {
            params: Vec::new(),
            structured: false,
        }),
        Some("vector") => Ok(ParamList {
            params: sequence(&items[1..], node)?,
            structured: false,
        }),
        _ => Ok(ParamList {
            params: sequence(items, node)?,
            structured: false,
        }),
    }
}

fn symbol_pattern(name: &str, node: &SExp) -> Result<Pattern, SExprError> {
    let position = node.position.clone();
    if name == "_" {
        return Ok(Pattern::new(PatternKind::Skip, position));
    }
    if let Some(target) = rest_target(name) {
        let inner = identifier(target, node)?;
        return Ok(Pattern::new(PatternKind::Rest(Box::new(inner)), position));
    }
    identifier(name, node)
}

fn rest_target(name: &str) -> Option<&str> {
    name.strip_prefix("...")
        .or_else(|| name.strip_prefix('&'))
        .filter(|rest| !rest.is_empty())
}

fn identifier(text: &str, node: &SExp) -> Result<Pattern, SExprError> {
    let (name, type_annotation) = match text.split_once(':') {
        Some((name, ty)) if !name.is_empty() && !ty.is_empty() => (name, Some(ty.to_string())),
        Some(_) => {
            return Err(invalid_pattern(
                format!("'{}' is a keyword, not a binding name", text),
                node,
            ))
        }
        None => (text, None),
    };

    if name.contains('.') || name == "&" || name == "..." || name == "=" {
        return Err(invalid_pattern(format!("'{}' is not a valid binding name", name), node));
    }

    Ok(Pattern::new(
        PatternKind::Identifier {
            name: name.to_string(),
            type_annotation,
        },
        node.position.clone(),
    ))
}

fn array_pattern(items: &[SExp], node: &SExp) -> Result<Pattern, SExprError> {
    Ok(Pattern::new(
        PatternKind::Array(sequence(items, node)?),
        node.position.clone(),
    ))
}

/// Parse a flat sequence of targets with `& rest` and `= default` markers.
fn sequence(items: &[SExp], parent: &SExp) -> Result<Vec<Pattern>, SExprError> {
    let mut patterns = Vec::new();
    let mut i = 0;

    while i < items.len() {
        let item = &items[i];
        let mut pattern = if item.is_symbol("&") || item.is_symbol("...") {
            let target = items.get(i + 1).ok_or_else(|| {
                invalid_pattern("rest marker must be followed by a binding".to_string(), item)
            })?;
            i += 2;
            let inner = parse_pattern(target)?;
            Pattern::new(PatternKind::Rest(Box::new(inner)), item.position.clone())
        } else {
            i += 1;
            parse_pattern(item)?
        };

        if items.get(i).map_or(false, |n| n.is_symbol("=")) {
            let default = items.get(i + 1).ok_or_else(|| {
                invalid_pattern("'=' must be followed by a default value".to_string(), &items[i])
            })?;
            if pattern.is_rest() {
                return Err(invalid_pattern(
                    "rest element cannot have a default".to_string(),
                    item,
                ));
            }
            pattern.default = Some(default.clone());
            i += 2;
        }

        patterns.push(pattern);
    }

    if let Some(idx) = patterns.iter().position(Pattern::is_rest) {
        if idx + 1 != patterns.len() {
            let at = patterns[idx].position.clone().or_else(|| parent.position.clone());
            return Err(SExprError::InvalidPattern {
                message: "rest element must be last".into(),
                position: at,
            });
        }
    }

    Ok(patterns)
}

fn object_pattern(items: &[SExp], node: &SExp) -> Result<Pattern, SExprError> {
    let mut properties = Vec::new();
    let mut rest = None;
    let mut i = 0;

    while i < items.len() {
        let item = &items[i];

        let rest_name = if item.is_symbol("&") || item.is_symbol("...") {
            let target = items.get(i + 1).ok_or_else(|| {
                invalid_pattern("rest marker must be followed by a binding".to_string(), item)
            })?;
            i += 2;
            Some(target)
        } else if item.as_symbol().and_then(rest_target).is_some() {
            i += 1;
            Some(item)
        } else {
            None
        };

        if let Some(target) = rest_name {
            if i < items.len() {
                return Err(invalid_pattern("rest element must be last".to_string(), item));
            }
            let inner = match target.as_symbol().and_then(rest_target) {
                Some(name) => identifier(name, target)?,
                None => match target.as_symbol() {
                    Some(name) => identifier(name, target)?,
                    None => {
                        return Err(invalid_pattern(
                            "object rest must bind a name".to_string(),
                            target,
                        ))
                    }
                },
            };
            rest = Some(Box::new(inner));
            break;
        }

        let key = property_key(item)?;
        let target = items.get(i + 1).ok_or_else(|| {
            invalid_pattern(format!("missing binding for key '{}'", key), item)
        })?;
        let mut value = parse_pattern(target)?;
        i += 2;

        if items.get(i).map_or(false, |n| n.is_symbol("=")) {
            let default = items.get(i + 1).ok_or_else(|| {
                invalid_pattern("'=' must be followed by a default value".to_string(), &items[i])
            })?;
            value.default = Some(default.clone());
            i += 2;
        }

        properties.push(PropertyPattern { key, value });
    }

    Ok(Pattern::new(
        PatternKind::Object { properties, rest },
        node.position.clone(),
    ))
}

fn structured_params(items: &[SExp], node: &SExp) -> Result<ParamList, SExprError> {
    if items.len() % 2 != 0 {
        return Err(SExprError::InvalidParams {
            message: "parameter map needs a default value for every key".into(),
            position: node.position.clone(),
        });
    }

    let mut params = Vec::new();
    for pair in items.chunks(2) {
        let key = property_key(&pair[0]).map_err(|_| SExprError::InvalidParams {
            message: format!("invalid parameter name {}", pair[0]),
            position: pair[0].position.clone(),
        })?;
        let mut param = identifier(&key, &pair[0])?;
        param.default = Some(pair[1].clone());
        params.push(param);
    }

    Ok(ParamList {
        params,
        structured: true,
    })
}

fn property_key(node: &SExp) -> Result<String, SExprError> {
    match &node.kind {
        SExpKind::Literal(rhizome_sprig_ir::Literal::String(s)) => Ok(s.clone()),
        SExpKind::Symbol(name) => {
            let key = name.strip_suffix(':').unwrap_or(name);
            if key.is_empty() {
                Err(invalid_pattern("empty property key".to_string(), node))
            } else {
                Ok(key.to_string())
            }
        }
        _ => Err(invalid_pattern(format!("invalid property key {}", node), node)),
    }
}

fn invalid_pattern(message: String, node: &SExp) -> SExprError {
    SExprError::InvalidPattern {
        message,
        position: node.position.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::from_json;
    use serde_json::json;

    fn pattern(value: serde_json::Value) -> Pattern {
        parse_pattern(&from_json(&value).unwrap()).unwrap()
    }

    #[test]
    fn test_identifier_with_type() {
        let p = pattern(json!("count:number"));
        match p.kind {
            PatternKind::Identifier {
                name,
                type_annotation,
            } => {
                assert_eq!(name, "count");
                assert_eq!(type_annotation.as_deref(), Some("number"));
            }
            _ => panic!("expected Identifier"),
        }
    }

    #[test]
    fn test_array_with_rest_forms() {
        for rest in [json!(["vector", "a", "b", "&rest"]), json!(["vector", "a", "b", "&", "rest"])] {
            let p = pattern(rest);
            match p.kind {
                PatternKind::Array(elements) => {
                    assert_eq!(elements.len(), 3);
                    assert_eq!(elements[0].name(), Some("a"));
                    match &elements[2].kind {
                        PatternKind::Rest(inner) => assert_eq!(inner.name(), Some("rest")),
                        _ => panic!("expected Rest"),
                    }
                }
                _ => panic!("expected Array"),
            }
        }
    }

    #[test]
    fn test_defaults_and_skip() {
        let p = pattern(json!(["vector", "_", "b", "=", 10]));
        match p.kind {
            PatternKind::Array(elements) => {
                assert!(matches!(elements[0].kind, PatternKind::Skip));
                assert_eq!(elements[1].default.as_ref().and_then(SExp::as_number), Some(10.0));
            }
            _ => panic!("expected Array"),
        }
    }

    #[test]
    fn test_rest_must_be_last() {
        let node = from_json(&json!(["vector", "&rest", "b"])).unwrap();
        let err = parse_pattern(&node).unwrap_err();
        assert!(err.to_string().contains("rest element must be last"));
    }

    #[test]
    fn test_object_pattern() {
        let p = pattern(json!(["hash-map", "name:", "name", {"str": "age"}, "years", "=", 0, "&", "others"]));
        match p.kind {
            PatternKind::Object { properties, rest } => {
                assert_eq!(properties.len(), 2);
                assert_eq!(properties[0].key, "name");
                assert_eq!(properties[1].key, "age");
                assert_eq!(properties[1].value.name(), Some("years"));
                assert!(properties[1].value.default.is_some());
                assert_eq!(rest.unwrap().name(), Some("others"));
            }
            _ => panic!("expected Object"),
        }
    }

    #[test]
    fn test_structured_params() {
        let node = from_json(&json!(["hash-map", "name:", {"str": "anon"}, "age:", 0])).unwrap();
        let params = parse_params(&node).unwrap();
        assert!(params.structured);
        assert_eq!(params.params.len(), 2);
        assert_eq!(params.params[0].name(), Some("name"));
        assert!(params.params[1].default.is_some());
    }

    #[test]
    fn test_literal_is_rejected() {
        let node = from_json(&json!(5)).unwrap();
        assert!(matches!(
            parse_pattern(&node),
            Err(SExprError::InvalidPattern { .. })
        ));
    }
}
