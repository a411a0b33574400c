//! Read AST from its JSON interchange form.

use crate::{Position, SExp, SExprError};
use rhizome_sprig_ir::Literal;
use serde_json::{Map, Value};

/// Convert one JSON value to an AST node.
pub fn from_json(value: &Value) -> Result<SExp, SExprError> {
    match value {
        Value::Null => Ok(SExp::null()),
        Value::Bool(b) => Ok(SExp::bool(*b)),
        Value::Number(n) => n
            .as_f64()
            .map(SExp::number)
            .ok_or_else(|| SExprError::InvalidNode(format!("unrepresentable number {}", n))),
        Value::String(s) => Ok(SExp::symbol(s.clone())),

        Value::Array(arr) => {
            let items: Result<Vec<SExp>, _> = arr.iter().map(from_json).collect();
            Ok(SExp::list(items?))
        }

        Value::Object(map) => object_to_sexp(map),
    }
}

/// Convert a JSON array of top-level forms.
pub fn from_json_program(value: &Value) -> Result<Vec<SExp>, SExprError> {
    let forms = value
        .as_array()
        .ok_or_else(|| SExprError::InvalidNode("program must be an array of forms".into()))?;
    forms.iter().map(from_json).collect()
}

fn object_to_sexp(map: &Map<String, Value>) -> Result<SExp, SExprError> {
    if let Some(s) = map.get("str") {
        let text = s
            .as_str()
            .ok_or_else(|| SExprError::InvalidNode("\"str\" must hold a string".into()))?;
        return Ok(SExp::new(crate::SExpKind::Literal(Literal::String(text.to_string()))));
    }

    if let Some(inner) = map.get("node") {
        let node = from_json(inner)?;
        let position = read_position(map)?;
        return Ok(node.at(Some(position)));
    }

    Err(SExprError::InvalidNode(format!(
        "unexpected object with keys [{}]",
        map.keys().cloned().collect::<Vec<_>>().join(", ")
    )))
}

fn read_position(map: &Map<String, Value>) -> Result<Position, SExprError> {
    let line = read_index(map, "line")?;
    let column = read_index(map, "column")?;
    let file = match map.get("file") {
        None | Some(Value::Null) => None,
        Some(Value::String(f)) => Some(f.clone()),
        Some(other) => {
            return Err(SExprError::InvalidPosition(format!(
                "file must be a string, got {}",
                other
            )))
        }
    };
    Ok(Position { line, column, file })
}

fn read_index(map: &Map<String, Value>, key: &str) -> Result<usize, SExprError> {
    map.get(key)
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .ok_or_else(|| SExprError::InvalidPosition(format!("missing or invalid \"{}\"", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SExpKind;
    use serde_json::json;

    #[test]
    fn test_symbols_and_literals() {
        let node = from_json(&json!(["greet", {"str": "x"}, 1, true, null])).unwrap();
        let items = node.as_list().unwrap();
        assert!(items[0].is_symbol("greet"));
        assert_eq!(items[1].as_string(), Some("x"));
        assert_eq!(items[2].as_number(), Some(1.0));
        assert!(matches!(items[3].kind, SExpKind::Literal(Literal::Bool(true))));
        assert!(matches!(items[4].kind, SExpKind::Literal(Literal::Null)));
    }

    #[test]
    fn test_position_attached() {
        let node = from_json(&json!({
            "line": 4, "column": 2, "file": "main.sprig",
            "node": ["add", {"line": 4, "column": 7, "node": 1}]
        }))
        .unwrap();
        assert_eq!(node.position, Some(Position::in_file(4, 2, "main.sprig")));
        let items = node.as_list().unwrap();
        assert_eq!(items[0].position, None);
        assert_eq!(items[1].position, Some(Position::new(4, 7)));
    }

    #[test]
    fn test_bad_object() {
        let err = from_json(&json!({"what": 1})).unwrap_err();
        assert!(matches!(err, SExprError::InvalidNode(_)));

        let err = from_json(&json!({"node": "x", "line": "one", "column": 1})).unwrap_err();
        assert!(matches!(err, SExprError::InvalidPosition(_)));
    }

    #[test]
    fn test_program() {
        let forms = from_json_program(&json!([["let", "x", 1], ["print", "x"]])).unwrap();
        assert_eq!(forms.len(), 2);
        assert!(from_json_program(&json!("x")).is_err());
    }
}
