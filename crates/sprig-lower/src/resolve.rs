//! Call-site resolution against declared functions.

use crate::call::is_spread;
use crate::context::LoweringContext;
use crate::error::{codes, Result, SprigError};
use crate::registry::FunctionEntry;
use rhizome_sprig_ir::Node;
use rhizome_sprig_sexpr::{Pattern, SExp};

const PLACEHOLDER: &str = "_";

impl LoweringContext {
    /// Lower a call to a registered function, checking its arguments
    /// against the declared parameters and filling in defaults.
    ///
    /// Missing-argument errors point at the call, since there is no
    /// argument to point at. All other errors point at the offending
    /// argument.
    pub(crate) fn resolve_call(
        &mut self,
        name: &str,
        entry: &FunctionEntry,
        callee: Node,
        call: &SExp,
        args: &[SExp],
    ) -> Result<Node> {
        let position = call.position.clone();

        // Arity is only known at runtime once a spread is involved.
        if args.iter().any(is_spread) {
            let arguments = self.lower_arguments(args)?;
            return Ok(Node::call(callee, arguments).at(position));
        }

        if entry.uses_structured_map_params {
            let argument = self.structured_argument(name, call, args)?;
            return Ok(Node::call(callee, vec![argument]).at(position));
        }

        let positional = entry.positional();
        let has_rest = entry.rest_param().is_some();

        for (index, arg) in args.iter().enumerate() {
            if !arg.is_symbol(PLACEHOLDER) {
                continue;
            }
            match positional.get(index) {
                Some(param) if entry.default_for(index).is_none() => {
                    return Err(placeholder_error(name, param, index, arg, call));
                }
                Some(_) => {}
                None if has_rest => {
                    return Err(SprigError::validation(format!(
                        "Placeholder '_' cannot be passed to the rest parameter of '{}'",
                        name
                    ))
                    .with_code(codes::PLACEHOLDER_WITHOUT_DEFAULT)
                    .at(arg.position.clone().or_else(|| position.clone())));
                }
                // Reported as an extra argument below.
                None => {}
            }
        }

        if !has_rest && args.len() > positional.len() {
            let extras = &args[positional.len()..];
            let listed: Vec<String> = extras.iter().map(|a| a.to_string()).collect();
            return Err(SprigError::validation(format!(
                "Too many arguments in call to '{}': expected at most {}, got {} (extra: {})",
                name,
                positional.len(),
                args.len(),
                listed.join(", ")
            ))
            .with_code(codes::TOO_MANY_ARGUMENTS)
            .at(extras[0].position.clone().or_else(|| position.clone())));
        }

        let mut arguments = Vec::with_capacity(args.len().max(positional.len()));
        for (index, param) in positional.iter().enumerate() {
            let value = match args.get(index) {
                Some(arg) if arg.is_symbol(PLACEHOLDER) => entry
                    .default_for(index)
                    .cloned()
                    .ok_or_else(|| placeholder_error(name, param, index, arg, call))?,
                Some(arg) => self.lower_expr(arg)?,
                None => match entry.default_for(index) {
                    Some(default) => default.clone(),
                    None => {
                        return Err(SprigError::validation(format!(
                            "Missing required argument '{}' in call to '{}'",
                            FunctionEntry::param_label(param, index),
                            name
                        ))
                        .with_code(codes::MISSING_ARGUMENT)
                        .at(position));
                    }
                },
            };
            arguments.push(value);
        }

        if has_rest && args.len() > positional.len() {
            arguments.extend(self.lower_exprs(&args[positional.len()..])?);
        }

        Ok(Node::call(callee, arguments).at(position))
    }

    /// The single argument of a structured-parameter call.
    fn structured_argument(&mut self, name: &str, call: &SExp, args: &[SExp]) -> Result<Node> {
        match args {
            [] => Ok(Node::object(Vec::new()).at(call.position.clone())),
            [map] if map.is_form("hash-map") || map.is_form("empty-map") => self.lower_expr(map),
            [other] => Err(SprigError::validation(format!(
                "Function '{}' expects a map literal argument, got {}",
                name, other
            ))
            .with_code(codes::STRUCTURED_SHAPE)
            .at(other.position.clone().or_else(|| call.position.clone()))),
            [_, second, ..] => Err(SprigError::validation(format!(
                "Function '{}' takes at most one argument (a parameter map), got {}",
                name,
                args.len()
            ))
            .with_code(codes::STRUCTURED_ARITY)
            .at(second.position.clone().or_else(|| call.position.clone()))),
        }
    }
}

fn placeholder_error(name: &str, param: &Pattern, index: usize, arg: &SExp, call: &SExp) -> SprigError {
    SprigError::validation(format!(
        "Placeholder '_' used for parameter '{}' of '{}', which has no default value",
        FunctionEntry::param_label(param, index),
        name
    ))
    .with_code(codes::PLACEHOLDER_WITHOUT_DEFAULT)
    .at(arg.position.clone().or_else(|| call.position.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use rhizome_sprig_ir::{NodeKind, Position};
    use rhizome_sprig_sexpr::from_json;
    use serde_json::json;

    fn ctx_with(decl: serde_json::Value) -> LoweringContext {
        let mut ctx = LoweringContext::new(".");
        ctx.lower(&from_json(&decl).unwrap()).unwrap();
        ctx
    }

    fn call(ctx: &mut LoweringContext, value: serde_json::Value) -> Result<Node> {
        ctx.lower(&from_json(&value).unwrap()).map(|n| n.unwrap())
    }

    fn arguments(node: Node) -> Vec<Node> {
        match node.kind {
            NodeKind::Call { arguments, .. } => arguments,
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn test_missing_argument_names_parameter() {
        let mut ctx = ctx_with(json!(["fn", "add", ["a", "b"], ["+", "a", "b"]]));
        let err = call(&mut ctx, json!({"line": 3, "column": 1, "node": ["add", 1]})).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
        assert_eq!(err.code(), codes::MISSING_ARGUMENT);
        assert!(err.message().contains("'b'"));
        assert_eq!(err.location(), Some(&Position::new(3, 1)));
    }

    #[test]
    fn test_defaults_fill_missing_and_placeholder() {
        let mut ctx = ctx_with(json!(["fn", "greet", ["name", "greeting", "=", {"str": "hi"}], "name"]));
        let args = arguments(call(&mut ctx, json!(["greet", {"str": "bob"}])).unwrap());
        assert_eq!(args, vec![Node::string("bob"), Node::string("hi")]);

        let args = arguments(call(&mut ctx, json!(["greet", {"str": "bob"}, "_"])).unwrap());
        assert_eq!(args[1], Node::string("hi"));
    }

    #[test]
    fn test_placeholder_without_default_fails_first() {
        let mut ctx = ctx_with(json!(["fn", "f", ["a", "b"], "a"]));
        // The other argument is itself invalid; the placeholder is still reported.
        let err = call(
            &mut ctx,
            json!([{"line": 1, "column": 2, "node": "f"}, {"line": 1, "column": 4, "node": "_"}, [1, 2]]),
        )
        .unwrap_err();
        assert_eq!(err.code(), codes::PLACEHOLDER_WITHOUT_DEFAULT);
        assert_eq!(err.location(), Some(&Position::new(1, 4)));
    }

    #[test]
    fn test_too_many_arguments_lists_extras() {
        let mut ctx = ctx_with(json!(["fn", "one", ["a"], "a"]));
        let err = call(
            &mut ctx,
            json!(["one", 1, {"line": 5, "column": 9, "node": 2}, "x"]),
        )
        .unwrap_err();
        assert_eq!(err.code(), codes::TOO_MANY_ARGUMENTS);
        assert!(err.message().ends_with("(extra: 2, x)"));
        assert_eq!(err.location(), Some(&Position::new(5, 9)));
    }

    #[test]
    fn test_rest_parameter_consumes_remaining() {
        let mut ctx = ctx_with(json!(["fn", "log", ["level", "&", "parts"], "level"]));
        let args = arguments(call(&mut ctx, json!(["log", 1, 2, 3])).unwrap());
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_spread_skips_arity_checks() {
        let mut ctx = ctx_with(json!(["fn", "pair", ["a", "b"], "a"]));
        let args = arguments(call(&mut ctx, json!(["pair", "...xs", 1, 2, 3])).unwrap());
        assert_eq!(args[0], Node::spread(Node::ident("xs")));
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn test_structured_parameters() {
        let mut ctx = ctx_with(json!(["fn", "opts", ["hash-map", "size:", 1], "size"]));
        let args = arguments(call(&mut ctx, json!(["opts"])).unwrap());
        assert_eq!(args, vec![Node::object(vec![])]);

        let err = call(&mut ctx, json!({"line": 2, "column": 1, "node": ["opts", 1, 2]})).unwrap_err();
        assert!(err.message().contains("at most one argument"));
        assert_eq!(err.code(), codes::STRUCTURED_ARITY);

        let err = call(&mut ctx, json!({"line": 3, "column": 1, "node": ["opts", 1]})).unwrap_err();
        assert_eq!(err.code(), codes::STRUCTURED_SHAPE);

        let args = arguments(call(&mut ctx, json!(["opts", ["hash-map", "size:", 3]])).unwrap());
        assert!(matches!(args[0].kind, NodeKind::Object(_)));
    }

    #[test]
    fn test_call_before_declaration_is_unchecked() {
        let mut ctx = LoweringContext::new(".");
        assert!(call(&mut ctx, json!(["later", 1, 2, 3])).is_ok());
        ctx.lower(&from_json(&json!(["fn", "later", ["a"], "a"])).unwrap()).unwrap();
        assert!(call(&mut ctx, json!(["later", 1, 2, 3])).is_err());
    }
}
