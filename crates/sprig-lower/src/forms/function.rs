//! Function forms: `fn`, `fn*`, `async`, `=>`, `return`, `yield`, `await`.

use super::Form;
use crate::context::LoweringContext;
use crate::error::{codes, Result, SprigError};
use crate::lower::function_node;
use crate::pattern::{bound_names, keyed_property, lower_pattern};
use crate::registry::FunctionEntry;
use crate::symbols::sanitize;
use crate::types::{parse_type_text, split_top_level};
use rhizome_sprig_ir::{Function, Node, NodeKind, Position, TypeNode};
use rhizome_sprig_sexpr::{parse_params, ParamList, Pattern, SExp, SExpKind};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Flavor {
    pub is_async: bool,
    pub is_generator: bool,
}

/// Everything needed to build one function.
pub(crate) struct FunctionSpec<'a> {
    pub name: Option<&'a str>,
    pub type_params: Vec<String>,
    pub params: ParamList,
    pub return_type: Option<TypeNode>,
    pub body: &'a [SExp],
    pub flavor: Flavor,
    pub is_arrow: bool,
    /// Record the function so later calls resolve against it.
    pub register: bool,
    /// The last body form is the return value.
    pub implicit_return: bool,
    pub position: Option<Position>,
}

impl LoweringContext {
    /// `(fn name [params] :Ret body...)` or `(fn [params] body...)`.
    pub(crate) fn lower_fn(&mut self, form: &Form<'_>, flavor: Flavor) -> Result<Node> {
        form.at_least(1)?;
        let (name, type_params, rest) = match form.args[0].as_symbol() {
            Some(symbol) => {
                let (name, type_params) = split_generics(symbol);
                (Some(name), type_params, &form.args[1..])
            }
            None => (None, Vec::new(), form.args),
        };

        let (params, body) = rest.split_first().ok_or_else(|| {
            form.invalid(format!("'{}' requires a parameter list", form.name))
                .with_code(codes::FORM_ARITY)
        })?;
        let (return_type, body) = split_return_type(body);

        let spec = FunctionSpec {
            name,
            type_params,
            params: parse_params(params)?,
            return_type,
            body,
            flavor,
            is_arrow: false,
            register: name.is_some(),
            implicit_return: true,
            position: form.position(),
        };
        let declaration = name.is_some();
        let function = self.build_function(spec)?;
        Ok(function_node(function, declaration, form.position()))
    }

    /// `(async fn ...)`, `(async fn* ...)`, `(async => ...)`.
    pub(crate) fn lower_async(&mut self, form: &Form<'_>) -> Result<Node> {
        form.at_least(1)?;
        let (head, args) = match &form.args[0].kind {
            SExpKind::Symbol(head) => (head.as_str(), &form.args[1..]),
            SExpKind::List(items) if form.args.len() == 1 && !items.is_empty() => {
                match items[0].as_symbol() {
                    Some(head) => (head, &items[1..]),
                    None => return Err(self.async_target_error(form)),
                }
            }
            _ => return Err(self.async_target_error(form)),
        };

        let inner = Form {
            node: form.node,
            name: head,
            args,
        };
        match head {
            "fn" => self.lower_fn(&inner, Flavor { is_async: true, is_generator: false }),
            "fn*" => self.lower_fn(&inner, Flavor { is_async: true, is_generator: true }),
            "=>" => self.lower_arrow(&inner, true),
            _ => Err(self.async_target_error(form)),
        }
    }

    fn async_target_error(&self, form: &Form<'_>) -> SprigError {
        form.invalid("'async' expects fn, fn* or => to follow")
            .with_code(codes::INVALID_FORM)
    }

    /// `(=> [x y] body...)` with explicit parameters, or `(=> body...)`
    /// where `$0`, `$1`, ... in the body become the parameters.
    pub(crate) fn lower_arrow(&mut self, form: &Form<'_>, is_async: bool) -> Result<Node> {
        form.at_least(1)?;
        let explicit = form.args.len() >= 2
            && (form.args[0].is_form("vector") || form.args[0].is_form("empty-array"));

        let (params, body) = if explicit {
            (parse_params(&form.args[0])?, &form.args[1..])
        } else {
            let count = form.args.iter().filter_map(max_implicit_param).max().map_or(0, |max| max + 1);
            let params = (0..count).map(|i| Pattern::identifier(format!("${}", i))).collect();
            (
                ParamList {
                    params,
                    structured: false,
                },
                form.args,
            )
        };

        let spec = FunctionSpec {
            name: None,
            type_params: Vec::new(),
            params,
            return_type: None,
            body,
            flavor: Flavor {
                is_async,
                is_generator: false,
            },
            is_arrow: true,
            register: false,
            implicit_return: true,
            position: form.position(),
        };
        let function = self.build_function(spec)?;
        Ok(Node::function_expr(function).at(form.position()))
    }

    pub(crate) fn build_function(&mut self, spec: FunctionSpec<'_>) -> Result<Function> {
        let (params, defaults) = self.lower_params(&spec.params, spec.position.as_ref())?;

        if spec.register {
            if let Some(name) = spec.name {
                let entry = FunctionEntry {
                    params: spec.params.params.clone(),
                    defaults,
                    uses_structured_map_params: spec.params.structured,
                    body: spec.body.to_vec(),
                    position: spec.position.clone(),
                };
                self.registry.declare(sanitize(name), entry)?;
            }
        }

        let body_forms = spec.body;
        let implicit_return = spec.implicit_return;
        let locals: Vec<String> = params
            .iter()
            .flat_map(bound_names)
            .map(str::to_string)
            .collect();
        let (body, early_return) = self.in_function(|ctx| {
            ctx.in_scope(locals, |ctx| {
                if implicit_return {
                    ctx.lower_returning_body(body_forms)
                } else {
                    ctx.lower_body(body_forms)
                }
            })
        })?;
        let body = if early_return {
            self.catch_early_return(body, spec.position.as_ref())
        } else {
            body
        };

        Ok(Function {
            id: spec.name.map(sanitize),
            params,
            body,
            is_async: spec.flavor.is_async,
            is_generator: spec.flavor.is_generator,
            is_arrow: spec.is_arrow,
            return_type: spec.return_type,
            type_params: spec.type_params,
        })
    }

    /// Lower a parameter list. Returns the IR parameters and the lowered
    /// default of every defaulted parameter, keyed for the registry.
    ///
    /// A parameter map becomes a single `{a = 1, b} = {}` parameter.
    fn lower_params(
        &mut self,
        list: &ParamList,
        position: Option<&Position>,
    ) -> Result<(Vec<Node>, HashMap<String, Node>)> {
        let mut params = Vec::with_capacity(list.params.len());
        let mut defaults = HashMap::new();

        for (index, param) in list.params.iter().enumerate() {
            let mut transform = |expr: &SExp| self.lower_expr(expr);
            let lowered = match lower_pattern(param, &mut transform)? {
                Some(lowered) => lowered,
                // `_` as a parameter: an ignored positional slot.
                None => Node::ident(format!("__unused_{}", index)).at(param.position.clone()),
            };
            if let NodeKind::AssignmentPattern { default, .. } = &lowered.kind {
                defaults.insert(FunctionEntry::param_key(param, index), (**default).clone());
            }
            params.push(lowered);
        }

        if list.structured {
            let mut properties = Vec::with_capacity(params.len());
            for (param, lowered) in list.params.iter().zip(params) {
                let name = param.name().ok_or_else(|| {
                    SprigError::validation("Invalid parameter map: keys must be plain names")
                        .at(param.position.clone().or_else(|| position.cloned()))
                })?;
                properties.push(keyed_property(&sanitize(name), lowered));
            }
            let object = Node::object_pattern(properties).or_at(position);
            params = vec![Node::assignment_pattern(object, Node::object(Vec::new())).or_at(position)];
        }

        Ok((params, defaults))
    }

    /// `(return)` / `(return x)`. Inside an expression wrapper a plain
    /// `return` would only leave the wrapper, so it throws a marker object
    /// that the enclosing function catches and unwraps.
    pub(crate) fn lower_return(&mut self, form: &Form<'_>) -> Result<Node> {
        form.between(0, 1)?;
        if self.function_depth == 0 {
            return Err(form
                .invalid("'return' used outside of a function")
                .with_code(codes::MISPLACED_FORM));
        }
        let value = form.args.first().map(|arg| self.lower_expr(arg)).transpose()?;

        if self.iife_depth == 0 {
            return Ok(Node::return_stmt(value));
        }

        self.early_return = true;
        let value = value.unwrap_or_else(|| Node::undefined().at(form.position()));
        let marker = Node::object(vec![
            Node::property(self.options.early_return_key.clone(), Node::bool(true).at(form.position()))
                .at(form.position()),
            Node::property("value", value).at(form.position()),
        ])
        .at(form.position());
        Ok(Node::throw_stmt(marker))
    }

    pub(crate) fn lower_yield(&mut self, form: &Form<'_>, delegate: bool) -> Result<Node> {
        if delegate {
            form.exactly(1)?;
        } else {
            form.between(0, 1)?;
        }
        if self.function_depth == 0 {
            return Err(form
                .invalid(format!("'{}' used outside of a function", form.name))
                .with_code(codes::MISPLACED_FORM));
        }
        let argument = form.args.first().map(|arg| self.lower_expr(arg)).transpose()?;
        self.suspension.yields = true;
        Ok(Node::yield_expr(argument, delegate))
    }

    pub(crate) fn lower_await(&mut self, form: &Form<'_>) -> Result<Node> {
        form.exactly(1)?;
        let argument = self.lower_expr(&form.args[0])?;
        self.suspension.awaits = true;
        Ok(Node::await_expr(argument))
    }
}

/// `name<T, U>` to `("name", ["T", "U"])`.
pub(crate) fn split_generics(symbol: &str) -> (&str, Vec<String>) {
    match symbol.find('<') {
        Some(open) if symbol.ends_with('>') && open > 0 => {
            let inner = &symbol[open + 1..symbol.len() - 1];
            let params = split_top_level(inner, ',')
                .into_iter()
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            (&symbol[..open], params)
        }
        _ => (symbol, Vec::new()),
    }
}

/// A leading `:Type` symbol in a function body is its return type.
fn split_return_type(body: &[SExp]) -> (Option<TypeNode>, &[SExp]) {
    let annotation = body
        .first()
        .and_then(SExp::as_symbol)
        .and_then(|symbol| symbol.strip_prefix(':'))
        .filter(|ty| !ty.is_empty());
    match annotation {
        Some(ty) => (Some(parse_type_text(ty)), &body[1..]),
        None => (None, body),
    }
}

/// Highest `$N` referenced in `node`, not looking inside nested arrows.
fn max_implicit_param(node: &SExp) -> Option<usize> {
    match &node.kind {
        SExpKind::Symbol(name) => {
            let base = name.split(['.', '?']).next().unwrap_or(name);
            base.strip_prefix('$').and_then(|digits| digits.parse().ok())
        }
        SExpKind::List(_) if node.is_form("=>") => None,
        SExpKind::List(items) => items.iter().filter_map(max_implicit_param).max(),
        SExpKind::Literal(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhizome_sprig_ir::{BinaryOp, Literal};
    use rhizome_sprig_sexpr::from_json;
    use serde_json::json;

    fn lower(ctx: &mut LoweringContext, value: serde_json::Value) -> Result<Node> {
        ctx.lower(&from_json(&value).unwrap()).map(|n| n.unwrap())
    }

    fn function(node: Node) -> Function {
        match node.kind {
            NodeKind::FunctionDeclaration(f) | NodeKind::Function(f) => *f,
            _ => panic!("expected function, got {:?}", node.kind),
        }
    }

    #[test]
    fn test_named_function_returns_last_form() {
        let mut ctx = LoweringContext::new(".");
        let node = lower(&mut ctx, json!(["fn", "add", ["a", "b"], ["+", "a", "b"]])).unwrap();
        assert!(matches!(node.kind, NodeKind::FunctionDeclaration(_)));
        let f = function(node);
        assert_eq!(f.id.as_deref(), Some("add"));
        assert_eq!(f.params, vec![Node::ident("a"), Node::ident("b")]);
        assert_eq!(
            f.body,
            vec![Node::return_stmt(Some(Node::binary(
                BinaryOp::Add,
                Node::ident("a"),
                Node::ident("b")
            )))]
        );
        assert!(ctx.registry().contains("add"));
    }

    #[test]
    fn test_typed_generic_function() {
        let mut ctx = LoweringContext::new(".");
        let f = function(
            lower(&mut ctx, json!(["fn", "first<T>", ["xs:T[]"], ":T", ["get", "xs", 0]])).unwrap(),
        );
        assert_eq!(f.id.as_deref(), Some("first"));
        assert_eq!(f.type_params, vec!["T".to_string()]);
        assert_eq!(f.return_type, Some(TypeNode::named("T")));
        match &f.params[0].kind {
            NodeKind::Identifier { type_annotation, .. } => {
                assert_eq!(type_annotation, &Some(TypeNode::array(TypeNode::named("T"))))
            }
            _ => panic!("expected typed identifier"),
        }
    }

    #[test]
    fn test_structured_params_become_object_pattern() {
        let mut ctx = LoweringContext::new(".");
        let f = function(
            lower(&mut ctx, json!(["fn", "box", ["hash-map", "width:", 1, "height:", 2], "width"])).unwrap(),
        );
        assert_eq!(f.params.len(), 1);
        match &f.params[0].kind {
            NodeKind::AssignmentPattern { target, default } => {
                assert!(matches!(&target.kind, NodeKind::ObjectPattern(p) if p.len() == 2));
                assert_eq!(**default, Node::object(vec![]));
            }
            _ => panic!("expected defaulted object pattern"),
        }
        assert!(ctx.registry().get("box").unwrap().uses_structured_map_params);
    }

    #[test]
    fn test_recursion_resolves_against_itself() {
        let mut ctx = LoweringContext::new(".");
        let err = lower(
            &mut ctx,
            json!(["fn", "fact", ["n"], ["if", ["<=", "n", 1], 1, ["*", "n", {"line": 1, "column": 30, "node": ["fact"]}]]]),
        )
        .unwrap_err();
        assert_eq!(err.code(), codes::MISSING_ARGUMENT);
    }

    #[test]
    fn test_implicit_arrow_params() {
        let mut ctx = LoweringContext::new(".");
        let f = function(lower(&mut ctx, json!(["=>", ["+", "$0", "$1.length"]])).unwrap());
        assert!(f.is_arrow);
        assert_eq!(f.params, vec![Node::ident("$0"), Node::ident("$1")]);

        let f = function(lower(&mut ctx, json!(["=>", ["vector", "x"], "x"])).unwrap());
        assert_eq!(f.params, vec![Node::ident("x")]);
    }

    #[test]
    fn test_async_and_generator_flags() {
        let mut ctx = LoweringContext::new(".");
        let f = function(lower(&mut ctx, json!(["async", "fn", "load", [], ["await", ["fetch"]]])).unwrap());
        assert!(f.is_async && !f.is_generator);
        let f = function(lower(&mut ctx, json!(["fn*", "gen", [], ["yield", 1]])).unwrap());
        assert!(f.is_generator);
        assert!(lower(&mut ctx, json!(["async", "class"])).is_err());
    }

    #[test]
    fn test_return_outside_function() {
        let mut ctx = LoweringContext::new(".");
        let err = lower(&mut ctx, json!({"line": 1, "column": 1, "node": ["return", 1]})).unwrap_err();
        assert_eq!(err.code(), codes::MISPLACED_FORM);
    }

    #[test]
    fn test_nested_return_throws_marker() {
        let mut ctx = LoweringContext::new(".");
        // The `return` sits inside a `let` value, so it needs the escape.
        let f = function(
            lower(
                &mut ctx,
                json!(["fn", "check", ["x"], ["let", "y", ["do", ["return", "x"], 2]], "y"]),
            )
            .unwrap(),
        );
        assert_eq!(f.body.len(), 1);
        assert!(matches!(f.body[0].kind, NodeKind::Try { .. }));

        let direct = function(lower(&mut ctx, json!(["fn", "id", ["x"], ["return", "x"]])).unwrap());
        assert_eq!(direct.body, vec![Node::return_stmt(Some(Node::ident("x")))]);
    }

    #[test]
    fn test_parameter_defaults_recorded() {
        let mut ctx = LoweringContext::new(".");
        lower(&mut ctx, json!(["fn", "pad", ["s", "width", "=", 8], "s"])).unwrap();
        let entry = ctx.registry().get("pad").unwrap();
        assert_eq!(entry.default_for(1), Some(&Node::literal(Literal::Number(8.0))));
    }

    fn declared_init(f: &Function) -> &Node {
        let NodeKind::VariableDeclaration { declarations, .. } = &f.body[0].kind else {
            panic!("expected declaration, got {:?}", f.body[0]);
        };
        match &declarations[0].kind {
            NodeKind::VariableDeclarator { init: Some(init), .. } => init,
            other => panic!("expected initialised declarator, got {:?}", other),
        }
    }

    #[test]
    fn test_wrapper_in_async_function_is_awaited() {
        let mut ctx = LoweringContext::new(".");
        let f = function(
            lower(
                &mut ctx,
                json!(["async", "fn", "load", [], ["const", "x", ["do", ["await", ["fetch"]], 1]], "x"]),
            )
            .unwrap(),
        );
        let NodeKind::Await(call) = &declared_init(&f).kind else {
            panic!("expected awaited wrapper, got {:?}", declared_init(&f));
        };
        match &call.kind {
            NodeKind::Call { callee, .. } => {
                assert!(matches!(&callee.kind, NodeKind::Function(w) if w.is_async && w.is_arrow))
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_wrapper_in_generator_is_delegated() {
        let mut ctx = LoweringContext::new(".");
        let f = function(
            lower(&mut ctx, json!(["fn*", "gen", [], ["const", "x", ["do", ["yield", 1], 2]], "x"])).unwrap(),
        );
        match &declared_init(&f).kind {
            NodeKind::Yield {
                argument: Some(call),
                delegate: true,
            } => {
                let rendered = format!("{:?}", call);
                assert!(rendered.contains("is_generator: true"));
                assert!(rendered.contains("This"));
            }
            other => panic!("expected yield*, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_function_suspension_stays_inside() {
        let mut ctx = LoweringContext::new(".");
        let f = function(
            lower(
                &mut ctx,
                json!(["fn", "outer", [], ["const", "g", ["do", ["async", "=>", ["await", "y"]], 1]], "g"]),
            )
            .unwrap(),
        );
        match &declared_init(&f).kind {
            NodeKind::Call { callee, .. } => {
                assert!(matches!(&callee.kind, NodeKind::Function(w) if !w.is_async))
            }
            other => panic!("expected plain wrapper, got {:?}", other),
        }
    }

    #[test]
    fn test_parameter_shadows_declared_function() {
        let mut ctx = LoweringContext::new(".");
        lower(&mut ctx, json!(["fn", "add", ["a", "b"], ["+", "a", "b"]])).unwrap();

        let f = function(lower(&mut ctx, json!(["fn", "apply", ["add"], ["add", 1, 2, 3]])).unwrap());
        let expected = Node::call(
            Node::ident("add"),
            vec![Node::number(1), Node::number(2), Node::number(3)],
        );
        assert_eq!(f.body, vec![Node::return_stmt(Some(expected))]);

        let f = function(
            lower(&mut ctx, json!(["fn", "pick", [["hash-map", "add:", "add"]], ["add"]])).unwrap(),
        );
        assert_eq!(
            f.body,
            vec![Node::return_stmt(Some(Node::call(Node::ident("add"), vec![])))]
        );

        // Outside the shadowing function the declaration applies again.
        assert!(lower(&mut ctx, json!(["add", 1, 2, 3])).is_err());
    }
}
