//! Data literals and access: `vector`, `hash-map`, `hash-set`, `get`,
//! `new`, `template-literal`.

use super::Form;
use crate::call::{spread_target, SpreadTarget};
use crate::context::LoweringContext;
use crate::error::Result;
use crate::pattern::keyed_property;
use crate::symbols::keyword_name;
use rhizome_sprig_ir::{Literal, LogicalOp, Node};
use rhizome_sprig_sexpr::{SExp, SExpKind};

impl LoweringContext {
    pub(crate) fn lower_vector(&mut self, form: &Form<'_>) -> Result<Node> {
        Ok(Node::array(self.lower_arguments(form.args)?))
    }

    /// `(hash-map key value ... ...spread)`.
    ///
    /// Keyword and string keys are plain property names; any other key is
    /// evaluated.
    pub(crate) fn lower_hash_map(&mut self, form: &Form<'_>) -> Result<Node> {
        let mut properties = Vec::with_capacity(form.args.len() / 2);
        let mut rest = form.args;

        while let Some((first, tail)) = rest.split_first() {
            if let Some(target) = spread_target(first) {
                let argument = match target {
                    SpreadTarget::Symbol(name) => self.lower_symbol(name, first.position.as_ref())?,
                    SpreadTarget::Form(expr) => self.lower_expr(expr)?,
                };
                properties.push(Node::spread(argument).at(first.position.clone()));
                rest = tail;
                continue;
            }

            let Some((value, tail)) = tail.split_first() else {
                return Err(form.invalid_at(
                    first,
                    format!("Invalid map literal: key {} has no value", first),
                ));
            };
            let lowered = self.lower_expr(value)?;
            let property = match property_name(first) {
                Some(name) => keyed_property(name, lowered),
                None => Node::computed_property(self.lower_expr(first)?, lowered),
            };
            properties.push(property.or_at(first.position.as_ref()));
            rest = tail;
        }

        Ok(Node::object(properties))
    }

    /// `(hash-set a b)` to `new Set([a, b])`.
    pub(crate) fn lower_hash_set(&mut self, form: &Form<'_>) -> Result<Node> {
        let elements = self.lower_arguments(form.args)?;
        Ok(Node::new_expr(Node::ident("Set"), vec![Node::array(elements)]))
    }

    /// `(get obj key)` or `(get obj key fallback)`.
    pub(crate) fn lower_get(&mut self, form: &Form<'_>) -> Result<Node> {
        form.between(2, 3)?;
        let object = self.lower_expr(&form.args[0])?;
        let key = self.lower_expr(&form.args[1])?;
        let access = Node::index(object, key);
        match form.args.get(2) {
            Some(fallback) => {
                let fallback = self.lower_expr(fallback)?;
                Ok(Node::logical(LogicalOp::Nullish, access.or_at(form.pos()), fallback))
            }
            None => Ok(access),
        }
    }

    /// `(new Ctor args...)`; also `js-new`.
    pub(crate) fn lower_new(&mut self, form: &Form<'_>) -> Result<Node> {
        form.at_least(1)?;
        let callee = self.lower_expr(&form.args[0])?;
        let arguments = self.lower_arguments(&form.args[1..])?;
        Ok(Node::new_expr(callee, arguments))
    }

    /// `(template-literal "a" x "b")` to `` `a${x}b` ``. Adjacent string
    /// parts merge into one quasi.
    pub(crate) fn lower_template(&mut self, form: &Form<'_>) -> Result<Node> {
        let mut quasis = Vec::with_capacity(form.args.len() / 2 + 1);
        let mut expressions = Vec::with_capacity(form.args.len() / 2);
        let mut current = String::new();

        for part in form.args {
            match part.as_string() {
                Some(text) => current.push_str(text),
                None => {
                    quasis.push(std::mem::take(&mut current));
                    expressions.push(self.lower_expr(part)?);
                }
            }
        }
        quasis.push(current);
        Ok(Node::template(quasis, expressions))
    }
}

/// Map keys that name a property directly.
fn property_name(key: &SExp) -> Option<&str> {
    match &key.kind {
        SExpKind::Literal(Literal::String(name)) => Some(name),
        SExpKind::Symbol(symbol) => keyword_name(symbol),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::context::LoweringContext;
    use rhizome_sprig_ir::{LogicalOp, Node, NodeKind};
    use rhizome_sprig_sexpr::from_json;
    use serde_json::json;

    fn lower(value: serde_json::Value) -> crate::error::Result<Node> {
        let mut ctx = LoweringContext::new(".");
        ctx.lower(&from_json(&value).unwrap()).map(|n| n.unwrap())
    }

    #[test]
    fn test_vector_with_spread() {
        assert_eq!(
            lower(json!(["vector", 1, "...rest"])).unwrap(),
            Node::array(vec![Node::number(1), Node::spread(Node::ident("rest"))])
        );
    }

    #[test]
    fn test_hash_map_keys() {
        let node = lower(json!(["hash-map", "name:", "name", {"str": "content-type"}, 1, "k", 2, "...defaults"])).unwrap();
        let NodeKind::Object(entries) = node.kind else {
            panic!("expected object");
        };
        assert_eq!(entries.len(), 4);
        match &entries[0].kind {
            NodeKind::Property { shorthand, computed, .. } => assert!(*shorthand && !*computed),
            _ => panic!("expected property"),
        }
        match &entries[1].kind {
            NodeKind::Property { key, .. } => assert_eq!(**key, Node::string("content-type")),
            _ => panic!("expected property"),
        }
        assert_eq!(entries[2], Node::computed_property(Node::ident("k"), Node::number(2)));
        assert_eq!(entries[3], Node::spread(Node::ident("defaults")));

        assert!(lower(json!(["hash-map", "a:"])).is_err());
    }

    #[test]
    fn test_hash_set() {
        assert_eq!(
            lower(json!(["hash-set", 1, 2])).unwrap(),
            Node::new_expr(Node::ident("Set"), vec![Node::array(vec![Node::number(1), Node::number(2)])])
        );
    }

    #[test]
    fn test_get_with_default() {
        assert_eq!(
            lower(json!(["get", "cfg", {"str": "port"}, 80])).unwrap(),
            Node::logical(
                LogicalOp::Nullish,
                Node::index(Node::ident("cfg"), Node::string("port")),
                Node::number(80)
            )
        );
    }

    #[test]
    fn test_template_literal() {
        assert_eq!(
            lower(json!(["template-literal", {"str": "Hello, "}, "name", {"str": "!"}])).unwrap(),
            Node::template(vec!["Hello, ".into(), "!".into()], vec![Node::ident("name")])
        );
        assert_eq!(
            lower(json!(["template-literal", "x"])).unwrap(),
            Node::template(vec![String::new(), String::new()], vec![Node::ident("x")])
        );
    }

    #[test]
    fn test_new() {
        assert_eq!(
            lower(json!(["new", "Date", 0])).unwrap(),
            Node::new_expr(Node::ident("Date"), vec![Node::number(0)])
        );
    }
}
