//! `quote` and `quasiquote`. Quoted code becomes data: symbols turn into
//! strings and lists into arrays.

use super::Form;
use crate::context::LoweringContext;
use crate::error::{codes, Result, SprigError};
use rhizome_sprig_ir::Node;
use rhizome_sprig_sexpr::{SExp, SExpKind};

impl LoweringContext {
    pub(crate) fn lower_quote(&mut self, form: &Form<'_>) -> Result<Node> {
        form.exactly(1)?;
        Ok(quote(&form.args[0]))
    }

    pub(crate) fn lower_quasiquote(&mut self, form: &Form<'_>) -> Result<Node> {
        form.exactly(1)?;
        self.quasi(&form.args[0], 1)
    }

    /// Quote `node`, evaluating `unquote` forms at the matching depth.
    fn quasi(&mut self, node: &SExp, depth: usize) -> Result<Node> {
        let SExpKind::List(items) = &node.kind else {
            return Ok(quote(node));
        };

        match (node.head_symbol(), items.len()) {
            (Some("unquote"), 2) if depth == 1 => return self.lower_expr(&items[1]),
            (Some("unquote"), 2) => return self.quasi_form(node, items, depth - 1),
            (Some("quasiquote"), 2) => return self.quasi_form(node, items, depth + 1),
            (Some("unquote-splicing"), 2) if depth == 1 => {
                return Err(SprigError::validation("'unquote-splicing' used outside of a list")
                    .with_code(codes::MISPLACED_FORM)
                    .at(node.position.clone()))
            }
            _ => {}
        }

        let mut elements = Vec::with_capacity(items.len());
        for item in items {
            match item.as_list() {
                Some([head, spliced]) if depth == 1 && head.is_symbol("unquote-splicing") => {
                    let value = self.lower_expr(spliced)?;
                    elements.push(Node::spread(value).at(item.position.clone()));
                }
                _ => elements.push(self.quasi(item, depth)?),
            }
        }
        Ok(Node::array(elements).at(node.position.clone()))
    }

    /// A nested quoting form keeps its head and quotes its argument at the
    /// adjusted depth.
    fn quasi_form(&mut self, node: &SExp, items: &[SExp], depth: usize) -> Result<Node> {
        Ok(Node::array(vec![quote(&items[0]), self.quasi(&items[1], depth)?]).at(node.position.clone()))
    }
}

fn quote(node: &SExp) -> Node {
    let lowered = match &node.kind {
        SExpKind::Symbol(name) => Node::string(name.clone()),
        SExpKind::Literal(lit) => Node::literal(lit.clone()),
        SExpKind::List(items) => Node::array(items.iter().map(quote).collect()),
    };
    lowered.at(node.position.clone())
}

#[cfg(test)]
mod tests {
    use crate::context::LoweringContext;
    use crate::error::codes;
    use rhizome_sprig_ir::{BinaryOp, Node};
    use rhizome_sprig_sexpr::from_json;
    use serde_json::json;

    fn lower(value: serde_json::Value) -> crate::error::Result<Node> {
        let mut ctx = LoweringContext::new(".");
        ctx.lower(&from_json(&value).unwrap()).map(|n| n.unwrap())
    }

    #[test]
    fn test_quote_is_data() {
        assert_eq!(
            lower(json!(["quote", ["add", 1, "x"]])).unwrap(),
            Node::array(vec![Node::string("add"), Node::number(1), Node::string("x")])
        );
        assert_eq!(lower(json!(["quote", "sym"])).unwrap(), Node::string("sym"));
    }

    #[test]
    fn test_quasiquote_unquote_and_splice() {
        assert_eq!(
            lower(json!(["quasiquote", ["list", ["unquote", ["+", 1, 2]], ["unquote-splicing", "xs"]]])).unwrap(),
            Node::array(vec![
                Node::string("list"),
                Node::binary(BinaryOp::Add, Node::number(1), Node::number(2)),
                Node::spread(Node::ident("xs")),
            ])
        );
    }

    #[test]
    fn test_nested_quasiquote_keeps_inner_unquote() {
        let node = lower(json!(["quasiquote", ["a", ["quasiquote", ["b", ["unquote", "c"]]]]])).unwrap();
        assert_eq!(
            node,
            Node::array(vec![
                Node::string("a"),
                Node::array(vec![
                    Node::string("quasiquote"),
                    Node::array(vec![
                        Node::string("b"),
                        Node::array(vec![Node::string("unquote"), Node::string("c")]),
                    ]),
                ]),
            ])
        );
    }

    #[test]
    fn test_unquote_outside_quasiquote() {
        let err = lower(json!({"line": 1, "column": 1, "node": ["unquote", "x"]})).unwrap_err();
        assert_eq!(err.code(), codes::MISPLACED_FORM);
    }
}
