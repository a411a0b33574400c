//! Control flow: `if`, `cond`, `do`, `throw`, `try`, `switch`, `label`.
//!
//! Branches are lowered in statement-capable position. When every branch
//! comes out as an expression the form stays an expression (`a ? b : c`);
//! otherwise it becomes a statement, and the caller wraps it if it sits in
//! value position.

use super::Form;
use crate::context::LoweringContext;
use crate::error::{codes, Result};
use crate::lower::statement;
use rhizome_sprig_ir::{Node, NodeKind};
use rhizome_sprig_sexpr::SExp;

impl LoweringContext {
    pub(crate) fn lower_if(&mut self, form: &Form<'_>) -> Result<Node> {
        form.between(2, 3)?;
        let test = self.lower_expr(&form.args[0])?;
        let consequent = self.lower_branch(&form.args[1])?;
        let alternate = form.args.get(2).map(|alt| self.lower_branch(alt)).transpose()?;
        Ok(choose(test, consequent, alternate))
    }

    /// `(cond (test body...) ... (else body...))`.
    pub(crate) fn lower_cond(&mut self, form: &Form<'_>) -> Result<Node> {
        let mut clauses = Vec::with_capacity(form.args.len());
        for (index, clause) in form.args.iter().enumerate() {
            let items = match clause.as_list() {
                Some(items) if items.len() >= 2 => items,
                _ => {
                    return Err(form.invalid_at(
                        clause,
                        format!("Invalid cond clause {}: expected (test body...)", clause),
                    ))
                }
            };
            let is_default = items[0].is_symbol("else") || items[0].is_symbol("true");
            if is_default && index + 1 != form.args.len() {
                return Err(form
                    .invalid_at(clause, "Invalid cond: the else clause must come last")
                    .with_code(codes::MISPLACED_FORM));
            }
            let test = if is_default {
                None
            } else {
                Some(self.lower_expr(&items[0])?)
            };
            let body = self.lower_sequence(clause, &items[1..])?;
            clauses.push((test, body));
        }

        // Fold from the last clause outwards.
        let mut result: Option<Node> = None;
        while let Some((test, body)) = clauses.pop() {
            result = Some(match test {
                Some(test) => choose(test, body, result),
                None => body,
            });
        }
        Ok(result.unwrap_or_else(Node::undefined))
    }

    /// `(do a b c)`: a block whose last form is the value.
    pub(crate) fn lower_do(&mut self, form: &Form<'_>) -> Result<Node> {
        self.lower_sequence(form.node, form.args)
    }

    pub(crate) fn lower_throw(&mut self, form: &Form<'_>) -> Result<Node> {
        form.exactly(1)?;
        Ok(Node::throw_stmt(self.lower_expr(&form.args[0])?))
    }

    /// `(try body... (catch e handler...) (finally cleanup...))`.
    pub(crate) fn lower_try(&mut self, form: &Form<'_>) -> Result<Node> {
        let split = form
            .args
            .iter()
            .position(|arg| arg.is_form("catch") || arg.is_form("finally"))
            .unwrap_or(form.args.len());
        let block = Node::block(self.lower_body(&form.args[..split])?);

        let mut handler = None;
        let mut finalizer = None;
        for clause in &form.args[split..] {
            let items = clause.as_list().unwrap_or_default();
            match clause.head_symbol() {
                Some("catch") if handler.is_none() && finalizer.is_none() => {
                    let (param, body) = match items.get(1).and_then(SExp::as_symbol) {
                        Some(_) => (Some(self.lower_target(&items[1])?), &items[2..]),
                        None => (None, &items[1..]),
                    };
                    let body = self.in_scope(Vec::new(), |ctx| {
                        if let Some(param) = &param {
                            ctx.bind(param);
                        }
                        ctx.lower_body(body)
                    })?;
                    let body = Node::block(body);
                    handler = Some(Node::catch_clause(param, body).at(clause.position.clone()));
                }
                Some("finally") if finalizer.is_none() => {
                    finalizer = Some(Node::block(self.lower_body(&items[1..])?).at(clause.position.clone()));
                }
                Some(name @ ("catch" | "finally")) => {
                    return Err(form
                        .invalid_at(clause, format!("Invalid try: unexpected '{}' clause", name))
                        .with_code(codes::MISPLACED_FORM))
                }
                _ => {
                    return Err(form.invalid_at(
                        clause,
                        format!("Invalid try: {} after a catch or finally clause", clause),
                    ))
                }
            }
        }

        if handler.is_none() && finalizer.is_none() {
            return Err(form
                .invalid("'try' requires a catch or finally clause")
                .with_code(codes::INVALID_FORM));
        }
        Ok(Node::try_stmt(block, handler, finalizer))
    }

    /// `(switch value (case 1 body...) (case 2 body...) (default body...))`.
    ///
    /// Every clause ends in a `break` unless it already leaves the switch.
    pub(crate) fn lower_switch(&mut self, form: &Form<'_>) -> Result<Node> {
        form.at_least(1)?;
        let discriminant = self.lower_expr(&form.args[0])?;

        let mut cases = Vec::with_capacity(form.args.len() - 1);
        let mut seen_default = false;
        for clause in &form.args[1..] {
            let items = clause.as_list().unwrap_or_default();
            let (test, body) = match clause.head_symbol() {
                Some("case") if items.len() >= 2 => (Some(self.lower_expr(&items[1])?), &items[2..]),
                Some("default") if !seen_default => {
                    seen_default = true;
                    (None, &items[1..])
                }
                Some("default") => {
                    return Err(form
                        .invalid_at(clause, "Duplicate default clause in 'switch'")
                        .with_code(codes::DUPLICATE_DEFINITION))
                }
                _ => {
                    return Err(form.invalid_at(
                        clause,
                        format!("Invalid switch clause {}: expected (case value body...) or (default body...)", clause),
                    ))
                }
            };

            let mut consequent = self.lower_body(body)?;
            if !consequent.last().map_or(false, Node::is_terminator) {
                consequent.push(Node::break_stmt(None));
            }
            cases.push(Node::switch_case(test, consequent).at(clause.position.clone()));
        }
        Ok(Node::switch_stmt(discriminant, cases))
    }

    /// `(label name body...)`.
    pub(crate) fn lower_label(&mut self, form: &Form<'_>) -> Result<Node> {
        form.at_least(2)?;
        let name = form.symbol(0, "a label name")?;
        let body = match &form.args[1..] {
            [single] => statement(self.lower(single)?.unwrap_or_else(|| Node::block(Vec::new()))),
            many => Node::block(self.lower_body(many)?),
        };
        Ok(Node::labeled(name, body))
    }

    /// One branch form. A dropped form leaves `null`.
    fn lower_branch(&mut self, node: &SExp) -> Result<Node> {
        Ok(self.lower(node)?.unwrap_or_else(|| Node::null().at(node.position.clone())))
    }

    fn lower_sequence(&mut self, owner: &SExp, forms: &[SExp]) -> Result<Node> {
        match forms {
            [] => Ok(Node::undefined().at(owner.position.clone())),
            [single] => self.lower_branch(single),
            many => {
                let body = self.in_scope(Vec::new(), |ctx| ctx.lower_body(many))?;
                Ok(Node::block(body).at(owner.position.clone()))
            }
        }
    }
}

/// `test ? a : b` when both branches are expressions, `if` otherwise.
fn choose(test: Node, consequent: Node, alternate: Option<Node>) -> Node {
    let needs_statement =
        consequent.is_statement() || alternate.as_ref().map_or(false, Node::is_statement);
    if needs_statement {
        return Node::if_stmt(test, branch_statement(consequent), alternate.map(branch_statement));
    }
    let alternate = alternate.unwrap_or_else(Node::undefined);
    Node::conditional(test, consequent, alternate)
}

fn branch_statement(node: Node) -> Node {
    match node.kind {
        NodeKind::Block(_) | NodeKind::If { .. } => node,
        _ => statement(node),
    }
}

#[cfg(test)]
mod tests {
    use crate::context::LoweringContext;
    use crate::error::codes;
    use rhizome_sprig_ir::{BinaryOp, Node, NodeKind};
    use rhizome_sprig_sexpr::from_json;
    use serde_json::json;

    fn lower(value: serde_json::Value) -> crate::error::Result<Node> {
        let mut ctx = LoweringContext::new(".");
        let node = from_json(&json!({"line": 1, "column": 1, "node": value})).unwrap();
        ctx.lower(&node).map(|n| n.unwrap())
    }

    fn strip(node: Node) -> Node {
        Node { position: None, ..node }
    }

    #[test]
    fn test_if_as_conditional() {
        assert_eq!(
            strip(lower(json!(["if", "ok", 1, 2])).unwrap()),
            Node::conditional(Node::ident("ok"), Node::number(1), Node::number(2))
        );
        assert_eq!(
            strip(lower(json!(["if", "ok", 1])).unwrap()),
            Node::conditional(Node::ident("ok"), Node::number(1), Node::undefined())
        );
    }

    #[test]
    fn test_if_with_statement_branch() {
        let node = lower(json!(["if", "bad", ["throw", "err"], "x"])).unwrap();
        match node.kind {
            NodeKind::If { consequent, alternate, .. } => {
                assert!(matches!(consequent.kind, NodeKind::Throw(_)));
                assert!(matches!(alternate.unwrap().kind, NodeKind::ExpressionStatement(_)));
            }
            _ => panic!("expected if statement"),
        }
    }

    #[test]
    fn test_cond_chains_and_else_last() {
        let node = strip(
            lower(json!(["cond", [["<", "n", 0], {"str": "neg"}], ["else", {"str": "pos"}]])).unwrap(),
        );
        assert_eq!(
            node,
            Node::conditional(
                Node::binary(BinaryOp::Lt, Node::ident("n"), Node::number(0)),
                Node::string("neg"),
                Node::string("pos"),
            )
        );

        let err = lower(json!(["cond", ["else", 1], ["x", 2]])).unwrap_err();
        assert_eq!(err.code(), codes::MISPLACED_FORM);
    }

    #[test]
    fn test_do_forms() {
        assert_eq!(strip(lower(json!(["do"])).unwrap()), Node::undefined());
        assert_eq!(strip(lower(json!(["do", 1])).unwrap()), Node::number(1));
        assert!(matches!(
            lower(json!(["do", ["f"], ["g"]])).unwrap().kind,
            NodeKind::Block(ref stmts) if stmts.len() == 2
        ));
    }

    #[test]
    fn test_try_catch_finally() {
        let node = lower(json!(["try", ["risky"], ["catch", "e", ["log", "e"]], ["finally", ["close"]]])).unwrap();
        match node.kind {
            NodeKind::Try { handler, finalizer, .. } => {
                match handler.unwrap().kind {
                    NodeKind::CatchClause { param, .. } => assert_eq!(param.as_deref(), Some(&Node::ident("e"))),
                    _ => panic!("expected catch clause"),
                }
                assert!(finalizer.is_some());
            }
            _ => panic!("expected try"),
        }

        let err = lower(json!(["try", ["risky"]])).unwrap_err();
        assert_eq!(err.code(), codes::INVALID_FORM);
        assert!(lower(json!(["try", ["a"], ["catch", "e"], ["catch", "f"]])).is_err());
    }

    #[test]
    fn test_switch_appends_break() {
        let node = lower(json!(["switch", "x", ["case", 1, ["f"]], ["case", 2, ["return", 3]], ["default", ["g"]]]));
        // `return` outside a function is rejected even inside a switch.
        assert!(node.is_err());

        let node = lower(json!(["switch", "x", ["case", 1, ["f"]], ["default", ["throw", "e"]]])).unwrap();
        match node.kind {
            NodeKind::Switch { cases, .. } => match (&cases[0].kind, &cases[1].kind) {
                (
                    NodeKind::SwitchCase { consequent: first, .. },
                    NodeKind::SwitchCase { consequent: second, .. },
                ) => {
                    assert_eq!(first.last(), Some(&Node::break_stmt(None)));
                    assert!(matches!(second.last().unwrap().kind, NodeKind::Throw(_)));
                }
                _ => panic!("expected cases"),
            },
            _ => panic!("expected switch"),
        }
    }

    #[test]
    fn test_label() {
        let node = lower(json!(["label", "outer", ["while", true, ["break", "outer"]]])).unwrap();
        match node.kind {
            NodeKind::Labeled { label, body } => {
                assert_eq!(label, "outer");
                assert!(matches!(body.kind, NodeKind::While { .. }));
            }
            _ => panic!("expected labeled statement"),
        }
    }
}
