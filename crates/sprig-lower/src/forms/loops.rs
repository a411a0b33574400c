//! Loops. `loop`/`recur` become a labelled `while (true)` inside a wrapper;
//! a `recur` in tail position rebinds the loop variables and jumps back:
//!
//! ```text
//! (loop (i 0) (if (< i 3) (recur (+ i 1)) i))
//!
//! (() => {
//!   let i = 0;
//!   loop_0: while (true) {
//!     if (i < 3) { i = i + 1; continue loop_0; } else { return i; }
//!   }
//! })()
//! ```
//!
//! Iteration runs in constant stack space. A `recur` anywhere else, or
//! inside a `try`, is rejected.

use super::{binding_items, Form};
use crate::context::{LoopFrame, LoweringContext};
use crate::error::{codes, Result, SprigError};
use crate::lower::iife;
use rhizome_sprig_ir::{BinaryOp, Literal, Node, NodeKind, Position, UnaryOp, VariableKind};
use rhizome_sprig_sexpr::SExp;
use tracing::trace;

impl LoweringContext {
    pub(crate) fn lower_loop(&mut self, form: &Form<'_>) -> Result<Node> {
        form.at_least(1)?;
        let pairs = self.binding_pairs(form, &form.args[0])?;
        let pos = form.pos();
        let name = self.gensym("loop");
        trace!(loop = %name, arity = pairs.len(), "lowering loop");

        let ((declarations, params, body, frame), suspension) = self.in_expression(|ctx| {
            ctx.in_scope(Vec::new(), |ctx| {
                let mut declarations = Vec::with_capacity(pairs.len());
                let mut params = Vec::with_capacity(pairs.len());
                for pair in &pairs {
                    let target = ctx.lower_target(pair[0])?;
                    let init = ctx.lower_expr(pair[1])?;
                    ctx.bind(&target);
                    let at = pair[0].position.as_ref().or(pos);
                    declarations.push(Node::declare(VariableKind::Let, target.clone(), Some(init)).or_at(at));
                    params.push(target);
                }
                let frame = LoopFrame::new(name.clone(), params.len());
                let (body, frame) = ctx.in_loop(frame, |ctx| ctx.lower_returning_body(&form.args[1..]))?;
                Ok((declarations, params, body, frame))
            })
        })?;

        let mut tail = TailRecur {
            label: &name,
            params: &params,
            rewritten: 0,
        };
        let mut body: Vec<Node> = body.into_iter().map(|stmt| tail.rewrite(stmt)).collect();
        if tail.rewritten != frame.recurs {
            return Err(SprigError::validation(
                "'recur' must be in tail position of its loop and not inside a try",
            )
            .with_code(codes::MISPLACED_FORM)
            .at(frame.first_recur.or_else(|| form.position())));
        }
        if !body.last().map_or(false, Node::is_terminator) {
            body.push(Node::return_stmt(None).or_at(pos));
        }

        let forever = Node::while_loop(Node::bool(true).or_at(pos), Node::block(body).or_at(pos)).or_at(pos);
        let mut wrapper = declarations;
        wrapper.push(Node::labeled(name, forever).or_at(pos));
        Ok(iife(wrapper, suspension, pos))
    }

    /// `(recur args...)`: jump back to the innermost loop with new values.
    /// Lowers to a call of the loop label, which the enclosing `loop`
    /// rewrites once it sees the call in tail position.
    pub(crate) fn lower_recur(&mut self, form: &Form<'_>) -> Result<Node> {
        let Some(frame) = self.loops.last() else {
            return Err(form
                .invalid("'recur' used outside of a loop")
                .with_code(codes::MISPLACED_FORM));
        };
        if form.args.len() != frame.arity {
            return Err(form
                .invalid(format!(
                    "'recur' expects {} argument{} to match its loop, got {}",
                    frame.arity,
                    if frame.arity == 1 { "" } else { "s" },
                    form.args.len()
                ))
                .with_code(codes::FORM_ARITY));
        }
        let label = frame.name.clone();
        let arguments = self.lower_exprs(form.args)?;
        if let Some(frame) = self.loops.last_mut() {
            frame.recurs += 1;
            if frame.first_recur.is_none() {
                frame.first_recur = form.position();
            }
        }
        Ok(Node::call(Node::ident(label).at(form.position()), arguments))
    }

    pub(crate) fn lower_while(&mut self, form: &Form<'_>) -> Result<Node> {
        form.at_least(1)?;
        let test = self.lower_expr(&form.args[0])?;
        let body = self.in_scope(Vec::new(), |ctx| ctx.lower_body(&form.args[1..]))?;
        Ok(Node::while_loop(test, Node::block(body).at(form.position())))
    }

    /// `(for (i end) ...)`, `(for (i start end) ...)` or
    /// `(for (i start end step) ...)`. A negative literal step counts down;
    /// any other non-literal step is evaluated once and decides the
    /// direction at run time.
    pub(crate) fn lower_for(&mut self, form: &Form<'_>) -> Result<Node> {
        form.at_least(1)?;
        let pos = form.pos();
        let spec = binding_items(&form.args[0]).unwrap_or_default();
        let (target, start, end, step) = match spec {
            [target, end] => (target, None, end, None),
            [target, start, end] => (target, Some(start), end, None),
            [target, start, end, step] => (target, Some(start), end, Some(step)),
            _ => {
                return Err(form.invalid_at(
                    &form.args[0],
                    format!("Invalid for range {}: expected (name end), (name start end) or (name start end step)", form.args[0]),
                ))
            }
        };
        let counter = self.lower_target(target)?;
        let Some(name) = counter.as_identifier().map(str::to_string) else {
            return Err(form.invalid_at(target, format!("Invalid loop variable in 'for': {}", target)));
        };
        let at = counter.position.clone().or_else(|| form.position());
        let counter_ref = || Node::ident(name.clone()).at(at.clone());
        let start = match start {
            Some(start) => self.lower_expr(start)?,
            None => Node::number(0).or_at(pos),
        };
        let end = self.lower_expr(end)?;
        let step = match step {
            Some(step) => self.lower_expr(step)?,
            None => Node::number(1).or_at(pos),
        };

        let mut declarators = vec![declarator(counter.clone(), start)];
        let (test, step) = match counts_down(&step) {
            Some(down) => {
                let op = if down { BinaryOp::Gt } else { BinaryOp::Lt };
                (Node::binary(op, counter_ref(), end).or_at(pos), step)
            }
            None => {
                let step_ref = Node::ident(self.gensym("step")).or_at(pos);
                declarators.push(declarator(step_ref.clone(), step));
                let ascending = Node::binary(BinaryOp::Gt, step_ref.clone(), Node::number(0).or_at(pos)).or_at(pos);
                let test = Node::conditional(
                    ascending,
                    Node::binary(BinaryOp::Lt, counter_ref(), end.clone()).or_at(pos),
                    Node::binary(BinaryOp::Gt, counter_ref(), end).or_at(pos),
                )
                .or_at(pos);
                (test, step_ref)
            }
        };

        let init = Node::new(NodeKind::VariableDeclaration {
            kind: VariableKind::Let,
            declarations: declarators,
        })
        .or_at(pos);
        let update = Node::assign(
            counter_ref(),
            Node::binary(BinaryOp::Add, counter_ref(), step).or_at(pos),
        )
        .or_at(pos);
        let body = self.in_scope(Vec::new(), |ctx| {
            ctx.bind(&counter);
            ctx.lower_body(&form.args[1..])
        })?;
        let body = Node::block(body).or_at(pos);
        Ok(Node::for_loop(Some(init), Some(test), Some(update), body))
    }

    /// `(for-of (x xs) body...)`; `for-await-of` takes the same shape.
    pub(crate) fn lower_for_of(&mut self, form: &Form<'_>, is_await: bool) -> Result<Node> {
        let (left, right, body) = self.iteration(form)?;
        if is_await {
            self.suspension.awaits = true;
        }
        Ok(Node::for_of(left, right, body, is_await))
    }

    pub(crate) fn lower_for_in(&mut self, form: &Form<'_>) -> Result<Node> {
        let (left, right, body) = self.iteration(form)?;
        Ok(Node::for_in(left, right, body))
    }

    /// `(break)`, `(break label)`; same for `continue`.
    pub(crate) fn lower_jump(&mut self, form: &Form<'_>, is_break: bool) -> Result<Node> {
        form.between(0, 1)?;
        let label = match form.args.first() {
            Some(_) => Some(form.symbol(0, "a label")?.to_string()),
            None => None,
        };
        Ok(if is_break {
            Node::break_stmt(label)
        } else {
            Node::continue_stmt(label)
        })
    }

    fn iteration(&mut self, form: &Form<'_>) -> Result<(Node, Node, Node)> {
        form.at_least(1)?;
        let (target, iterable) = match binding_items(&form.args[0]).unwrap_or_default() {
            [target, iterable] => (target, iterable),
            _ => {
                return Err(form.invalid_at(
                    &form.args[0],
                    format!("Invalid '{}' binding {}: expected (name collection)", form.name, form.args[0]),
                ))
            }
        };
        let target = self.lower_target(target)?;
        let right = self.lower_expr(iterable)?;
        let body = self.in_scope(Vec::new(), |ctx| {
            ctx.bind(&target);
            ctx.lower_body(&form.args[1..])
        })?;
        let left = Node::declare(VariableKind::Const, target, None).or_at(form.pos());
        Ok((left, right, Node::block(body).or_at(form.pos())))
    }

    fn binding_pairs<'s>(&self, form: &Form<'_>, bindings: &'s SExp) -> Result<Vec<[&'s SExp; 2]>> {
        let items = binding_items(bindings).unwrap_or_default();
        if bindings.as_list().is_none() || items.len() % 2 != 0 {
            return Err(form.invalid_at(
                bindings,
                format!("Invalid '{}' bindings {}: expected name/value pairs", form.name, bindings),
            ));
        }
        Ok(items.chunks(2).map(|pair| [&pair[0], &pair[1]]).collect())
    }
}

fn declarator(id: Node, init: Node) -> Node {
    let position = id.position.clone();
    Node::new(NodeKind::VariableDeclarator {
        id: Box::new(id),
        init: Some(Box::new(init)),
    })
    .at(position)
}

/// The direction of a literal step: `Some(true)` counts down.
fn counts_down(step: &Node) -> Option<bool> {
    match &step.kind {
        NodeKind::Literal(Literal::Number(n)) => Some(*n < 0.0),
        NodeKind::Unary {
            operator: UnaryOp::Neg,
            argument,
        } => match &argument.kind {
            NodeKind::Literal(Literal::Number(n)) => Some(*n > 0.0),
            _ => None,
        },
        _ => None,
    }
}

/// Rewrites `return loop_N(args)` in tail position into a rebinding of the
/// loop variables followed by `continue loop_N`. Does not look inside
/// nested loops, `try` or functions.
struct TailRecur<'a> {
    label: &'a str,
    params: &'a [Node],
    rewritten: usize,
}

impl TailRecur<'_> {
    fn rewrite(&mut self, node: Node) -> Node {
        let position = node.position.clone();
        match node.kind {
            NodeKind::Return(Some(value)) => self.tail(*value, position),
            NodeKind::If {
                test,
                consequent,
                alternate,
            } => Node::new(NodeKind::If {
                test,
                consequent: Box::new(self.rewrite(*consequent)),
                alternate: alternate.map(|alt| Box::new(self.rewrite(*alt))),
            })
            .at(position),
            NodeKind::Block(stmts) => {
                Node::block(stmts.into_iter().map(|stmt| self.rewrite(stmt)).collect()).at(position)
            }
            NodeKind::Labeled { label, body } => Node::labeled(label, self.rewrite(*body)).at(position),
            NodeKind::Switch { discriminant, cases } => Node::new(NodeKind::Switch {
                discriminant,
                cases: cases.into_iter().map(|case| self.rewrite(case)).collect(),
            })
            .at(position),
            NodeKind::SwitchCase { test, consequent } => Node::new(NodeKind::SwitchCase {
                test,
                consequent: consequent.into_iter().map(|stmt| self.rewrite(stmt)).collect(),
            })
            .at(position),
            kind => Node::new(kind).at(position),
        }
    }

    /// `return value;` where `value` may be a jump back or a conditional
    /// with one in a branch.
    fn tail(&mut self, value: Node, position: Option<Position>) -> Node {
        let value_position = value.position.clone();
        match value.kind {
            NodeKind::Call {
                callee, arguments, ..
            } if callee.as_identifier() == Some(self.label) => {
                self.rewritten += 1;
                let at = value_position.or(position);
                self.jump(arguments, at)
            }
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } if self.jumps(&consequent) || self.jumps(&alternate) => {
                let branch = |this: &mut Self, branch: Node| {
                    let at = branch.position.clone().or_else(|| position.clone());
                    this.tail(branch, at)
                };
                let consequent = branch(self, *consequent);
                let alternate = branch(self, *alternate);
                Node::if_stmt(*test, consequent, Some(alternate)).at(value_position.or(position))
            }
            kind => Node::return_stmt(Some(Node::new(kind).at(value_position))).at(position),
        }
    }

    fn jumps(&self, node: &Node) -> bool {
        match &node.kind {
            NodeKind::Call { callee, .. } => callee.as_identifier() == Some(self.label),
            NodeKind::Conditional {
                consequent,
                alternate,
                ..
            } => self.jumps(consequent) || self.jumps(alternate),
            _ => false,
        }
    }

    /// `i = a;` or `[i, j] = [a, b];` then `continue label;`. All new
    /// values are computed before any variable changes.
    fn jump(&self, arguments: Vec<Node>, position: Option<Position>) -> Node {
        let pos = position.as_ref();
        let mut stmts = Vec::with_capacity(2);
        let mut targets: Vec<Node> = self.params.iter().map(assignable).collect();
        let rebind = match (targets.len(), arguments.len()) {
            (0, _) => None,
            (1, 1) => targets.pop().zip(arguments.into_iter().next()),
            _ => Some((
                Node::array_pattern(targets.into_iter().map(Some).collect()).or_at(pos),
                Node::array(arguments).or_at(pos),
            )),
        };
        if let Some((target, value)) = rebind {
            stmts.push(Node::expr_stmt(Node::assign(target, value).or_at(pos)).or_at(pos));
        }
        stmts.push(Node::continue_stmt(Some(self.label.to_string())).or_at(pos));
        Node::block(stmts).or_at(pos)
    }
}

/// A declared loop variable as an assignment target: annotations belong to
/// the declaration only.
fn assignable(param: &Node) -> Node {
    match &param.kind {
        NodeKind::Identifier { name, .. } => Node::ident(name.clone()).at(param.position.clone()),
        _ => param.clone(),
    }
}

#[cfg(test)]
mod tests {
    use crate::context::LoweringContext;
    use crate::error::codes;
    use rhizome_sprig_ir::{BinaryOp, Function, Node, NodeKind, Position, VariableKind};
    use rhizome_sprig_sexpr::from_json;
    use serde_json::json;

    fn lower_in(ctx: &mut LoweringContext, value: serde_json::Value) -> crate::error::Result<Node> {
        let node = from_json(&json!({"line": 1, "column": 1, "node": value})).unwrap();
        ctx.lower(&node).map(|n| n.unwrap())
    }

    fn lower(value: serde_json::Value) -> crate::error::Result<Node> {
        lower_in(&mut LoweringContext::new("."), value)
    }

    fn wrapper(node: Node) -> Function {
        let NodeKind::Call { callee, .. } = node.kind else {
            panic!("expected call, got {:?}", node.kind);
        };
        match callee.kind {
            NodeKind::Function(f) => *f,
            other => panic!("expected wrapper function, got {:?}", other),
        }
    }

    /// The statements of the labelled `while (true)` at the end of a loop
    /// wrapper.
    fn loop_body(f: &Function) -> &[Node] {
        let Some(NodeKind::Labeled { label, body }) = f.body.last().map(|n| &n.kind) else {
            panic!("expected labelled loop, got {:?}", f.body);
        };
        assert_eq!(label, "loop_0");
        let NodeKind::While { test, body } = &body.kind else {
            panic!("expected while");
        };
        assert_eq!(test.kind, Node::bool(true).kind);
        match &body.kind {
            NodeKind::Block(stmts) => stmts,
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_loop_becomes_labelled_while() {
        let f = wrapper(lower(json!(["loop", ["i", 0], ["if", ["<", "i", 3], ["recur", ["+", "i", 1]], "i"]])).unwrap());
        assert!(f.is_arrow && !f.is_async);
        match &f.body[0].kind {
            NodeKind::VariableDeclaration { kind, declarations } => {
                assert_eq!(*kind, VariableKind::Let);
                assert_eq!(declarations.len(), 1);
            }
            other => panic!("expected loop variable, got {:?}", other),
        }

        let stmts = loop_body(&f);
        let NodeKind::If { consequent, alternate: Some(alternate), .. } = &stmts[0].kind else {
            panic!("expected if, got {:?}", stmts[0]);
        };
        let NodeKind::Block(jump) = &consequent.kind else {
            panic!("expected rebinding block, got {:?}", consequent);
        };
        assert_eq!(
            jump[0].kind,
            Node::expr_stmt(Node::assign(
                Node::ident("i"),
                Node::binary(BinaryOp::Add, Node::ident("i"), Node::number(1))
            ))
            .kind
        );
        assert!(matches!(&jump[1].kind, NodeKind::Continue(Some(label)) if label == "loop_0"));
        assert!(matches!(alternate.kind, NodeKind::Return(Some(_))));
        assert!(!format!("{:?}", f).contains("Call { callee: Node { kind: Identifier { name: \"loop_0\""));
    }

    #[test]
    fn test_recur_rebinds_all_variables_at_once() {
        let f = wrapper(
            lower(json!(["loop", ["a", 0, "b", 1], ["if", [">", "a", 10], "a", ["recur", "b", ["+", "a", "b"]]]]))
                .unwrap(),
        );
        assert_eq!(f.body.len(), 3);
        let stmts = loop_body(&f);
        let NodeKind::If { alternate: Some(alternate), .. } = &stmts[0].kind else {
            panic!("expected if");
        };
        let NodeKind::Block(jump) = &alternate.kind else {
            panic!("expected rebinding block");
        };
        match &jump[0].kind {
            NodeKind::ExpressionStatement(assign) => match &assign.kind {
                NodeKind::Assignment { target, value } => {
                    assert_eq!(
                        target.kind,
                        Node::array_pattern(vec![Some(Node::ident("a")), Some(Node::ident("b"))]).kind
                    );
                    assert!(matches!(&value.kind, NodeKind::Array(items) if items.len() == 2));
                }
                other => panic!("expected assignment, got {:?}", other),
            },
            other => panic!("expected statement, got {:?}", other),
        }
    }

    #[test]
    fn test_long_loops_do_not_recurse() {
        // Each iteration is a jump, so the output contains no call that
        // could grow the stack however many times the loop runs.
        let f = wrapper(
            lower(json!(["loop", ["i", 0, "acc", 0], ["if", [">=", "i", 1000000], "acc", ["recur", ["+", "i", 1], ["+", "acc", "i"]]]]))
                .unwrap(),
        );
        let rendered = format!("{:?}", f);
        assert!(!rendered.contains("Call {"));
        assert!(rendered.contains("Continue(Some(\"loop_0\"))"));
    }

    #[test]
    fn test_recur_checks() {
        let err = lower(json!(["recur", 1])).unwrap_err();
        assert_eq!(err.code(), codes::MISPLACED_FORM);

        let err = lower(json!(["loop", ["i", 0], {"line": 2, "column": 3, "node": ["recur"]}])).unwrap_err();
        assert_eq!(err.code(), codes::FORM_ARITY);
        assert!(err.message().contains("expects 1 argument"));
    }

    #[test]
    fn test_recur_outside_tail_position() {
        let err = lower(json!(["loop", ["i", 0], ["+", 1, {"line": 2, "column": 8, "node": ["recur", 1]}]])).unwrap_err();
        assert_eq!(err.code(), codes::MISPLACED_FORM);
        assert_eq!(err.location(), Some(&Position::new(2, 8)));
        assert!(err.message().contains("tail position"));

        let err = lower(json!(["loop", ["i", 0], ["try", ["recur", 1], ["catch", "e", 0]]])).unwrap_err();
        assert_eq!(err.code(), codes::MISPLACED_FORM);
    }

    #[test]
    fn test_return_inside_loop_escapes_function() {
        let mut ctx = LoweringContext::new(".");
        let node = lower_in(
            &mut ctx,
            json!(["fn", "find", ["xs"], ["loop", ["i", 0], ["if", ["get", "xs", "i"], ["return", "i"], ["recur", ["+", "i", 1]]]]]),
        )
        .unwrap();
        match node.kind {
            NodeKind::FunctionDeclaration(f) => assert!(matches!(f.body[0].kind, NodeKind::Try { .. })),
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_loop_in_async_function_is_awaited() {
        let mut ctx = LoweringContext::new(".");
        let node = lower_in(
            &mut ctx,
            json!(["async", "fn", "drain", ["q"], ["loop", ["n", 0], ["if", ["await", [".next", "q"]], ["recur", ["+", "n", 1]], "n"]]]),
        )
        .unwrap();
        let NodeKind::FunctionDeclaration(f) = node.kind else {
            panic!("expected function");
        };
        let NodeKind::Return(Some(value)) = &f.body[0].kind else {
            panic!("expected return, got {:?}", f.body[0]);
        };
        let NodeKind::Await(call) = &value.kind else {
            panic!("expected awaited loop, got {:?}", value);
        };
        let NodeKind::Call { callee, .. } = &call.kind else {
            panic!("expected call");
        };
        assert!(matches!(&callee.kind, NodeKind::Function(w) if w.is_async && w.is_arrow));
    }

    #[test]
    fn test_numeric_for() {
        let at = Some(Position::new(1, 1));
        let node = lower(json!(["for", ["i", 1, 10, 2], ["print", "i"]])).unwrap();
        match node.kind {
            NodeKind::For { test, update, .. } => {
                let i = || Node::ident("i").at(at.clone());
                assert_eq!(
                    test.map(|t| *t),
                    Some(Node::binary(BinaryOp::Lt, i(), Node::number(10)).at(at.clone()))
                );
                assert_eq!(
                    update.map(|u| *u),
                    Some(
                        Node::assign(
                            i(),
                            Node::binary(BinaryOp::Add, i(), Node::number(2)).at(at.clone())
                        )
                        .at(at.clone())
                    )
                );
            }
            other => panic!("expected for, got {:?}", other),
        }
        assert!(lower(json!(["for", ["i"], "i"])).is_err());
    }

    fn for_test(node: Node) -> Node {
        match node.kind {
            NodeKind::For { test: Some(test), .. } => *test,
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_step_counts_down() {
        let test = for_test(lower(json!(["for", ["i", 10, 0, -1], ["print", "i"]])).unwrap());
        assert!(matches!(test.kind, NodeKind::Binary { operator: BinaryOp::Gt, .. }));

        let test = for_test(lower(json!(["for", ["i", 10, 0, ["-", 2]], ["print", "i"]])).unwrap());
        assert!(matches!(test.kind, NodeKind::Binary { operator: BinaryOp::Gt, .. }));
    }

    #[test]
    fn test_unknown_step_picks_direction_at_run_time() {
        let node = lower(json!(["for", ["i", 0, "n", "delta"], ["print", "i"]])).unwrap();
        let NodeKind::For { init: Some(init), test: Some(test), update: Some(update), .. } = node.kind else {
            panic!("expected for");
        };
        match init.kind {
            NodeKind::VariableDeclaration { declarations, .. } => assert_eq!(declarations.len(), 2),
            other => panic!("expected declaration, got {:?}", other),
        }
        assert!(matches!(test.kind, NodeKind::Conditional { .. }));
        assert!(format!("{:?}", update).contains("step_0"));
    }

    #[test]
    fn test_for_of_and_in() {
        let node = lower(json!(["for-await-of", ["chunk", "stream"], ["push", "chunk"]])).unwrap();
        assert!(matches!(node.kind, NodeKind::ForOf { is_await: true, .. }));
        let node = lower(json!(["for-in", ["key", "obj"], ["log", "key"]])).unwrap();
        assert!(matches!(node.kind, NodeKind::ForIn { .. }));
    }

    #[test]
    fn test_break_and_continue() {
        assert_eq!(lower(json!(["break"])).unwrap(), Node::break_stmt(None).at(Some(Position::new(1, 1))));
        assert!(matches!(
            lower(json!(["continue", "outer"])).unwrap().kind,
            NodeKind::Continue(Some(ref label)) if label == "outer"
        ));
        assert!(lower(json!(["break", 1])).is_err());
    }
}
