//! `let`, `const`, `var` and assignment.
//!
//! A symbol or a `vector`/`hash-map` pattern followed by one value is a
//! declaration. A plain list of name/value pairs, or a vector followed by
//! anything other than exactly one value, opens a block scope:
//!
//! ```text
//! (let x 1)                    const x = 1;
//! (let (vector a b) pair)      const [a, b] = pair;
//! (let (x 1 y 2) (+ x y))      { const x = 1; const y = 2; x + y; }
//! ```

use super::{binding_items, Form};
use crate::context::LoweringContext;
use crate::error::{Result, SprigError};
use crate::pattern::lower_pattern;
use rhizome_sprig_ir::{Node, NodeKind, VariableKind};
use rhizome_sprig_sexpr::{parse_pattern, SExp, SExpKind};

impl LoweringContext {
    pub(crate) fn lower_binding(&mut self, form: &Form<'_>, kind: VariableKind) -> Result<Node> {
        form.at_least(1)?;
        let target = &form.args[0];

        match &target.kind {
            SExpKind::Symbol(_) => match form.args {
                [_, value] => self.declaration(kind, target, Some(value)),
                [_] if kind == VariableKind::Let => self.declaration(kind, target, None),
                _ => form.exactly(2).map(|_| Node::undefined()),
            },
            SExpKind::List(_) if is_destructuring(target) && form.args.len() == 2 => {
                self.declaration(kind, target, Some(&form.args[1]))
            }
            SExpKind::List(_) => self.scoped_bindings(form, kind),
            SExpKind::Literal(_) => Err(form.invalid_at(
                target,
                format!("Invalid binding target in '{}': {}", form.name, target),
            )),
        }
    }

    fn declaration(&mut self, kind: VariableKind, target: &SExp, value: Option<&SExp>) -> Result<Node> {
        let id = self.lower_target(target)?;
        let init = value.map(|v| self.lower_expr(v)).transpose()?;
        self.bind(&id);
        Ok(Node::declare(kind, id, init))
    }

    fn scoped_bindings(&mut self, form: &Form<'_>, kind: VariableKind) -> Result<Node> {
        let target = &form.args[0];
        let pairs = binding_items(target).unwrap_or_default();
        if pairs.len() % 2 != 0 {
            return Err(form.invalid_at(
                target,
                format!("Invalid binding list in '{}': expected name/value pairs", form.name),
            ));
        }

        let body = self.in_scope(Vec::new(), |ctx| {
            let mut body = Vec::with_capacity(pairs.len() / 2 + form.args.len());
            for pair in pairs.chunks(2) {
                let decl = ctx.declaration(kind, &pair[0], Some(&pair[1]))?;
                body.push(decl.at(pair[0].position.clone()));
            }
            body.extend(ctx.lower_body(&form.args[1..])?);
            Ok(body)
        })?;
        Ok(Node::block(body).at(form.position()))
    }

    /// Lower a binding target through the pattern compiler.
    pub(crate) fn lower_target(&mut self, node: &SExp) -> Result<Node> {
        let pattern = parse_pattern(node)?;
        let mut transform = |expr: &SExp| self.lower_expr(expr);
        lower_pattern(&pattern, &mut transform)?.ok_or_else(|| {
            SprigError::validation(format!("Invalid binding target '{}'", node)).at(node.position.clone())
        })
    }

    pub(crate) fn lower_assign(&mut self, form: &Form<'_>) -> Result<Node> {
        form.exactly(2)?;
        let (target, value) = (&form.args[0], &form.args[1]);

        let target_node = if is_destructuring(target) {
            self.lower_target(target)?
        } else {
            self.lower_expr(target)?
        };
        if !matches!(
            target_node.kind,
            NodeKind::Identifier { .. }
                | NodeKind::Member { .. }
                | NodeKind::ArrayPattern(_)
                | NodeKind::ObjectPattern(_)
        ) {
            return Err(form.invalid_at(target, format!("Invalid assignment target: {}", target)));
        }

        let value = self.lower_expr(value)?;
        Ok(Node::assign(target_node, value))
    }
}

fn is_destructuring(node: &SExp) -> bool {
    ["vector", "hash-map", "empty-array", "empty-map"]
        .iter()
        .any(|head| node.is_form(head))
}
