//! Call lowering for heads that are not special forms.
//!
//! `(f x)` is always a call. The one exception is a two-element list whose
//! argument is a numeric literal: that goes through a runtime helper which
//! tries indexed access first and only then calls `f`. String arguments get
//! no such treatment, so `(greet "x")` stays a call.

use crate::context::LoweringContext;
use crate::error::{Result, SprigError};
use crate::symbols::{is_chain, sanitize, sanitize_property};
use rhizome_sprig_ir::{Node, Position};
use rhizome_sprig_sexpr::{SExp, SExpKind};
use tracing::trace;

impl LoweringContext {
    /// `(name args...)` where `name` is not a special form.
    pub(crate) fn lower_named_call(&mut self, node: &SExp, name: &str, items: &[SExp]) -> Result<Node> {
        let head = &items[0];
        let args = &items[1..];

        if let Some(method) = method_name(name) {
            return self.lower_method_call(node, method, args);
        }

        if !is_chain(name) {
            let key = sanitize(name);
            // A parameter or local binding hides a declared function of the
            // same name.
            let entry = if self.is_local(&key) {
                trace!(name = %key, "local binding shadows registry");
                None
            } else {
                self.registry.get(&key)
            };
            if let Some(entry) = entry {
                trace!(function = %key, "resolving against registry");
                let callee = Node::ident(key.clone()).at(head.position.clone());
                return self.resolve_call(&key, &entry, callee, node, args);
            }
        }

        let callee = self.lower_symbol(name, head.position.as_ref())?;
        self.finish_call(node, callee, args)
    }

    /// `((f) args...)`: the head is itself a form.
    pub(crate) fn lower_applied(&mut self, node: &SExp, items: &[SExp]) -> Result<Node> {
        let callee = self.lower_expr(&items[0])?;
        self.finish_call(node, callee, &items[1..])
    }

    fn finish_call(&mut self, node: &SExp, callee: Node, args: &[SExp]) -> Result<Node> {
        let position = node.position.clone();
        if let [index] = args {
            if let Some(n) = index.as_number() {
                let helper = Node::ident(self.options.numeric_access_helper.clone()).at(position.clone());
                let index = Node::number(n).at(index.position.clone());
                return Ok(Node::call(helper, vec![callee, index]).at(position));
            }
        }
        let arguments = self.lower_arguments(args)?;
        Ok(Node::call(callee, arguments).at(position))
    }

    /// `(.push xs 1)`: the receiver is the second element.
    fn lower_method_call(&mut self, node: &SExp, method: &str, args: &[SExp]) -> Result<Node> {
        let (receiver, rest) = args.split_first().ok_or_else(|| {
            SprigError::validation(format!("Method call '.{}' requires a receiver", method))
                .at(node.position.clone())
        })?;
        let receiver = self.lower_expr(receiver)?;
        let callee = Node::member(receiver, sanitize_property(method)).at(node.position.clone());
        let arguments = self.lower_arguments(rest)?;
        Ok(Node::call(callee, arguments).at(node.position.clone()))
    }

    /// Lower call arguments; `...xs` and `(... xs)` become spread elements.
    pub(crate) fn lower_arguments(&mut self, args: &[SExp]) -> Result<Vec<Node>> {
        args.iter()
            .map(|arg| match spread_target(arg) {
                Some(SpreadTarget::Symbol(name)) => {
                    let target = self.lower_symbol(name, arg.position.as_ref())?;
                    Ok(Node::spread(target).at(arg.position.clone()))
                }
                Some(SpreadTarget::Form(expr)) => {
                    let target = self.lower_expr(expr)?;
                    Ok(Node::spread(target).at(arg.position.clone()))
                }
                None => self.lower_expr(arg),
            })
            .collect()
    }

    /// Build `receiver.method(args)` from already-lowered parts.
    pub(crate) fn invoke(&self, receiver: Node, method: &str, arguments: Vec<Node>, position: Option<&Position>) -> Node {
        let callee = Node::member(receiver, method).or_at(position);
        Node::call(callee, arguments).or_at(position)
    }
}

fn method_name(name: &str) -> Option<&str> {
    name.strip_prefix('.')
        .filter(|method| !method.is_empty() && !method.starts_with('.'))
}

pub(crate) enum SpreadTarget<'a> {
    Symbol(&'a str),
    Form(&'a SExp),
}

/// Recognise a spread argument.
pub(crate) fn spread_target(arg: &SExp) -> Option<SpreadTarget<'_>> {
    match &arg.kind {
        SExpKind::Symbol(name) => name
            .strip_prefix("...")
            .filter(|target| !target.is_empty())
            .map(SpreadTarget::Symbol),
        SExpKind::List(items) if items.len() == 2 && items[0].is_symbol("...") => {
            Some(SpreadTarget::Form(&items[1]))
        }
        _ => None,
    }
}

pub(crate) fn is_spread(arg: &SExp) -> bool {
    spread_target(arg).is_some()
}
