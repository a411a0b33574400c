//! Host interop: `js-call`, `method-call`, `js-get`, `js-set`,
//! `js-get-invoke`. Property names are used exactly as written.

use super::Form;
use crate::context::LoweringContext;
use crate::error::Result;
use crate::lower::iife;
use crate::symbols::{keyword_name, sanitize_property};
use rhizome_sprig_ir::{BinaryOp, Node, Position, UnaryOp, VariableKind};
use rhizome_sprig_sexpr::SExp;

impl LoweringContext {
    /// `(js-call obj "method" args...)`.
    pub(crate) fn lower_js_call(&mut self, form: &Form<'_>) -> Result<Node> {
        form.at_least(2)?;
        let receiver = self.lower_expr(&form.args[0])?;
        let name = self.property_key(form, 1)?;
        let arguments = self.lower_arguments(&form.args[2..])?;
        if is_identifier(name) {
            return Ok(self.invoke(receiver, name, arguments, form.pos()));
        }
        let callee = property_access(receiver, name, form.pos());
        Ok(Node::call(callee, arguments))
    }

    /// `(js-get obj "prop")`.
    pub(crate) fn lower_js_get(&mut self, form: &Form<'_>) -> Result<Node> {
        form.exactly(2)?;
        let object = self.lower_expr(&form.args[0])?;
        let name = self.property_key(form, 1)?;
        Ok(property_access(object, name, form.pos()))
    }

    /// `(js-set obj "prop" value)`.
    pub(crate) fn lower_js_set(&mut self, form: &Form<'_>) -> Result<Node> {
        form.exactly(3)?;
        let object = self.lower_expr(&form.args[0])?;
        let name = self.property_key(form, 1)?;
        let value = self.lower_expr(&form.args[2])?;
        Ok(Node::assign(property_access(object, name, form.pos()), value))
    }

    /// `(js-get-invoke obj "prop")`: call the property if it is a function,
    /// otherwise read it. The receiver is evaluated once.
    pub(crate) fn lower_js_get_invoke(&mut self, form: &Form<'_>) -> Result<Node> {
        form.exactly(2)?;
        let (object, suspension) = self.tracking(|ctx| ctx.lower_expr(&form.args[0]))?;
        let name = self.property_key(form, 1)?;
        let pos = form.pos();

        let receiver = self.gensym("receiver");
        let member = self.gensym("member");
        let receiver_ref = || Node::ident(receiver.clone()).or_at(pos);
        let member_ref = || Node::ident(member.clone()).or_at(pos);
        let is_function = Node::binary(
            BinaryOp::StrictEq,
            Node::unary(UnaryOp::TypeOf, member_ref()).or_at(pos),
            Node::string("function").or_at(pos),
        )
        .or_at(pos);
        let called = self.invoke(member_ref(), "call", vec![receiver_ref()], pos);
        let read = property_access(receiver_ref(), name, pos);
        let body = vec![
            Node::declare(VariableKind::Const, receiver_ref(), Some(object)).or_at(pos),
            Node::declare(VariableKind::Const, member_ref(), Some(read)).or_at(pos),
            Node::return_stmt(Some(Node::conditional(is_function, called, member_ref()).or_at(pos)))
                .or_at(pos),
        ];
        Ok(iife(body, suspension, pos))
    }

    /// The property name argument at `index`: a string, a keyword or a bare
    /// symbol.
    fn property_key<'a>(&self, form: &Form<'a>, index: usize) -> Result<&'a str> {
        let arg: &'a SExp = &form.args[index];
        if let Some(text) = arg.as_string() {
            return Ok(text);
        }
        match arg.as_symbol() {
            Some(symbol) => Ok(keyword_name(symbol).unwrap_or(symbol)),
            None => Err(form.invalid_at(
                arg,
                format!("Invalid property name in '{}': expected a string or symbol, got {}", form.name, arg),
            )),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && sanitize_property(name) == name
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

/// `obj.name`, or `obj["name"]` when `name` is not an identifier.
fn property_access(object: Node, name: &str, position: Option<&Position>) -> Node {
    if is_identifier(name) {
        Node::member(object, name).or_at(position)
    } else {
        Node::index(object, Node::string(name).or_at(position)).or_at(position)
    }
}

#[cfg(test)]
mod tests {
    use crate::context::LoweringContext;
    use rhizome_sprig_ir::{Node, NodeKind, Position};
    use rhizome_sprig_sexpr::from_json;
    use serde_json::json;

    fn lower(value: serde_json::Value) -> crate::error::Result<Node> {
        let mut ctx = LoweringContext::new(".");
        ctx.lower(&from_json(&value).unwrap()).map(|n| n.unwrap())
    }

    #[test]
    fn test_js_call_keeps_names() {
        assert_eq!(
            lower(json!(["js-call", "el", {"str": "addEventListener"}, {"str": "click"}, "handler"])).unwrap(),
            Node::call(
                Node::member(Node::ident("el"), "addEventListener"),
                vec![Node::string("click"), Node::ident("handler")]
            )
        );
        assert_eq!(
            lower(json!(["method-call", "obj", {"str": "my-method"}])).unwrap(),
            Node::call(Node::index(Node::ident("obj"), Node::string("my-method")), vec![])
        );
    }

    #[test]
    fn test_js_get_and_set() {
        assert_eq!(
            lower(json!(["js-get", "obj", "class"])).unwrap(),
            Node::member(Node::ident("obj"), "class")
        );
        assert_eq!(
            lower(json!(["js-set", "obj", {"str": "x"}, 1])).unwrap(),
            Node::assign(Node::member(Node::ident("obj"), "x"), Node::number(1))
        );
        assert!(lower(json!(["js-get", "obj", 1])).is_err());
    }

    #[test]
    fn test_js_get_invoke_evaluates_receiver_once() {
        let node = lower(json!(["js-get-invoke", ["make"], {"str": "size"}])).unwrap();
        let NodeKind::Call { callee, .. } = node.kind else {
            panic!("expected call");
        };
        let NodeKind::Function(function) = callee.kind else {
            panic!("expected wrapper function");
        };
        assert_eq!(function.body.len(), 3);
        assert!(matches!(function.body[2].kind, NodeKind::Return(Some(_))));
    }

    #[test]
    fn test_js_get_invoke_temporaries_are_located() {
        let node = lower(json!({"line": 5, "column": 3, "node": ["js-get-invoke", "obj", {"str": "size"}]})).unwrap();
        let at = Some(Position::new(5, 3));
        assert_eq!(node.position, at);
        let NodeKind::Call { callee, .. } = node.kind else {
            panic!("expected call");
        };
        let NodeKind::Function(function) = callee.kind else {
            panic!("expected wrapper function");
        };
        for stmt in &function.body {
            assert_eq!(stmt.position, at, "unlocated {:?}", stmt);
        }
        match &function.body[0].kind {
            NodeKind::VariableDeclaration { declarations, .. } => match &declarations[0].kind {
                NodeKind::VariableDeclarator { id, .. } => assert_eq!(id.position, at),
                other => panic!("expected declarator, got {:?}", other),
            },
            other => panic!("expected declaration, got {:?}", other),
        }
    }
}
