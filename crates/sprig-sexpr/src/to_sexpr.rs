//! Render AST back to S-expression text.

use crate::{SExp, SExpKind};
use rhizome_sprig_ir::Literal;

/// Render a node as S-expression source text.
pub fn to_sexpr(node: &SExp) -> String {
    let mut out = String::new();
    write_node(&mut out, node);
    out
}

fn write_node(out: &mut String, node: &SExp) {
    match &node.kind {
        SExpKind::Symbol(name) => out.push_str(name),
        SExpKind::Literal(lit) => write_literal(out, lit),
        SExpKind::List(items) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_node(out, item);
            }
            out.push(')');
        }
    }
}

fn write_literal(out: &mut String, lit: &Literal) {
    match lit {
        Literal::Null => out.push_str("null"),
        Literal::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Literal::Number(n) => {
            if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                out.push_str(&format!("{}", *n as i64));
            } else {
                out.push_str(&n.to_string());
            }
        }
        Literal::String(s) => {
            out.push('"');
            for c in s.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    '\r' => out.push_str("\\r"),
                    c => out.push(c),
                }
            }
            out.push('"');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_nested() {
        let node = SExp::list(vec![
            SExp::symbol("greet"),
            SExp::string("a \"b\""),
            SExp::list(vec![SExp::symbol("+"), SExp::number(1), SExp::number(2.5)]),
        ]);
        assert_eq!(to_sexpr(&node), r#"(greet "a \"b\"" (+ 1 2.5))"#);
    }

    #[test]
    fn test_render_empty_list() {
        assert_eq!(to_sexpr(&SExp::list(vec![])), "()");
    }
}
