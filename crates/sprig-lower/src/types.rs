//! Type-expression parser.
//!
//! Recursive descent over S-expression syntax. List heads select the
//! production:
//!
//! | head | production |
//! |---|---|
//! | `\|` | union |
//! | `&` | intersection |
//! | `keyof` | `keyof T` |
//! | `[]`, `indexed` | `T[K]` |
//! | `if-extends`, `extends` | `C extends E ? T : F` |
//! | `tuple`, `vector` | `[A, B]` |
//! | `array` | `T[]` |
//! | `readonly`, `infer`, `typeof` | prefix operators |
//! | `mapped` | `{ [K in C]: V }` |
//! | `->`, `fn` | function type |
//! | `...`, `rest` | `...T` |
//!
//! Any other head is a generic application (`(Map string number)`). Symbols
//! go through a small text grammar (`A|B`, `T[]`, `Name<A, B>`); string
//! literals and text that cannot be decomposed pass through as
//! [`TypeNode::Raw`].
//!
//! The parser does not touch lowering state.

use crate::error::{Result, SprigError};
use once_cell::sync::Lazy;
use regex::Regex;
use rhizome_sprig_ir::{Literal, TypeLiteral, TypeNode, TypeParam};
use rhizome_sprig_sexpr::{SExp, SExpKind};

static GENERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_$][A-Za-z0-9_$.]*)<(.+)>$").expect("valid generic-type regex")
});

static NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$.]*$").expect("valid type-name regex"));

/// Parse a type expression.
pub fn parse_type(node: &SExp) -> Result<TypeNode> {
    match &node.kind {
        SExpKind::Symbol(name) => Ok(parse_type_text(name)),
        SExpKind::Literal(lit) => Ok(literal_type(lit)),
        SExpKind::List(items) => parse_compound(node, items),
    }
}

fn literal_type(lit: &Literal) -> TypeNode {
    match lit {
        Literal::String(text) => TypeNode::Raw(text.clone()),
        Literal::Number(n) => TypeNode::Literal(TypeLiteral::Number(*n)),
        Literal::Bool(b) => TypeNode::Literal(TypeLiteral::Bool(*b)),
        Literal::Null => TypeNode::named("null"),
    }
}

fn parse_compound(node: &SExp, items: &[SExp]) -> Result<TypeNode> {
    let head = items.first().ok_or_else(|| invalid(node, "Invalid type: empty type expression"))?;
    let name = head
        .as_symbol()
        .ok_or_else(|| invalid(head, format!("Invalid type: expected a type name, got {}", head)))?;
    let args = &items[1..];

    match name {
        "|" => Ok(TypeNode::Union(parse_all(node, name, args)?)),
        "&" => Ok(TypeNode::Intersection(parse_all(node, name, args)?)),
        "keyof" => {
            let [inner] = exactly::<1>(node, name, args)?;
            Ok(TypeNode::Keyof(Box::new(parse_type(inner)?)))
        }
        "[]" | "indexed" => {
            let [object, index] = exactly::<2>(node, name, args)?;
            Ok(TypeNode::IndexedAccess {
                object: Box::new(parse_type(object)?),
                index: Box::new(parse_type(index)?),
            })
        }
        "if-extends" | "extends" => {
            let [check, extends, true_type, false_type] = exactly::<4>(node, name, args)?;
            Ok(TypeNode::Conditional {
                check: Box::new(parse_type(check)?),
                extends: Box::new(parse_type(extends)?),
                true_type: Box::new(parse_type(true_type)?),
                false_type: Box::new(parse_type(false_type)?),
            })
        }
        "tuple" | "vector" => Ok(TypeNode::Tuple(
            args.iter().map(parse_type).collect::<Result<_>>()?,
        )),
        "array" => {
            let [element] = exactly::<1>(node, name, args)?;
            Ok(TypeNode::array(parse_type(element)?))
        }
        "readonly" => {
            let [inner] = exactly::<1>(node, name, args)?;
            Ok(TypeNode::Readonly(Box::new(parse_type(inner)?)))
        }
        "infer" => {
            let [param] = exactly::<1>(node, name, args)?;
            Ok(TypeNode::Infer(type_name(param, "infer")?))
        }
        "typeof" => {
            let [target] = exactly::<1>(node, name, args)?;
            Ok(TypeNode::Typeof(type_name(target, "typeof")?))
        }
        "mapped" => {
            let [param, constraint, value] = exactly::<3>(node, name, args)?;
            Ok(TypeNode::Mapped {
                param: type_name(param, "mapped")?,
                constraint: Box::new(parse_type(constraint)?),
                value: Box::new(parse_type(value)?),
            })
        }
        "->" | "fn" => {
            let [params, return_type] = exactly::<2>(node, name, args)?;
            Ok(TypeNode::Function {
                params: function_params(params)?,
                return_type: Box::new(parse_type(return_type)?),
            })
        }
        "..." | "rest" => {
            let [inner] = exactly::<1>(node, name, args)?;
            Ok(TypeNode::Rest(Box::new(parse_type(inner)?)))
        }
        _ => Ok(TypeNode::generic(
            name,
            args.iter().map(parse_type).collect::<Result<_>>()?,
        )),
    }
}

fn parse_all(node: &SExp, name: &str, args: &[SExp]) -> Result<Vec<TypeNode>> {
    if args.is_empty() {
        return Err(invalid(node, format!("'{}' type requires at least one member", name)));
    }
    args.iter().map(parse_type).collect()
}

fn exactly<'a, const N: usize>(node: &SExp, name: &str, args: &'a [SExp]) -> Result<&'a [SExp; N]> {
    args.try_into().map_err(|_| {
        invalid(
            node,
            format!(
                "'{}' type requires exactly {} argument{}, got {}",
                name,
                N,
                if N == 1 { "" } else { "s" },
                args.len()
            ),
        )
    })
}

fn type_name(node: &SExp, production: &str) -> Result<String> {
    node.as_symbol()
        .map(str::to_string)
        .ok_or_else(|| invalid(node, format!("Invalid '{}' type: expected a name, got {}", production, node)))
}

fn function_params(node: &SExp) -> Result<Vec<TypeParam>> {
    let items = node
        .as_list()
        .ok_or_else(|| invalid(node, format!("Invalid function type: expected a parameter list, got {}", node)))?;
    let items = match node.head_symbol() {
        Some("vector") => &items[1..],
        _ => items,
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if let Some((name, ty)) = item.as_symbol().and_then(|s| s.split_once(':')) {
                if !name.is_empty() && !ty.is_empty() {
                    return Ok(TypeParam {
                        name: name.to_string(),
                        ty: parse_type_text(ty),
                    });
                }
            }
            Ok(TypeParam {
                name: format!("arg{}", i),
                ty: parse_type(item)?,
            })
        })
        .collect()
}

/// Parse annotation text such as `Array<number>` or `string|null`.
/// Never fails: text that doesn't decompose is returned as `Raw`.
pub fn parse_type_text(text: &str) -> TypeNode {
    let text = text.trim();

    let union = split_top_level(text, '|');
    if union.len() > 1 {
        return TypeNode::Union(union.into_iter().map(parse_type_text).collect());
    }
    let intersection = split_top_level(text, '&');
    if intersection.len() > 1 {
        return TypeNode::Intersection(intersection.into_iter().map(parse_type_text).collect());
    }

    if let Some(element) = text.strip_suffix("[]") {
        if !element.is_empty() && balanced(element) {
            return TypeNode::array(parse_type_text(element));
        }
    }

    if let Some(caps) = GENERIC.captures(text) {
        let args = &caps[2];
        if balanced(args) {
            return TypeNode::generic(
                &caps[1],
                split_top_level(args, ',').into_iter().map(parse_type_text).collect(),
            );
        }
    }

    match text {
        "true" => return TypeNode::Literal(TypeLiteral::Bool(true)),
        "false" => return TypeNode::Literal(TypeLiteral::Bool(false)),
        _ => {}
    }

    if NAME.is_match(text) {
        return TypeNode::named(text);
    }
    if let Ok(n) = text.parse::<f64>() {
        return TypeNode::Literal(TypeLiteral::Number(n));
    }
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        return TypeNode::Literal(TypeLiteral::String(text[1..text.len() - 1].to_string()));
    }

    TypeNode::Raw(text.to_string())
}

/// Split on `sep` outside any bracket pair.
pub(crate) fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

fn balanced(text: &str) -> bool {
    let mut depth = 0i32;
    for c in text.chars() {
        match c {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn invalid(node: &SExp, message: impl Into<String>) -> SprigError {
    SprigError::validation(message).at(node.position.clone())
}
