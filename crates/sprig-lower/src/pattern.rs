//! Pattern compiler: parsed binding patterns to IR patterns.

use crate::error::{Result, SprigError};
use crate::symbols::{sanitize, sanitize_property};
use crate::types::parse_type_text;
use rhizome_sprig_ir::{Node, NodeKind};
use rhizome_sprig_sexpr::{Pattern, PatternKind, SExp};

/// Lower a pattern. `transform` lowers default-value expressions.
///
/// Skip patterns lower to `None`; they are only meaningful as array-pattern
/// slots. A default is applied after the pattern's own shape is lowered, so
/// nested destructuring shapes get wrapped exactly like identifiers.
pub fn lower_pattern<F>(pattern: &Pattern, transform: &mut F) -> Result<Option<Node>>
where
    F: FnMut(&SExp) -> Result<Node>,
{
    let position = pattern.position.clone();

    let node = match &pattern.kind {
        PatternKind::Skip => return Ok(None),

        PatternKind::Identifier {
            name,
            type_annotation,
        } => Node::typed_ident(
            sanitize(name),
            type_annotation.as_deref().map(parse_type_text),
        ),

        PatternKind::Array(elements) => {
            let lowered: Result<Vec<Option<Node>>> = elements
                .iter()
                .map(|element| lower_pattern(element, transform))
                .collect();
            Node::array_pattern(lowered?)
        }

        PatternKind::Object { properties, rest } => {
            let mut entries = Vec::with_capacity(properties.len() + 1);
            for property in properties {
                let value = lower_pattern(&property.value, transform)?.ok_or_else(|| {
                    SprigError::validation(format!(
                        "Invalid object pattern: '_' cannot bind key '{}'",
                        property.key
                    ))
                    .at(property.value.position.clone().or_else(|| position.clone()))
                })?;
                entries.push(keyed_property(&property.key, value));
            }
            if let Some(rest) = rest {
                let target = required(rest, transform, "object rest")?;
                entries.push(Node::rest(target).at(rest.position.clone()));
            }
            Node::object_pattern(entries)
        }

        PatternKind::Rest(inner) => Node::rest(required(inner, transform, "rest element")?),
    }
    .at(position.clone());

    match &pattern.default {
        Some(default) => {
            let value = transform(default)?;
            Ok(Some(Node::assignment_pattern(node, value).at(position)))
        }
        None => Ok(Some(node)),
    }
}

fn required<F>(pattern: &Pattern, transform: &mut F, what: &str) -> Result<Node>
where
    F: FnMut(&SExp) -> Result<Node>,
{
    lower_pattern(pattern, transform)?.ok_or_else(|| {
        SprigError::validation(format!("Invalid {}: '_' is not a binding", what))
            .at(pattern.position.clone())
    })
}

/// Build an object entry keyed by a plain name. `shorthand` is decided by
/// comparing the key with the bound identifier, since the source grammar
/// has no marker for it. Keys that are not valid identifiers become string
/// keys.
pub(crate) fn keyed_property(key: &str, value: Node) -> Node {
    let position = value.position.clone();
    let valid = sanitize_property(key) == key && !key.starts_with(|c: char| c.is_ascii_digit());
    let key_node = if valid {
        Node::ident(key)
    } else {
        Node::string(key)
    };
    let shorthand = bound_name(&value) == Some(key);
    Node::new(NodeKind::Property {
        key: Box::new(key_node.at(position.clone())),
        value: Box::new(value),
        computed: false,
        shorthand,
    })
    .at(position)
}

/// The identifier a pattern binds directly, looking through defaults.
pub fn bound_name(node: &Node) -> Option<&str> {
    match &node.kind {
        NodeKind::Identifier { name, .. } => Some(name),
        NodeKind::AssignmentPattern { target, .. } => bound_name(target),
        _ => None,
    }
}

/// Every identifier a lowered pattern binds, in source order.
pub fn bound_names(node: &Node) -> Vec<&str> {
    let mut names = Vec::new();
    collect_bound(node, &mut names);
    names
}

fn collect_bound<'n>(node: &'n Node, names: &mut Vec<&'n str>) {
    match &node.kind {
        NodeKind::Identifier { name, .. } => names.push(name),
        NodeKind::AssignmentPattern { target, .. } => collect_bound(target, names),
        NodeKind::RestElement(inner) => collect_bound(inner, names),
        NodeKind::ArrayPattern(elements) => {
            for element in elements.iter().flatten() {
                collect_bound(element, names);
            }
        }
        NodeKind::ObjectPattern(properties) => {
            for property in properties {
                match &property.kind {
                    NodeKind::Property { value, .. } => collect_bound(value, names),
                    _ => collect_bound(property, names),
                }
            }
        }
        _ => {}
    }
}
