//! Type-level declarations: `type`/`deftype`, `interface`, `as`.

use super::function::split_generics;
use super::Form;
use crate::context::LoweringContext;
use crate::error::Result;
use crate::symbols::sanitize;
use crate::types::parse_type;
use rhizome_sprig_ir::{InterfaceMember, Node, NodeKind};
use rhizome_sprig_sexpr::SExp;

impl LoweringContext {
    /// `(type Pair<T> (tuple T T))`.
    pub(crate) fn lower_type_alias(&mut self, form: &Form<'_>) -> Result<Node> {
        form.exactly(2)?;
        let (name, type_params) = split_generics(form.symbol(0, "a type name")?);
        let ty = parse_type(&form.args[1])?;
        Ok(Node::new(NodeKind::TypeAlias {
            name: sanitize(name),
            type_params,
            ty,
        }))
    }

    /// ```text
    /// (interface User<Id> (extends Named)
    ///   (id Id)
    ///   (email? string)
    ///   (readonly created number))
    /// ```
    pub(crate) fn lower_interface(&mut self, form: &Form<'_>) -> Result<Node> {
        let (name, type_params) = split_generics(form.symbol(0, "an interface name")?);
        let mut extends = Vec::new();
        let mut members = Vec::with_capacity(form.args.len() - 1);

        for entry in &form.args[1..] {
            let items = entry.as_list().unwrap_or_default();
            if entry.is_form("extends") {
                for base in &items[1..] {
                    extends.push(parse_type(base)?);
                }
                continue;
            }
            members.push(interface_member(form, entry, items)?);
        }

        Ok(Node::new(NodeKind::Interface {
            name: sanitize(name),
            type_params,
            extends,
            members,
        }))
    }

    /// `(as expr Type)`.
    pub(crate) fn lower_as(&mut self, form: &Form<'_>) -> Result<Node> {
        form.exactly(2)?;
        let expression = self.lower_expr(&form.args[0])?;
        let ty = parse_type(&form.args[1])?;
        Ok(Node::new(NodeKind::As {
            expression: Box::new(expression),
            ty,
        }))
    }
}

fn interface_member(form: &Form<'_>, entry: &SExp, items: &[SExp]) -> Result<InterfaceMember> {
    let (readonly, key, ty) = match items {
        [marker, key, ty] if marker.is_symbol("readonly") => (true, key, ty),
        [key, ty] => (false, key, ty),
        _ => {
            return Err(form.invalid_at(
                entry,
                format!("Invalid interface member {}: expected (name Type) or (readonly name Type)", entry),
            ))
        }
    };
    let key = key
        .as_symbol()
        .ok_or_else(|| form.invalid_at(key, format!("Invalid interface member name: {}", key)))?;
    let (key, optional) = match key.strip_suffix('?') {
        Some(base) if !base.is_empty() => (base, true),
        _ => (key, false),
    };
    Ok(InterfaceMember {
        key: key.to_string(),
        ty: parse_type(ty)?,
        optional,
        readonly,
    })
}
