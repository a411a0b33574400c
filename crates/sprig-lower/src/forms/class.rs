//! `class` and `enum` declarations.

use super::function::{Flavor, FunctionSpec};
use super::Form;
use crate::context::LoweringContext;
use crate::error::{codes, Result, SprigError};
use crate::symbols::{sanitize, sanitize_property};
use crate::types::parse_type_text;
use rhizome_sprig_ir::{Class, Enum, EnumCase, MethodKind, Node, NodeKind};
use rhizome_sprig_sexpr::{parse_params, ParamList, SExp};
use std::collections::HashSet;
use tracing::trace;

/// One parsed method before lowering.
struct MethodShape<'a> {
    key: &'a str,
    kind: MethodKind,
    flavor: Flavor,
    params: &'a SExp,
    body: &'a [SExp],
}

impl LoweringContext {
    /// ```text
    /// (class Point (extends Base)
    ///   (field x 0)
    ///   (constructor (x) (= this.x x))
    ///   (fn norm () (Math.sqrt (* this.x this.x)))
    ///   (static (fn origin () (new Point 0))))
    /// ```
    pub(crate) fn lower_class(&mut self, form: &Form<'_>) -> Result<Node> {
        let name = form.symbol(0, "a class name")?;
        let mut super_class = None;
        let mut has_constructor = false;
        let mut body = Vec::with_capacity(form.args.len() - 1);

        for member in &form.args[1..] {
            let items = member.as_list().unwrap_or_default();
            if member.is_form("extends") {
                if super_class.is_some() {
                    return Err(form
                        .invalid_at(member, format!("Duplicate extends clause in class '{}'", name))
                        .with_code(codes::DUPLICATE_DEFINITION));
                }
                let [_, base] = items else {
                    return Err(form.invalid_at(member, "Invalid extends clause: expected (extends Base)"));
                };
                super_class = Some(Box::new(self.lower_expr(base)?));
                continue;
            }

            let (is_static, member) = match items {
                [head, inner] if head.is_symbol("static") => (true, inner),
                _ => (false, member),
            };
            let lowered = self.lower_member(form, member, is_static)?;
            if let NodeKind::MethodDefinition {
                kind: MethodKind::Constructor,
                ..
            } = lowered.kind
            {
                if has_constructor {
                    return Err(form
                        .invalid_at(member, format!("Duplicate constructor in class '{}'", name))
                        .with_code(codes::DUPLICATE_DEFINITION));
                }
                has_constructor = true;
            }
            body.push(lowered);
        }

        trace!(class = %name, members = body.len(), "lowered class");
        Ok(Node::class_decl(Class {
            name: sanitize(name),
            super_class,
            body,
        }))
    }

    fn lower_member(&mut self, form: &Form<'_>, member: &SExp, is_static: bool) -> Result<Node> {
        let items = member.as_list().unwrap_or_default();
        let invalid = || form.invalid_at(member, format!("Invalid class member: {}", member));
        let Some(head) = member.head_symbol() else {
            return Err(invalid());
        };

        let node = match head {
            "field" | "var" | "let" | "const" => {
                let (key, value) = match items {
                    [_, key] if head != "const" => (key, None),
                    [_, key, value] => (key, Some(value)),
                    _ => return Err(invalid()),
                };
                let key = key.as_symbol().ok_or_else(invalid)?;
                let key = key.split_once(':').map_or(key, |(name, _)| name);
                let value = value.map(|v| self.lower_expr(v)).transpose()?;
                Node::new(NodeKind::PropertyDefinition {
                    key: sanitize_property(key),
                    value: value.map(Box::new),
                    is_static,
                    readonly: head == "const",
                })
            }
            _ => {
                let shape = method_shape(head, items).ok_or_else(invalid)?;
                self.lower_method(shape, is_static, member)?
            }
        };
        Ok(node.at(member.position.clone()))
    }

    fn lower_method(&mut self, shape: MethodShape<'_>, is_static: bool, member: &SExp) -> Result<Node> {
        let implicit_return = !matches!(shape.kind, MethodKind::Constructor | MethodKind::Set);
        let params: ParamList = parse_params(shape.params)?;
        if shape.kind == MethodKind::Set && params.params.len() != 1 {
            return Err(SprigError::validation(format!(
                "Invalid setter '{}': expects exactly one parameter",
                shape.key
            ))
            .with_code(codes::INVALID_FORM)
            .at(member.position.clone()));
        }
        let spec = FunctionSpec {
            name: None,
            type_params: Vec::new(),
            params,
            return_type: None,
            body: shape.body,
            flavor: shape.flavor,
            is_arrow: false,
            register: false,
            implicit_return,
            position: member.position.clone(),
        };
        let function = self.build_function(spec)?;
        Ok(Node::new(NodeKind::MethodDefinition {
            key: sanitize_property(shape.key),
            function: Box::new(function),
            kind: shape.kind,
            is_static,
        }))
    }

    /// ```text
    /// (enum Color (case red) (case green))
    /// (enum Status:number (case ok 200) (case missing 404))
    /// (enum Shape (case circle radius:number) (case rect w:number h:number))
    /// ```
    pub(crate) fn lower_enum(&mut self, form: &Form<'_>) -> Result<Node> {
        let declared = form.symbol(0, "an enum name")?;
        let (name, raw_type) = match declared.split_once(':') {
            Some((name, ty)) if !name.is_empty() && !ty.is_empty() => (name, Some(parse_type_text(ty))),
            _ => (declared, None),
        };

        let mut seen = HashSet::new();
        let mut cases: Vec<EnumCase> = Vec::with_capacity(form.args.len() - 1);
        for clause in &form.args[1..] {
            let case = self.lower_enum_case(form, clause)?;
            if !seen.insert(case.name.clone()) {
                return Err(form
                    .invalid_at(clause, format!("Duplicate enum case '{}' in '{}'", case.name, name))
                    .with_code(codes::DUPLICATE_DEFINITION));
            }
            cases.push(case);
        }

        let has_raw = cases.iter().any(|c| c.raw_value.is_some());
        let has_associated = cases.iter().any(|c| !c.associated.is_empty());
        if has_raw && has_associated {
            return Err(form
                .invalid(format!(
                    "Invalid enum '{}': cases cannot mix raw values and associated values",
                    name
                ))
                .with_code(codes::INVALID_FORM));
        }

        Ok(Node::enum_decl(Enum {
            name: sanitize(name),
            raw_type,
            cases,
        }))
    }

    fn lower_enum_case(&mut self, form: &Form<'_>, clause: &SExp) -> Result<EnumCase> {
        let invalid = |message: String| form.invalid_at(clause, message);
        let items = match clause.as_list() {
            Some(items) if clause.is_form("case") && items.len() >= 2 => items,
            _ => return Err(invalid(format!("Invalid enum case {}: expected (case name ...)", clause))),
        };
        let name = items[1]
            .as_symbol()
            .ok_or_else(|| invalid(format!("Invalid enum case name: {}", items[1])))?;

        let extras = &items[2..];
        let (raw_value, associated) = match extras {
            [] => (None, Vec::new()),
            [value] if value.as_literal().is_some() => (Some(self.lower_expr(value)?), Vec::new()),
            params if params.iter().all(|p| p.as_symbol().is_some()) => {
                let lowered: Result<Vec<Node>> = params.iter().map(|p| self.lower_target(p)).collect();
                (None, lowered?)
            }
            _ => {
                return Err(invalid(format!(
                    "Invalid enum case '{}': expected one raw value or named associated values",
                    name
                )))
            }
        };

        Ok(EnumCase {
            name: sanitize_property(name),
            raw_value,
            associated,
            position: clause.position.clone(),
        })
    }
}

/// Recognise a method member: `(fn name params body...)`, `(fn* ...)`,
/// `(async fn ...)`, `(async fn* ...)`, `(constructor params body...)`,
/// `(getter name params body...)`, `(setter name params body...)`.
fn method_shape<'a>(head: &str, items: &'a [SExp]) -> Option<MethodShape<'a>> {
    let (flavor, rest) = match head {
        "async" => {
            let inner = items.get(1)?.as_symbol()?;
            let flavor = Flavor {
                is_async: true,
                is_generator: inner == "fn*",
            };
            if inner != "fn" && inner != "fn*" {
                return None;
            }
            (flavor, &items[2..])
        }
        "fn*" => (
            Flavor {
                is_async: false,
                is_generator: true,
            },
            &items[1..],
        ),
        _ => (Flavor::default(), &items[1..]),
    };

    let kind = match head {
        "constructor" => {
            let (params, body) = rest.split_first()?;
            return Some(MethodShape {
                key: "constructor",
                kind: MethodKind::Constructor,
                flavor,
                params,
                body,
            });
        }
        "fn" | "fn*" | "async" => MethodKind::Method,
        "getter" => MethodKind::Get,
        "setter" => MethodKind::Set,
        _ => return None,
    };

    let [key, params, body @ ..] = rest else {
        return None;
    };
    Some(MethodShape {
        key: key.as_symbol()?,
        kind,
        flavor,
        params,
        body,
    })
}
