//! `import`, `export` and `dynamic-import`.

use super::{binding_items, Form, SpecialForm};
use crate::context::LoweringContext;
use crate::error::{codes, Result, SprigError};
use crate::symbols::sanitize;
use rhizome_sprig_ir::{Node, NodeKind};
use rhizome_sprig_sexpr::SExp;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

impl LoweringContext {
    /// ```text
    /// (import "./setup.sprig")               side effect only
    /// (import utils from "./utils.sprig")    import * as utils
    /// (import (a b as c) from "./lib.sprig") import { a, b as c }
    /// ```
    pub(crate) fn lower_import(&mut self, form: &Form<'_>) -> Result<Node> {
        let (specifiers, source) = match form.args {
            [source] => (Vec::new(), source),
            [binding, from, source] if from.is_symbol("from") => {
                let specifiers = match binding.as_symbol() {
                    Some(name) => vec![Node::new(NodeKind::ImportNamespaceSpecifier(sanitize(name)))
                        .at(binding.position.clone())],
                    None => self.import_specifiers(form, binding)?,
                };
                (specifiers, source)
            }
            _ => return Err(import_error(form, form.node)),
        };

        let Some(path) = source.as_string() else {
            return Err(import_error(form, source));
        };
        let resolved = self.resolve_relative(path);
        debug!(source = %path, resolved = ?resolved, "import");
        Ok(Node::new(NodeKind::ImportDeclaration {
            specifiers,
            source: self.rewrite_extension(path),
            resolved,
        }))
    }

    /// ```text
    /// (export (a b as c))   export { a, b as c }
    /// (export default x)    export default x
    /// (export (fn f () 1))  export function f() { return 1; }
    /// ```
    pub(crate) fn lower_export(&mut self, form: &Form<'_>) -> Result<Node> {
        match form.args {
            [marker, value] if marker.is_symbol("default") => {
                Ok(Node::new(NodeKind::ExportDefault(Box::new(self.lower_expr(value)?))))
            }
            [list] if is_name_list(list) => {
                let specifiers = self
                    .named_list(form, list)?
                    .into_iter()
                    .map(|(name, alias)| {
                        Node::new(NodeKind::ExportSpecifier {
                            local: sanitize(name),
                            exported: alias.unwrap_or(name).to_string(),
                        })
                    })
                    .collect();
                Ok(Node::new(NodeKind::ExportNamed {
                    declaration: None,
                    specifiers,
                }))
            }
            [declaration] => {
                let lowered = self.lower(declaration)?;
                match lowered {
                    Some(node) if is_declaration(&node) => Ok(Node::new(NodeKind::ExportNamed {
                        declaration: Some(Box::new(node)),
                        specifiers: Vec::new(),
                    })),
                    _ => Err(import_error(form, declaration)),
                }
            }
            _ => Err(import_error(form, form.node)),
        }
    }

    /// `(dynamic-import "./mod.sprig")` to `import("./mod.js")`.
    pub(crate) fn lower_dynamic_import(&mut self, form: &Form<'_>) -> Result<Node> {
        form.exactly(1)?;
        let source = match form.args[0].as_string() {
            Some(path) => Node::string(self.rewrite_extension(path)).at(form.args[0].position.clone()),
            None => self.lower_expr(&form.args[0])?,
        };
        Ok(Node::new(NodeKind::ImportExpression(Box::new(source))))
    }

    fn import_specifiers(&mut self, form: &Form<'_>, list: &SExp) -> Result<Vec<Node>> {
        Ok(self
            .named_list(form, list)?
            .into_iter()
            .map(|(name, alias)| {
                Node::new(NodeKind::ImportSpecifier {
                    imported: name.to_string(),
                    local: sanitize(alias.unwrap_or(name)),
                })
            })
            .collect())
    }

    /// `(a b as c)` to `[(a, None), (b, Some(c))]`.
    fn named_list<'a>(&self, form: &Form<'_>, list: &'a SExp) -> Result<Vec<(&'a str, Option<&'a str>)>> {
        let items = binding_items(list).unwrap_or_default();
        let mut names = Vec::with_capacity(items.len());
        let mut i = 0;
        while i < items.len() {
            let Some(name) = items[i].as_symbol() else {
                return Err(import_error(form, &items[i]));
            };
            if items.get(i + 1).map_or(false, |n| n.is_symbol("as")) {
                let alias = items.get(i + 2).and_then(SExp::as_symbol).ok_or_else(|| {
                    import_error(form, &items[i + 1])
                })?;
                names.push((name, Some(alias)));
                i += 3;
            } else {
                names.push((name, None));
                i += 1;
            }
        }
        Ok(names)
    }

    /// `./x.sprig` to `./x.js`; other paths are left alone.
    fn rewrite_extension(&self, path: &str) -> String {
        match path.strip_suffix(self.options.source_extension.as_str()) {
            Some(stem) if !self.options.source_extension.is_empty() => format!("{}.js", stem),
            _ => path.to_string(),
        }
    }

    /// Relative specifiers resolve against the unit's directory.
    fn resolve_relative(&self, path: &str) -> Option<String> {
        if !(path.starts_with("./") || path.starts_with("../")) {
            return None;
        }
        let joined = normalize(&self.context_dir().join(path));
        Some(joined.to_string_lossy().into_owned())
    }
}

fn import_error(form: &Form<'_>, node: &SExp) -> SprigError {
    let (what, code) = match form.name {
        "export" => ("export", codes::INVALID_EXPORT),
        _ => ("import", codes::INVALID_IMPORT),
    };
    SprigError::import(format!("Invalid {}: {}", what, form.node))
        .with_code(code)
        .at(node.position.clone().or_else(|| form.position()))
}

/// A bare name list, as opposed to a declaration form.
fn is_name_list(node: &SExp) -> bool {
    if node.is_form("vector") || node.is_form("empty-array") {
        return true;
    }
    match node.as_list() {
        Some(items) => {
            !items.is_empty()
                && items.iter().all(|item| item.as_symbol().is_some())
                && node.head_symbol().map_or(false, |head| {
                    SpecialForm::from_name(head).is_none()
                })
        }
        None => false,
    }
}

fn is_declaration(node: &Node) -> bool {
    matches!(
        node.kind,
        NodeKind::VariableDeclaration { .. }
            | NodeKind::FunctionDeclaration(_)
            | NodeKind::ClassDeclaration(_)
            | NodeKind::EnumDeclaration(_)
            | NodeKind::TypeAlias { .. }
            | NodeKind::Interface { .. }
    )
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use rhizome_sprig_sexpr::from_json;
    use serde_json::json;

    fn lower(value: serde_json::Value) -> Result<Node> {
        let mut ctx = LoweringContext::new("/app/src");
        let node = from_json(&json!({"line": 1, "column": 1, "node": value})).unwrap();
        ctx.lower(&node).map(|n| n.unwrap())
    }

    #[test]
    fn test_import_forms() {
        let node = lower(json!(["import", {"str": "./setup.sprig"}])).unwrap();
        match node.kind {
            NodeKind::ImportDeclaration { specifiers, source, resolved } => {
                assert!(specifiers.is_empty());
                assert_eq!(source, "./setup.js");
                assert_eq!(resolved.as_deref(), Some("/app/src/setup.sprig"));
            }
            other => panic!("expected import, got {:?}", other),
        }

        let node = lower(json!(["import", ["vector", "a", "b", "as", "c"], "from", {"str": "../lib/x.sprig"}])).unwrap();
        match node.kind {
            NodeKind::ImportDeclaration { specifiers, resolved, .. } => {
                assert_eq!(specifiers.len(), 2);
                assert_eq!(
                    specifiers[1].kind,
                    NodeKind::ImportSpecifier {
                        imported: "b".into(),
                        local: "c".into()
                    }
                );
                assert_eq!(resolved.as_deref(), Some("/app/lib/x.sprig"));
            }
            other => panic!("expected import, got {:?}", other),
        }

        let node = lower(json!(["import", "fs", "from", {"str": "node:fs"}])).unwrap();
        match node.kind {
            NodeKind::ImportDeclaration { specifiers, resolved, source } => {
                assert_eq!(specifiers[0].kind, NodeKind::ImportNamespaceSpecifier("fs".into()));
                assert_eq!(source, "node:fs");
                assert_eq!(resolved, None);
            }
            other => panic!("expected import, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_import() {
        let err = lower(json!(["import", "x", "of", {"str": "./x"}])).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Import);
        assert_eq!(err.code(), codes::INVALID_IMPORT);
        assert!(lower(json!(["import", 1])).is_err());
    }

    #[test]
    fn test_export_forms() {
        let node = lower(json!(["export", ["vector", "a", "b", "as", "c"]])).unwrap();
        assert!(matches!(node.kind, NodeKind::ExportNamed { declaration: None, ref specifiers } if specifiers.len() == 2));

        let node = lower(json!(["export", "default", "main"])).unwrap();
        assert_eq!(node.kind, NodeKind::ExportDefault(Box::new(Node::ident("main"))));

        let node = lower(json!(["export", ["fn", "f", [], 1]])).unwrap();
        assert!(matches!(node.kind, NodeKind::ExportNamed { declaration: Some(_), .. }));

        let err = lower(json!(["export", ["+", 1, 2]])).unwrap_err();
        assert_eq!(err.code(), codes::INVALID_EXPORT);
    }

    #[test]
    fn test_dynamic_import_rewrites_extension() {
        assert_eq!(
            lower(json!(["dynamic-import", {"str": "./lazy.sprig"}])).unwrap().kind,
            NodeKind::ImportExpression(Box::new(Node::string("./lazy.js")))
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/b/./../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
    }
}
