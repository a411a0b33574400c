//! Function registry for call-site resolution.
//!
//! Each named `fn` declaration records its parameter shape here when it is
//! lowered. Later call sites in the same unit resolve against it; calls
//! lowered before the declaration do not see it.

use crate::error::{codes, Result, SprigError};
use crate::options::RedefinitionPolicy;
use rhizome_sprig_ir::{Node, Position};
use rhizome_sprig_sexpr::{Pattern, SExp};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The recorded shape of a declared function.
#[derive(Debug, Clone)]
pub struct FunctionEntry {
    /// Parameters in declaration order; a trailing rest pattern is allowed.
    pub params: Vec<Pattern>,
    /// Lowered default values keyed by [`FunctionEntry::param_key`].
    pub defaults: HashMap<String, Node>,
    pub uses_structured_map_params: bool,
    pub body: Vec<SExp>,
    /// Where the function was declared.
    pub position: Option<Position>,
}

impl FunctionEntry {
    /// Key of a parameter in `defaults`: its name, or `#index` for
    /// destructuring parameters.
    pub fn param_key(param: &Pattern, index: usize) -> String {
        match param.name() {
            Some(name) => name.to_string(),
            None => format!("#{}", index),
        }
    }

    /// Human-readable parameter label for diagnostics.
    pub fn param_label(param: &Pattern, index: usize) -> String {
        match param.name() {
            Some(name) => name.to_string(),
            None => format!("parameter #{}", index + 1),
        }
    }

    /// Parameters before the rest parameter.
    pub fn positional(&self) -> &[Pattern] {
        match self.params.last() {
            Some(last) if last.is_rest() => &self.params[..self.params.len() - 1],
            _ => &self.params,
        }
    }

    pub fn rest_param(&self) -> Option<&Pattern> {
        self.params.last().filter(|p| p.is_rest())
    }

    pub fn default_for(&self, index: usize) -> Option<&Node> {
        let param = self.params.get(index)?;
        self.defaults.get(&Self::param_key(param, index))
    }
}

/// Declared functions of one compilation unit.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    entries: HashMap<String, Arc<FunctionEntry>>,
    policy: RedefinitionPolicy,
}

impl FunctionRegistry {
    pub fn new(policy: RedefinitionPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            policy,
        }
    }

    /// Record a declaration. Under [`RedefinitionPolicy::Replace`] a later
    /// declaration with the same name wins; under `Reject` it is an error.
    pub fn declare(&mut self, name: impl Into<String>, entry: FunctionEntry) -> Result<()> {
        let name = name.into();
        if let Some(existing) = self.entries.get(&name) {
            match self.policy {
                RedefinitionPolicy::Replace => {
                    debug!(function = %name, "replacing earlier declaration");
                }
                RedefinitionPolicy::Reject => {
                    let previous = existing
                        .position
                        .as_ref()
                        .map(|p| format!(" (first declared at {})", p))
                        .unwrap_or_default();
                    return Err(SprigError::validation(format!(
                        "Function '{}' is already defined{}",
                        name, previous
                    ))
                    .with_code(codes::DUPLICATE_DEFINITION)
                    .at(entry.position.clone()));
                }
            }
        } else {
            debug!(function = %name, params = entry.params.len(), "declared function");
        }
        self.entries.insert(name, Arc::new(entry));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<FunctionEntry>> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
