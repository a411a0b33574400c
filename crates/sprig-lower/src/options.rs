//! Lowering configuration.

use serde::{Deserialize, Serialize};

/// What happens when a unit declares a function name twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedefinitionPolicy {
    /// The later declaration replaces the earlier one.
    #[default]
    Replace,
    /// A second declaration is a validation error.
    Reject,
}

/// Options for one lowering context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LowerOptions {
    pub redefinition: RedefinitionPolicy,
    /// Runtime helper called for `(coll 0)`: tries indexed access first,
    /// then falls back to calling `coll`.
    pub numeric_access_helper: String,
    /// Property marking the object thrown by an early `return` from inside
    /// an expression wrapper.
    pub early_return_key: String,
    /// Source-module extension rewritten to `.js` in import paths.
    pub source_extension: String,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            redefinition: RedefinitionPolicy::Replace,
            numeric_access_helper: "__sprig_get_numeric".into(),
            early_return_key: "__sprig_early_return__".into(),
            source_extension: ".sprig".into(),
        }
    }
}

impl LowerOptions {
    /// Load options from JSON; missing keys keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options = LowerOptions::from_json(r#"{"redefinition": "reject"}"#).unwrap();
        assert_eq!(options.redefinition, RedefinitionPolicy::Reject);
        assert_eq!(options.numeric_access_helper, "__sprig_get_numeric");
        assert_eq!(options.early_return_key, "__sprig_early_return__");
    }

    #[test]
    fn test_kebab_case_keys() {
        let options = LowerOptions::from_json(
            r#"{"source-extension": ".lisp", "numeric-access-helper": "nth"}"#,
        )
        .unwrap();
        assert_eq!(options.source_extension, ".lisp");
        assert_eq!(options.numeric_access_helper, "nth");
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(LowerOptions::from_json(r#"{"redefinition": "merge"}"#).is_err());
    }
}
