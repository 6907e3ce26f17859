//! Write-once flags attached to frames.
//!
//! Handlers mark a frame under a namespace so later handlers can see it was
//! already claimed. A flag can never be overwritten or removed.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// FlagStore
// ============================================================================

/// Namespaced write-once marker store.
#[derive(Debug, Clone, Default)]
pub struct FlagStore {
    namespaces: FxHashMap<String, FxHashMap<String, Option<Value>>>,
}

impl FlagStore {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `namespace/name` with an optional value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateFlag`] if the flag already exists.
    pub fn mark(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: Option<Value>,
    ) -> Result<()> {
        let namespace = namespace.into();
        let name = name.into();
        let flags = self.namespaces.entry(namespace.clone()).or_default();

        if flags.contains_key(&name) {
            return Err(Error::duplicate_flag(namespace, name));
        }
        flags.insert(name, value);
        Ok(())
    }

    /// Returns `true` if `namespace/name` exists and holds `expected`.
    ///
    /// `None` matches only flags marked without a value.
    #[must_use]
    pub fn has_flag(&self, namespace: &str, name: &str, expected: Option<&Value>) -> bool {
        self.namespaces
            .get(namespace)
            .and_then(|flags| flags.get(name))
            .is_some_and(|value| value.as_ref() == expected)
    }

    /// Returns `true` if no flag was ever marked.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespaces.values().all(FxHashMap::is_empty)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_mark_then_check() {
        let mut flags = FlagStore::new();
        assert!(flags.is_empty());

        flags.mark("session", "claimed", None).unwrap();
        assert!(flags.has_flag("session", "claimed", None));
        assert!(!flags.has_flag("session", "claimed", Some(&json!(1))));
        assert!(!flags.has_flag("session", "other", None));
        assert!(!flags.has_flag("other", "claimed", None));
    }

    #[test]
    fn test_value_comparison() {
        let mut flags = FlagStore::new();
        flags.mark("plugin", "owner", Some(json!("echo"))).unwrap();

        assert!(flags.has_flag("plugin", "owner", Some(&json!("echo"))));
        assert!(!flags.has_flag("plugin", "owner", Some(&json!("weather"))));
        assert!(!flags.has_flag("plugin", "owner", None));
    }

    #[test]
    fn test_duplicate_mark_fails() {
        let mut flags = FlagStore::new();
        flags.mark("plugin", "owner", Some(json!("echo"))).unwrap();

        let err = flags.mark("plugin", "owner", None).unwrap_err();
        assert!(matches!(err, Error::DuplicateFlag { .. }));
        // The first value survives.
        assert!(flags.has_flag("plugin", "owner", Some(&json!("echo"))));
    }

    #[test]
    fn test_same_name_in_other_namespace_is_independent() {
        let mut flags = FlagStore::new();
        flags.mark("a", "seen", None).unwrap();
        flags.mark("b", "seen", None).unwrap();
        assert!(flags.has_flag("a", "seen", None));
        assert!(flags.has_flag("b", "seen", None));
    }
}
