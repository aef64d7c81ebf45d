use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const SELECTED_TAG: &str = "selected_tag";
pub const SELECTED_COMPANY: &str = "selected_company";

/// Resolves a remembered pick against the current candidates.
///
/// `candidates` must be sorted by descending frequency; the first one is the
/// fallback when `held` is absent or no longer offered.
pub fn reconcile(held: Option<&str>, candidates: &[String]) -> Option<String> {
    let first = candidates.first()?;
    match held {
        Some(value) if candidates.iter().any(|c| c == value) => Some(value.to_string()),
        _ => Some(first.clone()),
    }
}

/// Remembered widget picks, keyed by logical widget name.
///
/// Loaded before a render pass, handed to it by `&mut`, written back after.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    values: BTreeMap<String, String>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        SelectionState {
            values: pairs.into_iter().collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Records an explicit operator pick. It still goes through `resolve`.
    pub fn pick(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Reconciles the held value for `key` and stores the outcome.
    /// With no candidates nothing is resolved and the held value is left as is.
    pub fn resolve(&mut self, key: &str, candidates: &[String]) -> Option<String> {
        let resolved = reconcile(self.get(key), candidates)?;
        if self.get(key) != Some(resolved.as_str()) {
            log::debug!("Selection {} -> {}", key, resolved);
            self.values.insert(key.to_string(), resolved.clone());
        }
        Some(resolved)
    }
}
