use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Script response to an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    /// `"file::label"` to run
    pub response: String,
    /// Suppresses dispatch unless forced
    pub ignore: bool,
}

/// Action name → script response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateTable {
    entries: BTreeMap<String, ActionResponse>,
}

impl StateTable {
    pub fn define(&mut self, action: &str, label: &str) {
        self.entries.insert(
            action.to_string(),
            ActionResponse {
                response: label.to_string(),
                ignore: false,
            },
        );
    }

    pub fn get(&self, action: &str) -> Option<&ActionResponse> {
        self.entries.get(action)
    }

    pub fn contains(&self, action: &str) -> bool {
        self.entries.contains_key(action)
    }

    /// Give `to` the same response as `from`
    pub fn copy(&mut self, from: &str, to: &str) -> bool {
        match self.entries.get(from).cloned() {
            Some(response) => {
                self.entries.insert(to.to_string(), response);
                true
            }
            None => false,
        }
    }

    pub fn enable(&mut self, action: &str) {
        if let Some(entry) = self.entries.get_mut(action) {
            entry.ignore = false;
        }
    }

    pub fn disable(&mut self, action: &str) {
        if let Some(entry) = self.entries.get_mut(action) {
            entry.ignore = true;
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
