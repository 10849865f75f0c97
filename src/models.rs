use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// On-disk shape of the snippet file: name -> code
pub type SnippetMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub name: String,
    pub code: String,
}

impl Snippet {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }

    /// Single-line preview of the code, cut to `max` characters
    pub fn preview(&self, max: usize) -> String {
        let flat = self.code.replace('\n', " ");
        if flat.chars().count() <= max {
            return flat;
        }
        let keep = max.saturating_sub(3);
        let mut cut: String = flat.chars().take(keep).collect();
        cut.push_str("...");
        cut
    }

    /// Case-insensitive substring match against name or code
    pub fn matches(&self, query_lower: &str) -> bool {
        self.name.to_lowercase().contains(query_lower)
            || self.code.to_lowercase().contains(query_lower)
    }
}
