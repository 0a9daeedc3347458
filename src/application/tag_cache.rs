use crate::infrastructure::error::InfraError;
use crate::infrastructure::key_value_store::KeyValueStore;
use std::collections::HashSet;
use std::sync::Arc;

pub const RECENT_TAGS_KEY: &str = "recentTags";
pub const MAX_RECENT_TAGS: usize = 10;

/// Locally remembered tags, most recent first, merged with the server's
/// recent-tag list for input suggestions.
pub struct TagCache<S: KeyValueStore> {
    store: Arc<S>,
}

impl<S: KeyValueStore> TagCache<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn remember(&self, tag: &str) -> Result<(), InfraError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Ok(());
        }

        let mut recent = self.recent()?;
        recent.retain(|existing| existing != tag);
        recent.insert(0, tag.to_string());
        recent.truncate(MAX_RECENT_TAGS);

        let encoded = serde_json::to_string(&recent)?;
        self.store.set(RECENT_TAGS_KEY, &encoded)
    }

    /// The local sequence; an unreadable stored value counts as empty.
    pub fn recent(&self) -> Result<Vec<String>, InfraError> {
        let Some(raw) = self.store.get(RECENT_TAGS_KEY)? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_str::<Vec<String>>(&raw).unwrap_or_default())
    }

    pub fn suggestions(&self, server_tags: &[String]) -> Result<Vec<String>, InfraError> {
        Ok(merge_suggestions(&self.recent()?, server_tags))
    }
}

pub fn merge_suggestions(local: &[String], server: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(local.len() + server.len());
    for tag in local.iter().chain(server) {
        if seen.insert(tag.as_str()) {
            merged.push(tag.clone());
        }
    }
    merged
}
