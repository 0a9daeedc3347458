use crate::domain::models::{Preset, PresetId};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::key_value_store::KeyValueStore;
use std::sync::Arc;

pub const SELECTED_PRESET_KEY: &str = "selectedPreset";

pub struct PresetSelector<S: KeyValueStore> {
    store: Arc<S>,
}

impl<S: KeyValueStore> PresetSelector<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn select(&self, id: PresetId) -> Result<(), InfraError> {
        let encoded = serde_json::to_string(&id)?;
        self.store.set(SELECTED_PRESET_KEY, &encoded)
    }

    /// Missing, unknown, or unreadable selections fall back to the default.
    pub fn current_id(&self) -> PresetId {
        self.store
            .get(SELECTED_PRESET_KEY)
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str::<PresetId>(&raw).ok())
            .unwrap_or_default()
    }

    pub fn current(&self) -> Preset {
        self.current_id().preset()
    }
}
