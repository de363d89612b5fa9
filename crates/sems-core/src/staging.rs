//! Accumulates each visited step's raw values and transformed payload.

use std::collections::BTreeMap;

use tracing::warn;

use crate::definition::StepName;
use crate::field_store::FieldStore;
use crate::transform::PayloadFragment;

#[derive(Debug, Clone, PartialEq)]
pub struct StagingStore<S: StepName> {
    raw: BTreeMap<S, FieldStore>,
    payloads: BTreeMap<S, PayloadFragment>,
}

impl<S: StepName> Default for StagingStore<S> {
    fn default() -> Self {
        Self {
            raw: BTreeMap::new(),
            payloads: BTreeMap::new(),
        }
    }
}

impl<S: StepName> StagingStore<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a step's raw values and payload, replacing any earlier entry.
    pub fn write(&mut self, step: S, raw: FieldStore, payload: PayloadFragment) {
        self.raw.insert(step, raw);
        self.payloads.insert(step, payload);
    }

    pub fn read_raw(&self, step: S) -> Option<&FieldStore> {
        self.raw.get(&step)
    }

    pub fn payload(&self, step: S) -> Option<&PayloadFragment> {
        self.payloads.get(&step)
    }

    pub fn contains(&self, step: S) -> bool {
        self.payloads.contains_key(&step)
    }

    pub fn staged_steps(&self) -> impl Iterator<Item = S> + '_ {
        self.payloads.keys().copied()
    }

    /// Flattens every fragment into one object in step order. A key written
    /// by a later step replaces the earlier value; each such collision is
    /// logged.
    pub fn union_payloads(&self) -> PayloadFragment {
        let mut merged = PayloadFragment::new();
        let mut owners: BTreeMap<&str, S> = BTreeMap::new();
        for (step, fragment) in &self.payloads {
            for (key, value) in fragment {
                if let Some(previous) = owners.insert(key.as_str(), *step) {
                    warn!(
                        key = key.as_str(),
                        earlier = %previous,
                        later = %step,
                        "payload key written by more than one step; keeping the later value"
                    );
                }
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    pub fn clear(&mut self) {
        self.raw.clear();
        self.payloads.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_store::FieldValue;
    use serde_json::json;

    fn fragment(value: serde_json::Value) -> PayloadFragment {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn write_overwrites_instead_of_merging() {
        let mut staging = StagingStore::new();
        staging.write(
            1u8,
            FieldStore::new().with("a", FieldValue::text("1")),
            fragment(json!({"a": 1, "b": 2})),
        );
        staging.write(1u8, FieldStore::new(), fragment(json!({"a": 3})));

        assert_eq!(staging.payload(1), Some(&fragment(json!({"a": 3}))));
        assert!(staging.read_raw(1).unwrap().is_empty());
    }

    #[test]
    fn union_keeps_every_fragment_and_last_write_wins() {
        let mut staging = StagingStore::new();
        staging.write(2u8, FieldStore::new(), fragment(json!({"shared": "late", "b": 2})));
        staging.write(1u8, FieldStore::new(), fragment(json!({"shared": "early", "a": 1})));

        let merged = staging.union_payloads();
        assert_eq!(merged.get("a"), Some(&json!(1)));
        assert_eq!(merged.get("b"), Some(&json!(2)));
        assert_eq!(merged.get("shared"), Some(&json!("late")));
    }

    #[test]
    fn clear_discards_both_maps() {
        let mut staging = StagingStore::new();
        staging.write(1u8, FieldStore::new(), fragment(json!({"a": 1})));
        staging.clear();
        assert!(staging.is_empty());
        assert!(staging.read_raw(1).is_none());
    }
}
