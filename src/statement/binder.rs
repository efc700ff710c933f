use std::collections::HashMap;

use crate::translation::PositionalSql;
use crate::types::{ParamKey, RowValues};

/// Ordered slot table for one prepared statement.
///
/// Slots are the distinct marker keys in order of first appearance. Values
/// bound under keys that no marker references are kept but never sent.
#[derive(Debug, Clone, Default)]
pub(crate) struct Binder {
    markers: Vec<ParamKey>,
    slots: Vec<ParamKey>,
    values: HashMap<ParamKey, RowValues>,
}

impl Binder {
    pub(crate) fn new(positional: &PositionalSql<'_>) -> Self {
        Self {
            markers: positional.markers.clone(),
            slots: positional.slots(),
            values: HashMap::new(),
        }
    }

    pub(crate) fn bind(&mut self, key: ParamKey, value: RowValues) {
        if !self.slots.contains(&key) {
            tracing::debug!(?key, "binding value to a key with no marker");
        }
        self.values.insert(key, value);
    }

    pub(crate) fn slots(&self) -> &[ParamKey] {
        &self.slots
    }

    #[cfg(test)]
    pub(crate) fn is_bound(&self, key: &ParamKey) -> bool {
        self.values.contains_key(key)
    }

    /// Values in native marker order; the table is left empty afterwards.
    pub(crate) fn take_positional(&mut self) -> Vec<RowValues> {
        let values = std::mem::take(&mut self.values);
        self.markers
            .iter()
            .map(|key| match values.get(key) {
                Some(value) => value.clone(),
                None => {
                    tracing::debug!(?key, "unbound marker executes as NULL");
                    RowValues::Null
                }
            })
            .collect()
    }
}
