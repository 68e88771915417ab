//! Per-target record counts shown after every import.

use std::collections::BTreeMap;

use serde::Serialize;

use super::store::{ImportStore, StoreError};
use super::target::TargetKind;

/// Record count per registered target type.
///
/// Serializes as a flat map: `{"suppliers": 12, "plants": 40, ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatusSnapshot(pub BTreeMap<TargetKind, i64>);

impl StatusSnapshot {
    pub fn get(&self, kind: TargetKind) -> i64 {
        self.0.get(&kind).copied().unwrap_or(0)
    }
}

/// Count the records of every registered target.
pub async fn snapshot(store: &dyn ImportStore) -> Result<StatusSnapshot, StoreError> {
    let mut counts = BTreeMap::new();
    for kind in TargetKind::ALL {
        counts.insert(kind, store.count(kind).await?);
    }
    Ok(StatusSnapshot(counts))
}
