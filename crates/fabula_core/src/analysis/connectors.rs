//! Reading-order vs story-order connectors.

use crate::model::scene::{SceneId, TemporalRecord};
use serde::{Deserialize, Serialize};

/// Pair of consecutive assigned scenes in manuscript order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeConnector {
    pub from: SceneId,
    pub to: SceneId,
    /// The reader jumps backwards in story time.
    pub is_flashback: bool,
}

/// Pairs each assigned scene with its next assigned scene in reading order.
///
/// Informational only; flashbacks are not warnings.
pub fn narrative_connectors(records: &[TemporalRecord]) -> Vec<NarrativeConnector> {
    let assigned = records
        .iter()
        .filter_map(|record| record.time_key().map(|key| (record, key)))
        .collect::<Vec<_>>();

    assigned
        .windows(2)
        .map(|pair| {
            let ((from, from_key), (to, to_key)) = (pair[0], pair[1]);
            NarrativeConnector {
                from: from.id.clone(),
                to: to.id.clone(),
                is_flashback: to_key < from_key,
            }
        })
        .collect()
}
