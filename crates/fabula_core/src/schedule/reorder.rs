//! Manuscript reordering by story time.
//!
//! # Responsibility
//! - Derive a reading order from story-time order.
//! - Offer a bounded preview before the caller commits.
//!
//! # Invariants
//! - Output is a permutation of the input: nothing dropped or duplicated.
//! - Assigned records come first, sorted stably by time key; unassigned
//!   records follow in their prior relative order.
//! - Applying the transform to its own output is a no-op.

use crate::analysis::{compare_story_time, story_sorted};
use crate::model::scene::{SceneId, TemporalRecord};
use serde::{Deserialize, Serialize};

/// One row of a reorder preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderPreviewEntry {
    pub id: SceneId,
    pub title: String,
    pub time_key: Option<String>,
}

/// First entries of the proposed order plus summary facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderPreview {
    pub entries: Vec<ReorderPreviewEntry>,
    pub total: usize,
    /// Whether committing would change the current order.
    pub changed: bool,
}

/// Returns records in chronological reading order.
pub fn chronological_order(records: &[TemporalRecord]) -> Vec<&TemporalRecord> {
    let mut ordered = story_sorted(records.iter().filter(|record| record.is_assigned()));
    ordered.extend(records.iter().filter(|record| !record.is_assigned()));
    ordered
}

/// Ids of [`chronological_order`].
pub fn chronological_ids(records: &[TemporalRecord]) -> Vec<SceneId> {
    chronological_order(records)
        .into_iter()
        .map(|record| record.id.clone())
        .collect()
}

/// Consumes records and returns them in [`chronological_order`].
pub fn reorder_records(records: Vec<TemporalRecord>) -> Vec<TemporalRecord> {
    let (mut assigned, unassigned): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|record| record.is_assigned());
    assigned.sort_by(compare_story_time);
    assigned.extend(unassigned);
    assigned
}

/// Builds a preview showing at most `limit` entries.
pub fn preview_reorder(records: &[TemporalRecord], limit: usize) -> ReorderPreview {
    let ordered = chronological_order(records);
    let changed = ordered
        .iter()
        .zip(records.iter())
        .any(|(proposed, current)| proposed.id != current.id);

    ReorderPreview {
        total: ordered.len(),
        changed,
        entries: ordered
            .into_iter()
            .take(limit)
            .map(|record| ReorderPreviewEntry {
                id: record.id.clone(),
                title: record.title.clone(),
                time_key: record.time_key().map(str::to_string),
            })
            .collect(),
    }
}
