//! Derived views over temporal records.
//!
//! # Responsibility
//! - Paradox warnings, narrative connectors and dependency diagnostics.
//! - The shared story-time comparator used by analysis and reordering.
//!
//! # Invariants
//! - Every function here is pure and only reads the flattened projection.

pub mod connectors;
pub mod dependencies;
pub mod paradox;

use crate::model::scene::TemporalRecord;
use std::cmp::Ordering;

/// Story-time comparator: plain string order on time keys, records without a
/// key last. ISO dates compare correctly; abstract labels are best effort.
pub fn compare_story_time(left: &TemporalRecord, right: &TemporalRecord) -> Ordering {
    match (left.time_key(), right.time_key()) {
        (Some(left), Some(right)) => left.cmp(right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable ascending sort by [`compare_story_time`].
pub fn story_sorted<'a, I>(records: I) -> Vec<&'a TemporalRecord>
where
    I: IntoIterator<Item = &'a TemporalRecord>,
{
    let mut sorted = records.into_iter().collect::<Vec<_>>();
    sorted.sort_by(|left, right| compare_story_time(left, right));
    sorted
}
