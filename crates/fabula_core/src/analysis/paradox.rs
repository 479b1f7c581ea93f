//! Paradox detection over assigned temporal records.
//!
//! # Responsibility
//! - Flag one character present in two scenes at the same story time.
//! - Flag scenes placed before the scene they depend on.
//! - Flag long unexplained gaps between adjacent dated scenes.
//!
//! # Invariants
//! - Pure function of its inputs; unassigned records are ignored entirely.
//! - Output order: presence, then causality, then gaps; within a pass,
//!   first-seen input order.
//! - O(n log n) in the number of assigned records.

use crate::analysis::story_sorted;
use crate::config::EngineConfig;
use crate::model::scene::{SceneId, TemporalRecord};
use crate::time::calendar::CalendarConfig;
use crate::time::duration::DAY_MS;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DAYS_PER_YEAR: f64 = 365.0;

/// Rule class that produced a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParadoxKind {
    SimultaneousPresence,
    CausalityViolation,
    OrphanGap,
}

/// Derived, never persisted inconsistency between temporal facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParadoxWarning {
    #[serde(rename = "type")]
    pub kind: ParadoxKind,
    pub scene_ids: Vec<SceneId>,
    pub message: String,
}

/// Runs all three rule passes.
pub fn analyze(
    records: &[TemporalRecord],
    calendar: &CalendarConfig,
    config: &EngineConfig,
) -> Vec<ParadoxWarning> {
    let assigned = records
        .iter()
        .filter(|record| record.is_assigned())
        .collect::<Vec<_>>();

    let mut warnings = simultaneous_presence(&assigned);
    warnings.extend(causality_violations(&assigned));
    warnings.extend(orphan_gaps(&assigned, calendar, config));
    warnings
}

fn simultaneous_presence(assigned: &[&TemporalRecord]) -> Vec<ParadoxWarning> {
    // Insertion-ordered grouping: positions index into `buckets`.
    let mut positions: HashMap<(&str, &str), usize> = HashMap::new();
    let mut buckets: Vec<((&str, &str), Vec<&TemporalRecord>)> = Vec::new();

    for &record in assigned {
        let (Some(time_key), Some(character)) =
            (record.time_key(), record.pov_character_id.as_deref())
        else {
            continue;
        };
        let key = (time_key, character);
        match positions.get(&key) {
            Some(position) => buckets[*position].1.push(record),
            None => {
                positions.insert(key, buckets.len());
                buckets.push((key, vec![record]));
            }
        }
    }

    buckets
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|((time_key, character), members)| ParadoxWarning {
            kind: ParadoxKind::SimultaneousPresence,
            message: format!(
                "Character `{character}` appears in {} scenes at {time_key}",
                members.len()
            ),
            scene_ids: members.iter().map(|record| record.id.clone()).collect(),
        })
        .collect()
}

fn causality_violations(assigned: &[&TemporalRecord]) -> Vec<ParadoxWarning> {
    let by_id: HashMap<&str, &TemporalRecord> = assigned
        .iter()
        .map(|record| (record.id.as_str(), *record))
        .collect();

    let mut warnings = Vec::new();
    for &dependent in assigned {
        let Some(cause) = dependent
            .depends_on
            .as_deref()
            .filter(|cause_id| *cause_id != dependent.id)
            .and_then(|cause_id| by_id.get(cause_id))
        else {
            continue;
        };
        let (Some(effect_key), Some(cause_key)) = (dependent.time_key(), cause.time_key()) else {
            continue;
        };
        if effect_key < cause_key {
            warnings.push(ParadoxWarning {
                kind: ParadoxKind::CausalityViolation,
                scene_ids: vec![cause.id.clone(), dependent.id.clone()],
                message: format!(
                    "\"{}\" depends on \"{}\" but takes place before it ({effect_key} < {cause_key})",
                    dependent.title, cause.title
                ),
            });
        }
    }
    warnings
}

fn orphan_gaps(
    assigned: &[&TemporalRecord],
    calendar: &CalendarConfig,
    config: &EngineConfig,
) -> Vec<ParadoxWarning> {
    let sorted = story_sorted(assigned.iter().copied());
    let threshold_days = config.orphan_gap_threshold_days as f64;

    let mut warnings = Vec::new();
    for pair in sorted.windows(2) {
        let (earlier, later) = (pair[0], pair[1]);
        let (Some(earlier_date), Some(later_date)) = (
            earlier.chronological_date.as_deref(),
            later.chronological_date.as_deref(),
        ) else {
            continue;
        };
        let (Some(earlier_ms), Some(later_ms)) = (
            calendar.parse_instant(earlier_date),
            calendar.parse_instant(later_date),
        ) else {
            continue;
        };

        let gap_days = later_ms.abs_diff(earlier_ms) as f64 / DAY_MS as f64;
        if gap_days > threshold_days {
            let years = (gap_days / DAYS_PER_YEAR).floor() as i64;
            warnings.push(ParadoxWarning {
                kind: ParadoxKind::OrphanGap,
                scene_ids: vec![earlier.id.clone(), later.id.clone()],
                message: format!(
                    "About {years} years pass between \"{}\" and \"{}\" with no scenes in between",
                    earlier.title, later.title
                ),
            });
        }
    }
    warnings
}
