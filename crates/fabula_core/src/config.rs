//! Engine tuning knobs.
//!
//! Loaded from project settings; every field has a default so partial
//! settings documents deserialize.

use crate::time::duration::HOUR_MS;
use serde::{Deserialize, Serialize};

/// Default orphan-gap threshold, roughly three years.
pub const DEFAULT_ORPHAN_GAP_THRESHOLD_DAYS: i64 = 1095;
/// Default width given to dropped scenes without a duration.
pub const DEFAULT_DROP_DURATION_MS: i64 = 2 * HOUR_MS;
/// Default number of entries shown before committing a reorder.
pub const DEFAULT_REORDER_PREVIEW_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EngineConfig {
    /// Adjacent dated scenes further apart than this raise an orphan gap.
    pub orphan_gap_threshold_days: i64,
    /// Projected duration assigned on drop.
    pub drop_default_duration_ms: i64,
    pub reorder_preview_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            orphan_gap_threshold_days: DEFAULT_ORPHAN_GAP_THRESHOLD_DAYS,
            drop_default_duration_ms: DEFAULT_DROP_DURATION_MS,
            reorder_preview_len: DEFAULT_REORDER_PREVIEW_LEN,
        }
    }
}
