//! Temporal record model.
//!
//! # Responsibility
//! - Project manuscript scenes onto the fields story-time reasoning needs.
//! - Apply partial temporal edits with keep/clear/set semantics.
//!
//! # Invariants
//! - A record is assigned iff it has a chronological date or an abstract
//!   timeframe.
//! - Blank text fields are stored as `None`.
//! - Durations are `>= 0` once parsed.
//! - Projection never drops or duplicates a scene.

use crate::model::plotline::PlotlineId;
use crate::time::duration::{format_duration, parse_duration};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Stable scene identifier owned by the manuscript tree.
pub type SceneId = String;

/// Character identifier owned by the character sheets.
pub type CharacterId = String;

/// Where a record's duration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationSource {
    /// Entered or adjusted by the user; persisted.
    Explicit,
    /// Display default assigned on drop; never persisted.
    Projected,
}

/// Canonical duration plus provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneDuration {
    pub ms: i64,
    pub source: DurationSource,
}

impl SceneDuration {
    pub fn explicit(ms: i64) -> Self {
        Self {
            ms: ms.max(0),
            source: DurationSource::Explicit,
        }
    }

    pub fn projected(ms: i64) -> Self {
        Self {
            ms: ms.max(0),
            source: DurationSource::Projected,
        }
    }

    pub fn is_projected(&self) -> bool {
        self.source == DurationSource::Projected
    }
}

/// Per-scene projection consumed by the timeline engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalRecord {
    pub id: SceneId,
    pub title: String,
    /// Absolute story instant, ISO-like under the active calendar.
    pub chronological_date: Option<String>,
    /// Comparable fallback label ("Day 3") when no absolute date exists.
    pub abstract_timeframe: Option<String>,
    pub duration: Option<SceneDuration>,
    /// Lane reference; `None` is the default lane.
    pub plotline_tag: Option<PlotlineId>,
    /// Single causal predecessor.
    pub depends_on: Option<SceneId>,
    pub pov_character_id: Option<CharacterId>,
}

impl TemporalRecord {
    pub fn new(id: impl Into<SceneId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            chronological_date: None,
            abstract_timeframe: None,
            duration: None,
            plotline_tag: None,
            depends_on: None,
            pov_character_id: None,
        }
    }

    /// Story-time sort key: the chronological date, else the abstract label.
    pub fn time_key(&self) -> Option<&str> {
        self.chronological_date
            .as_deref()
            .or(self.abstract_timeframe.as_deref())
    }

    /// Whether the record has any story-time position.
    pub fn is_assigned(&self) -> bool {
        self.time_key().is_some()
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.duration.map(|duration| duration.ms)
    }

    /// Duration the user actually declared, ignoring display defaults.
    pub fn explicit_duration_ms(&self) -> Option<i64> {
        self.duration
            .filter(|duration| !duration.is_projected())
            .map(|duration| duration.ms)
    }

    /// Applies a partial update. Blank strings clear the field.
    ///
    /// Durations go through the duration text form first so memory holds the
    /// same ms a store reload would produce; a zero duration is absent.
    pub fn apply_update(&mut self, update: &TemporalFieldsUpdate) {
        apply_text(&mut self.chronological_date, &update.chronological_date);
        apply_text(&mut self.abstract_timeframe, &update.abstract_timeframe);
        apply_text(&mut self.plotline_tag, &update.plotline_tag);
        apply_text(&mut self.depends_on, &update.depends_on);
        apply_text(&mut self.pov_character_id, &update.pov_character_id);
        if let Some(duration) = update.duration_ms {
            self.duration = duration
                .map(canonical_duration_ms)
                .filter(|ms| *ms > 0)
                .map(SceneDuration::explicit);
        }
    }
}

/// Partial temporal edit.
///
/// Each field: `None` keeps the current value, `Some(None)` clears it,
/// `Some(Some(v))` sets it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalFieldsUpdate {
    pub chronological_date: Option<Option<String>>,
    pub abstract_timeframe: Option<Option<String>>,
    pub duration_ms: Option<Option<i64>>,
    pub plotline_tag: Option<Option<PlotlineId>>,
    pub depends_on: Option<Option<SceneId>>,
    pub pov_character_id: Option<Option<CharacterId>>,
}

impl TemporalFieldsUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn set_chronological_date(mut self, value: impl Into<String>) -> Self {
        self.chronological_date = Some(Some(value.into()));
        self
    }

    pub fn set_abstract_timeframe(mut self, value: impl Into<String>) -> Self {
        self.abstract_timeframe = Some(Some(value.into()));
        self
    }

    pub fn set_duration_ms(mut self, value: i64) -> Self {
        self.duration_ms = Some(Some(value.max(0)));
        self
    }

    pub fn set_plotline_tag(mut self, value: impl Into<PlotlineId>) -> Self {
        self.plotline_tag = Some(Some(value.into()));
        self
    }

    pub fn set_depends_on(mut self, value: impl Into<SceneId>) -> Self {
        self.depends_on = Some(Some(value.into()));
        self
    }

    pub fn set_pov_character_id(mut self, value: impl Into<CharacterId>) -> Self {
        self.pov_character_id = Some(Some(value.into()));
        self
    }

    /// Target of the `depends_on` edit when it sets a value.
    pub fn new_dependency(&self) -> Option<&str> {
        match &self.depends_on {
            Some(Some(target)) if !target.trim().is_empty() => Some(target.trim()),
            _ => None,
        }
    }
}

fn apply_text(field: &mut Option<String>, patch: &Option<Option<String>>) {
    if let Some(value) = patch {
        *field = value.as_deref().and_then(normalize_text);
    }
}

fn normalize_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Manuscript entry as supplied by the project manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ManuscriptScene {
    pub id: SceneId,
    #[serde(default)]
    pub parent_id: Option<SceneId>,
    pub title: String,
    #[serde(default)]
    pub word_count: u32,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub chronological_date: Option<String>,
    #[serde(default)]
    pub abstract_timeframe: Option<String>,
    /// Free-form duration text ("2 hours").
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub plotline_tag: Option<PlotlineId>,
    #[serde(default)]
    pub depends_on: Option<SceneId>,
    #[serde(default)]
    pub pov_character_id: Option<CharacterId>,
}

impl ManuscriptScene {
    pub fn new(id: impl Into<SceneId>, title: impl Into<String>, order: u32) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            title: title.into(),
            word_count: 0,
            order,
            chronological_date: None,
            abstract_timeframe: None,
            duration: None,
            plotline_tag: None,
            depends_on: None,
            pov_character_id: None,
        }
    }

    /// Projects temporal fields; duration text is canonicalized to ms.
    pub fn to_record(&self) -> TemporalRecord {
        TemporalRecord {
            id: self.id.clone(),
            title: self.title.clone(),
            chronological_date: self.chronological_date.as_deref().and_then(normalize_text),
            abstract_timeframe: self.abstract_timeframe.as_deref().and_then(normalize_text),
            duration: self
                .duration
                .as_deref()
                .and_then(normalize_text)
                .map(|text| parse_duration(&text))
                .filter(|ms| *ms > 0)
                .map(SceneDuration::explicit),
            plotline_tag: self.plotline_tag.as_deref().and_then(normalize_text),
            depends_on: self.depends_on.as_deref().and_then(normalize_text),
            pov_character_id: self.pov_character_id.as_deref().and_then(normalize_text),
        }
    }
}

fn canonical_duration_ms(ms: i64) -> i64 {
    parse_duration(&format_duration(ms))
}

/// Flattens a manuscript into reading order.
///
/// When every `order` is distinct the manuscript is already flat: scenes are
/// read in `order`, whatever their parents. This is the shape a committed
/// chronological reorder leaves behind.
///
/// Otherwise `order` is read per parent. Siblings are ordered by
/// `(order, input position)` and visited depth-first. Scenes whose parent is
/// missing are treated as roots; scenes unreachable because of parent cycles
/// are appended in input order.
pub fn project_manuscript(scenes: &[ManuscriptScene]) -> Vec<TemporalRecord> {
    let mut seen_orders = HashSet::with_capacity(scenes.len());
    if scenes.iter().all(|scene| seen_orders.insert(scene.order)) {
        let mut flat = scenes.iter().collect::<Vec<_>>();
        flat.sort_by_key(|scene| scene.order);
        return flat.into_iter().map(ManuscriptScene::to_record).collect();
    }

    let known: HashSet<&str> = scenes.iter().map(|scene| scene.id.as_str()).collect();
    let mut children: HashMap<Option<&str>, Vec<usize>> = HashMap::new();
    for (index, scene) in scenes.iter().enumerate() {
        let parent = scene
            .parent_id
            .as_deref()
            .filter(|parent| known.contains(parent) && *parent != scene.id);
        children.entry(parent).or_default().push(index);
    }
    for siblings in children.values_mut() {
        siblings.sort_by_key(|index| (scenes[*index].order, *index));
    }

    let mut visited = vec![false; scenes.len()];
    let mut flattened = Vec::with_capacity(scenes.len());
    let mut stack: Vec<usize> = children
        .get(&None)
        .map(|roots| roots.iter().rev().copied().collect())
        .unwrap_or_default();

    while let Some(index) = stack.pop() {
        if visited[index] {
            continue;
        }
        visited[index] = true;
        flattened.push(scenes[index].to_record());
        if let Some(kids) = children.get(&Some(scenes[index].id.as_str())) {
            stack.extend(kids.iter().rev().copied());
        }
    }

    for (index, scene) in scenes.iter().enumerate() {
        if !visited[index] {
            visited[index] = true;
            flattened.push(scene.to_record());
        }
    }

    flattened
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::duration::HOUR_MS;

    fn scene(id: &str, parent: Option<&str>, order: u32) -> ManuscriptScene {
        let mut scene = ManuscriptScene::new(id, id.to_uppercase(), order);
        scene.parent_id = parent.map(str::to_string);
        scene
    }

    #[test]
    fn time_key_prefers_chronological_date() {
        let mut record = TemporalRecord::new("s1", "Opening");
        assert!(!record.is_assigned());

        record.abstract_timeframe = Some("Day 3".to_string());
        assert_eq!(record.time_key(), Some("Day 3"));

        record.chronological_date = Some("2024-01-01".to_string());
        assert_eq!(record.time_key(), Some("2024-01-01"));
        assert!(record.is_assigned());
    }

    #[test]
    fn apply_update_keeps_clears_and_sets() {
        let mut record = TemporalRecord::new("s1", "Opening");
        record.pov_character_id = Some("alice".to_string());
        record.abstract_timeframe = Some("Day 1".to_string());

        let update = TemporalFieldsUpdate {
            abstract_timeframe: Some(None),
            chronological_date: Some(Some("  2024-02-01 ".to_string())),
            plotline_tag: Some(Some("   ".to_string())),
            ..TemporalFieldsUpdate::default()
        }
        .set_duration_ms(2 * HOUR_MS);
        record.apply_update(&update);

        assert_eq!(record.chronological_date.as_deref(), Some("2024-02-01"));
        assert_eq!(record.abstract_timeframe, None);
        assert_eq!(record.plotline_tag, None);
        assert_eq!(record.pov_character_id.as_deref(), Some("alice"));
        assert_eq!(record.explicit_duration_ms(), Some(2 * HOUR_MS));
    }

    #[test]
    fn projected_duration_is_not_explicit() {
        let mut record = TemporalRecord::new("s1", "Opening");
        record.duration = Some(SceneDuration::projected(HOUR_MS));
        assert_eq!(record.duration_ms(), Some(HOUR_MS));
        assert_eq!(record.explicit_duration_ms(), None);
    }

    #[test]
    fn projection_flattens_tree_depth_first_by_order() {
        let scenes = vec![
            scene("ch2", None, 1),
            scene("s2b", Some("ch1"), 1),
            scene("ch1", None, 0),
            scene("s2a", Some("ch1"), 0),
            scene("s3", Some("ch2"), 0),
            scene("stray", Some("missing"), 5),
        ];

        let ids: Vec<SceneId> = project_manuscript(&scenes)
            .into_iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec!["ch1", "s2a", "s2b", "ch2", "s3", "stray"]);
    }

    #[test]
    fn projection_reads_distinct_orders_as_flat_manuscript() {
        let scenes = vec![
            scene("ch1", None, 2),
            scene("s1", Some("ch1"), 1),
            scene("ch2", None, 3),
            scene("s2", Some("ch2"), 0),
        ];

        let ids: Vec<SceneId> = project_manuscript(&scenes)
            .into_iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec!["s2", "s1", "ch1", "ch2"]);
    }

    #[test]
    fn projection_keeps_scenes_caught_in_parent_cycles() {
        let scenes = vec![scene("a", Some("b"), 0), scene("b", Some("a"), 0)];
        let records = project_manuscript(&scenes);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn applied_durations_match_their_stored_text() {
        let mut record = TemporalRecord::new("s1", "Opening");
        record.apply_update(&TemporalFieldsUpdate::default().set_duration_ms(90_500));
        assert_eq!(record.explicit_duration_ms(), Some(120_000));
        assert_eq!(record.explicit_duration_ms(), Some(parse_duration("2 minutes")));

        record.apply_update(&TemporalFieldsUpdate::default().set_duration_ms(0));
        assert_eq!(record.duration, None);

        record.apply_update(&TemporalFieldsUpdate::default().set_duration_ms(-5));
        assert_eq!(record.duration, None);
    }

    #[test]
    fn projection_drops_duration_text_without_a_unit() {
        let mut entry = scene("s1", None, 0);
        entry.duration = Some("a while".to_string());
        assert_eq!(entry.to_record().duration, None);
    }

    #[test]
    fn projection_parses_duration_text_and_blank_fields() {
        let mut entry = scene("s1", None, 0);
        entry.duration = Some("3 hours".to_string());
        entry.chronological_date = Some(String::new());
        entry.abstract_timeframe = Some("Day 2".to_string());

        let record = entry.to_record();
        assert_eq!(record.explicit_duration_ms(), Some(3 * HOUR_MS));
        assert_eq!(record.chronological_date, None);
        assert_eq!(record.time_key(), Some("Day 2"));
    }
}
