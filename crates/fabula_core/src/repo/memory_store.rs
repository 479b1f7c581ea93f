//! In-process temporal store.
//!
//! Backs previews, scratch projects and tests. Clones share one state, so a
//! test can keep a handle while the engine owns another.

use crate::model::plotline::Plotline;
use crate::model::scene::{ManuscriptScene, SceneId, TemporalFieldsUpdate};
use crate::repo::temporal_store::{ProjectSnapshot, StoreError, StoreResult, TemporalStore};
use crate::time::calendar::CalendarConfig;
use crate::time::duration::format_duration;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    snapshot: ProjectSnapshot,
    failure: Option<String>,
    writes: usize,
}

/// Shared in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemporalStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTemporalStore {
    pub fn new(snapshot: ProjectSnapshot) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                snapshot,
                failure: None,
                writes: 0,
            })),
        }
    }

    /// Makes every following write fail with `message`; `None` restores
    /// normal behavior.
    pub fn set_failure(&self, message: Option<&str>) {
        self.lock().failure = message.map(str::to_string);
    }

    /// Current stored state.
    pub fn snapshot(&self) -> ProjectSnapshot {
        self.lock().snapshot.clone()
    }

    /// Stored scene by id.
    pub fn scene(&self, scene_id: &str) -> Option<ManuscriptScene> {
        self.lock()
            .snapshot
            .scenes
            .iter()
            .find(|scene| scene.id == scene_id)
            .cloned()
    }

    /// Number of writes accepted so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write<T>(
        &self,
        apply: impl FnOnce(&mut ProjectSnapshot) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut state = self.lock();
        if let Some(message) = &state.failure {
            return Err(StoreError::Unavailable(message.clone()));
        }
        let value = apply(&mut state.snapshot)?;
        state.writes += 1;
        Ok(value)
    }
}

impl TemporalStore for MemoryTemporalStore {
    fn load_project(&self) -> StoreResult<ProjectSnapshot> {
        Ok(self.snapshot())
    }

    fn update_temporal_fields(
        &self,
        scene_id: &str,
        update: &TemporalFieldsUpdate,
    ) -> StoreResult<()> {
        self.write(|snapshot| {
            let scene = snapshot
                .scenes
                .iter_mut()
                .find(|scene| scene.id == scene_id)
                .ok_or_else(|| StoreError::SceneNotFound(scene_id.to_string()))?;

            patch_text(&mut scene.chronological_date, &update.chronological_date);
            patch_text(&mut scene.abstract_timeframe, &update.abstract_timeframe);
            patch_text(&mut scene.plotline_tag, &update.plotline_tag);
            patch_text(&mut scene.depends_on, &update.depends_on);
            patch_text(&mut scene.pov_character_id, &update.pov_character_id);
            if let Some(duration_ms) = update.duration_ms {
                let text = duration_ms.map(format_duration).unwrap_or_default();
                scene.duration = Some(text).filter(|text| !text.is_empty());
            }
            Ok(())
        })
    }

    fn replace_manuscript_order(&self, order: &[SceneId]) -> StoreResult<()> {
        self.write(|snapshot| {
            let mut reordered = Vec::with_capacity(snapshot.scenes.len());
            for (index, scene_id) in order.iter().enumerate() {
                let mut scene = snapshot
                    .scenes
                    .iter()
                    .find(|scene| &scene.id == scene_id)
                    .cloned()
                    .ok_or_else(|| StoreError::SceneNotFound(scene_id.clone()))?;
                scene.order = u32::try_from(index).unwrap_or(u32::MAX);
                reordered.push(scene);
            }
            // Scenes missing from `order` keep their place after the listed ones.
            for scene in &snapshot.scenes {
                if !order.contains(&scene.id) {
                    reordered.push(scene.clone());
                }
            }
            snapshot.scenes = reordered;
            Ok(())
        })
    }

    fn save_plotlines(&self, plotlines: &[Plotline]) -> StoreResult<()> {
        self.write(|snapshot| {
            snapshot.plotlines = plotlines.to_vec();
            Ok(())
        })
    }

    fn save_calendar_config(&self, config: &CalendarConfig) -> StoreResult<()> {
        self.write(|snapshot| {
            snapshot.calendar = config.clone();
            Ok(())
        })
    }
}

fn patch_text(field: &mut Option<String>, patch: &Option<Option<String>>) {
    if let Some(value) = patch {
        *field = value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::duration::HOUR_MS;

    fn store() -> MemoryTemporalStore {
        MemoryTemporalStore::new(ProjectSnapshot {
            scenes: vec![
                ManuscriptScene::new("a", "A", 0),
                ManuscriptScene::new("b", "B", 1),
            ],
            plotlines: vec![Plotline::main()],
            calendar: CalendarConfig::default(),
        })
    }

    #[test]
    fn clones_share_state() {
        let store = store();
        let handle = store.clone();
        store
            .update_temporal_fields(
                "a",
                &TemporalFieldsUpdate::default().set_duration_ms(2 * HOUR_MS),
            )
            .unwrap();
        assert_eq!(
            handle.scene("a").unwrap().duration.as_deref(),
            Some("2 hours")
        );
        assert_eq!(handle.write_count(), 1);
    }

    #[test]
    fn injected_failure_rejects_writes_without_changes() {
        let store = store();
        store.set_failure(Some("disk full"));
        let err = store
            .replace_manuscript_order(&["b".to_string(), "a".to_string()])
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(ref message) if message == "disk full"));
        assert_eq!(store.snapshot().scenes[0].id, "a");
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn reorder_rejects_unknown_scene() {
        let store = store();
        let err = store
            .replace_manuscript_order(&["ghost".to_string()])
            .unwrap_err();
        assert!(matches!(err, StoreError::SceneNotFound(ref id) if id == "ghost"));
        assert_eq!(store.snapshot().scenes.len(), 2);
    }
}
