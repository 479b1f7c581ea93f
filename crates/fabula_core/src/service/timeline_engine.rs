//! Timeline engine for one open project.
//!
//! # Responsibility
//! - Own the temporal projection, plotlines and active calendar of a project.
//! - Keep derived views (paradox warnings, narrative connectors) current.
//! - Route every mutation through the store and surface write failures.
//!
//! # Invariants
//! - Derived views are recomputed synchronously before a mutating call
//!   returns; readers never observe stale warnings.
//! - Writes are optimistic: in-memory state is applied first, a store
//!   failure is reported once (`EngineError::Persist`, per-record write
//!   state, status channel) and never retried here.
//! - `depends_on` edits that would close a cycle are rejected before any
//!   state changes.
//! - Calendar swaps replace system, epoch and months together.
//! - Projected durations never reach the store.
//! - A review flag lasts until acknowledged or until the record's
//!   chronological date is edited.

use crate::analysis::connectors::{narrative_connectors, NarrativeConnector};
use crate::analysis::dependencies::{find_dependency_cycles, would_create_cycle};
use crate::analysis::paradox::{analyze, ParadoxWarning};
use crate::config::EngineConfig;
use crate::model::plotline::{Plotline, PlotlineDeleteMode, PlotlineId};
use crate::model::scene::{
    project_manuscript, SceneDuration, SceneId, TemporalFieldsUpdate, TemporalRecord,
};
use crate::repo::temporal_store::{ProjectSnapshot, StoreError, TemporalStore};
use crate::schedule::adapter::{plan_drop, plan_move, DropRequest, MoveRequest};
use crate::schedule::reorder::{chronological_order, preview_reorder, reorder_records, ReorderPreview};
use crate::time::calendar::{CalendarConfig, CalendarSystem, MonthConfig};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error for temporal use-cases.
#[derive(Debug)]
pub enum EngineError {
    /// Target scene is not part of the project.
    SceneNotFound(SceneId),
    /// Target plotline is not part of the project.
    PlotlineNotFound(PlotlineId),
    /// Plotline names must contain non-whitespace text.
    InvalidPlotlineName(String),
    /// A scene cannot depend on itself.
    SelfDependency(SceneId),
    /// The edit would close a `depends_on` cycle.
    DependencyCycle {
        scene_id: SceneId,
        depends_on: SceneId,
    },
    /// Initial project load failed.
    Load(StoreError),
    /// In-memory state changed but the store rejected the write.
    Persist {
        scene_id: Option<SceneId>,
        source: StoreError,
    },
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SceneNotFound(id) => write!(f, "scene not found: {id}"),
            Self::PlotlineNotFound(id) => write!(f, "plotline not found: {id}"),
            Self::InvalidPlotlineName(name) => write!(f, "invalid plotline name: `{name}`"),
            Self::SelfDependency(id) => write!(f, "scene {id} cannot depend on itself"),
            Self::DependencyCycle {
                scene_id,
                depends_on,
            } => write!(
                f,
                "scene {scene_id} cannot depend on {depends_on}: dependency cycle"
            ),
            Self::Load(err) => write!(f, "failed to load project: {err}"),
            Self::Persist {
                scene_id: Some(id),
                source,
            } => write!(f, "failed to save scene {id}: {source}"),
            Self::Persist {
                scene_id: None,
                source,
            } => write!(f, "failed to save project: {source}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) => Some(err),
            Self::Persist { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Persistence state of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteState {
    Synced,
    /// Last write failed; in-memory state is ahead of the store.
    Failed(String),
}

/// User-facing status line produced by a failed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub scene_id: Option<SceneId>,
    pub message: String,
}

/// Temporal state and derived views for one open project.
pub struct TimelineEngine<S: TemporalStore> {
    store: S,
    config: EngineConfig,
    records: Vec<TemporalRecord>,
    plotlines: Vec<Plotline>,
    calendar: CalendarConfig,
    warnings: Vec<ParadoxWarning>,
    connectors: Vec<NarrativeConnector>,
    needs_review: HashSet<SceneId>,
    failed_writes: HashMap<SceneId, String>,
    status: Vec<StatusMessage>,
}

impl<S: TemporalStore> TimelineEngine<S> {
    /// Builds an engine from an already loaded snapshot.
    pub fn new(store: S, snapshot: ProjectSnapshot, config: EngineConfig) -> Self {
        let records = project_manuscript(&snapshot.scenes);
        let cycles = find_dependency_cycles(&records);
        if !cycles.is_empty() {
            warn!(
                "event=dependency_cycles module=engine status=error cycles={}",
                cycles.len()
            );
        }
        info!(
            "event=engine_open module=engine status=ok scenes={} plotlines={} calendar={}",
            records.len(),
            snapshot.plotlines.len(),
            snapshot.calendar.system.as_str()
        );

        let mut engine = Self {
            store,
            config,
            records,
            plotlines: snapshot.plotlines,
            calendar: snapshot.calendar,
            warnings: Vec::new(),
            connectors: Vec::new(),
            needs_review: HashSet::new(),
            failed_writes: HashMap::new(),
            status: Vec::new(),
        };
        engine.recompute();
        engine
    }

    /// Loads the project from `store` and builds an engine over it.
    ///
    /// # Errors
    /// - Returns `EngineError::Load` when the snapshot cannot be read.
    pub fn from_store(store: S, config: EngineConfig) -> EngineResult<Self> {
        let snapshot = store.load_project().map_err(|err| {
            warn!("event=engine_open module=engine status=error error={err}");
            EngineError::Load(err)
        })?;
        Ok(Self::new(store, snapshot, config))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// All records in manuscript order.
    pub fn records(&self) -> &[TemporalRecord] {
        &self.records
    }

    pub fn record(&self, scene_id: &str) -> Option<&TemporalRecord> {
        self.records.iter().find(|record| record.id == scene_id)
    }

    /// Records with a story-time position, in manuscript order.
    pub fn assigned_scenes(&self) -> Vec<&TemporalRecord> {
        self.records
            .iter()
            .filter(|record| record.is_assigned())
            .collect()
    }

    /// Holding pen: records without a story-time position.
    pub fn unassigned_scenes(&self) -> Vec<&TemporalRecord> {
        self.records
            .iter()
            .filter(|record| !record.is_assigned())
            .collect()
    }

    pub fn paradox_warnings(&self) -> &[ParadoxWarning] {
        &self.warnings
    }

    pub fn narrative_connectors(&self) -> &[NarrativeConnector] {
        &self.connectors
    }

    /// Cycles in the current `depends_on` graph (only loaded data can have
    /// them; edits are validated).
    pub fn dependency_cycles(&self) -> Vec<Vec<SceneId>> {
        find_dependency_cycles(&self.records)
    }

    /// Records in the order a chronological reorder would produce.
    pub fn chronological_order(&self) -> Vec<&TemporalRecord> {
        chronological_order(&self.records)
    }

    pub fn plotlines(&self) -> &[Plotline] {
        &self.plotlines
    }

    pub fn calendar(&self) -> &CalendarConfig {
        &self.calendar
    }

    /// Applies a manual temporal edit.
    ///
    /// # Errors
    /// - `SceneNotFound` when `scene_id` is unknown.
    /// - `SelfDependency` / `DependencyCycle` for invalid `depends_on` edits;
    ///   nothing changes in that case.
    /// - `Persist` when the store rejects the write; the edit stays applied.
    pub fn update_temporal_fields(
        &mut self,
        scene_id: &str,
        update: TemporalFieldsUpdate,
    ) -> EngineResult<()> {
        let index = self.index_of(scene_id)?;
        self.validate_dependency(scene_id, &update)?;
        if update.is_empty() {
            return Ok(());
        }

        self.records[index].apply_update(&update);
        self.resolve_review(scene_id, &update);
        self.recompute();
        debug!("event=temporal_update module=engine status=ok scene_id={scene_id}");

        let result = self.store.update_temporal_fields(scene_id, &update);
        self.settle(Some(scene_id), result)
    }

    /// Preview of the chronological reorder, capped at the configured length.
    pub fn preview_chronological_reorder(&self) -> ReorderPreview {
        preview_reorder(&self.records, self.config.reorder_preview_len)
    }

    /// Rewrites manuscript order from story-time order in one step.
    ///
    /// # Errors
    /// - `Persist` when the store rejects the new order; the in-memory order
    ///   stays applied.
    pub fn apply_chronological_reorder(&mut self) -> EngineResult<()> {
        let records = std::mem::take(&mut self.records);
        self.records = reorder_records(records);
        self.recompute();

        let order = self
            .records
            .iter()
            .map(|record| record.id.clone())
            .collect::<Vec<_>>();
        info!(
            "event=manuscript_reorder module=engine status=ok scenes={}",
            order.len()
        );
        let result = self.store.replace_manuscript_order(&order);
        self.settle(None, result)
    }

    /// Applies a move/resize gesture from the timeline surface.
    ///
    /// # Errors
    /// - `SceneNotFound` when the dragged scene is unknown.
    /// - `Persist` when the store rejects the write.
    pub fn handle_scheduling_move(&mut self, request: &MoveRequest) -> EngineResult<()> {
        let index = self.index_of(&request.scene_id)?;
        let change = plan_move(request, &self.calendar, &self.plotlines);

        self.records[index].apply_update(&change.update);
        self.resolve_review(&request.scene_id, &change.update);
        self.recompute();

        let result = self
            .store
            .update_temporal_fields(&request.scene_id, &change.update);
        self.settle(Some(request.scene_id.as_str()), result)
    }

    /// Places a holding-pen scene on the timeline.
    ///
    /// Scenes without a duration get a projected default that is shown but
    /// never stored.
    ///
    /// # Errors
    /// - `SceneNotFound` when the dropped scene is unknown.
    /// - `Persist` when the store rejects the write.
    pub fn handle_scheduling_drop(&mut self, request: &DropRequest) -> EngineResult<()> {
        let index = self.index_of(&request.scene_id)?;
        let change = plan_drop(
            &self.records[index],
            request,
            &self.calendar,
            &self.plotlines,
            &self.config,
        );

        let record = &mut self.records[index];
        record.apply_update(&change.update);
        if let Some(ms) = change.projected_duration_ms {
            record.duration = Some(SceneDuration::projected(ms));
        }
        self.resolve_review(&request.scene_id, &change.update);
        self.recompute();

        let result = self
            .store
            .update_temporal_fields(&request.scene_id, &change.update);
        self.settle(Some(request.scene_id.as_str()), result)
    }

    /// Switches the calendar system, keeping epoch and months.
    pub fn set_system(&mut self, system: CalendarSystem) -> EngineResult<()> {
        let mut next = self.calendar.clone();
        next.system = system;
        self.apply_calendar_config(next)
    }

    /// Changes the epoch year label.
    pub fn set_start_year(&mut self, epoch_year: i64) -> EngineResult<()> {
        let mut next = self.calendar.clone();
        next.epoch_year = epoch_year;
        self.apply_calendar_config(next)
    }

    /// Replaces the custom month list.
    pub fn set_custom_months(&mut self, months: Vec<MonthConfig>) -> EngineResult<()> {
        let mut next = self.calendar.clone();
        next.months = months;
        self.apply_calendar_config(next)
    }

    /// Swaps in a complete calendar configuration.
    ///
    /// When the month structure changes, every dated record is flagged for
    /// review; stored dates are not rewritten.
    ///
    /// # Errors
    /// - `Persist` when the store rejects the settings; the swap stays applied.
    pub fn apply_calendar_config(&mut self, config: CalendarConfig) -> EngineResult<()> {
        if config == self.calendar {
            return Ok(());
        }

        if self.calendar.month_structure_differs(&config) {
            let flagged = self
                .records
                .iter()
                .filter(|record| record.chronological_date.is_some())
                .map(|record| record.id.clone())
                .collect::<Vec<_>>();
            info!(
                "event=calendar_review module=engine status=ok flagged={}",
                flagged.len()
            );
            self.needs_review.extend(flagged);
        }

        self.calendar = config;
        self.recompute();
        info!(
            "event=calendar_update module=engine status=ok system={} epoch_year={} months={}",
            self.calendar.system.as_str(),
            self.calendar.epoch_year,
            self.calendar.months.len()
        );

        let result = self.store.save_calendar_config(&self.calendar);
        self.settle(None, result)
    }

    /// Dated records flagged by a calendar restructure, in manuscript order.
    pub fn records_needing_review(&self) -> Vec<&TemporalRecord> {
        self.records
            .iter()
            .filter(|record| self.needs_review.contains(&record.id))
            .collect()
    }

    /// Clears the review flag of one record. Returns whether it was flagged.
    pub fn acknowledge_review(&mut self, scene_id: &str) -> bool {
        self.needs_review.remove(scene_id)
    }

    /// A re-entered or cleared chronological date settles a pending review.
    fn resolve_review(&mut self, scene_id: &str, update: &TemporalFieldsUpdate) {
        if update.chronological_date.is_some() && self.needs_review.remove(scene_id) {
            debug!("event=calendar_review_resolved module=engine status=ok scene_id={scene_id}");
        }
    }

    /// Adds a plotline and returns its id.
    ///
    /// # Errors
    /// - `InvalidPlotlineName` for blank names.
    /// - `Persist` when the store rejects the list.
    pub fn add_plotline(&mut self, name: &str, color: &str) -> EngineResult<PlotlineId> {
        let name = normalize_plotline_name(name)?;
        let plotline = Plotline::new(name, color.trim());
        let id = plotline.id.clone();
        self.plotlines.push(plotline);
        debug!("event=plotline_add module=engine status=ok plotline_id={id}");

        let result = self.store.save_plotlines(&self.plotlines);
        self.settle(None, result)?;
        Ok(id)
    }

    /// Renames and/or recolors a plotline.
    ///
    /// # Errors
    /// - `PlotlineNotFound`, `InvalidPlotlineName`, or `Persist`.
    pub fn update_plotline(
        &mut self,
        plotline_id: &str,
        name: Option<&str>,
        color: Option<&str>,
    ) -> EngineResult<()> {
        let name = name.map(normalize_plotline_name).transpose()?;
        let plotline = self
            .plotlines
            .iter_mut()
            .find(|plotline| plotline.id == plotline_id)
            .ok_or_else(|| EngineError::PlotlineNotFound(plotline_id.to_string()))?;
        if let Some(name) = name {
            plotline.name = name;
        }
        if let Some(color) = color {
            plotline.color = color.trim().to_string();
        }

        let result = self.store.save_plotlines(&self.plotlines);
        self.settle(None, result)
    }

    /// Removes a plotline; `mode` decides what happens to tagged scenes.
    ///
    /// # Errors
    /// - `PlotlineNotFound` when the lane is unknown.
    /// - `Persist` for the first failed write; remaining writes are still
    ///   attempted.
    pub fn remove_plotline(
        &mut self,
        plotline_id: &str,
        mode: PlotlineDeleteMode,
    ) -> EngineResult<()> {
        let position = self
            .plotlines
            .iter()
            .position(|plotline| plotline.id == plotline_id)
            .ok_or_else(|| EngineError::PlotlineNotFound(plotline_id.to_string()))?;
        self.plotlines.remove(position);

        let mut first_error = None;
        let result = self.store.save_plotlines(&self.plotlines);
        if let Err(err) = self.settle(None, result) {
            first_error = Some(err);
        }

        let mut reset = 0usize;
        if mode == PlotlineDeleteMode::ResetToDefaultLane {
            let update = TemporalFieldsUpdate {
                plotline_tag: Some(None),
                ..TemporalFieldsUpdate::default()
            };
            let tagged = self
                .records
                .iter()
                .filter(|record| record.plotline_tag.as_deref() == Some(plotline_id))
                .map(|record| record.id.clone())
                .collect::<Vec<_>>();
            for scene_id in tagged {
                if let Ok(index) = self.index_of(&scene_id) {
                    self.records[index].apply_update(&update);
                }
                let result = self.store.update_temporal_fields(&scene_id, &update);
                if let Err(err) = self.settle(Some(scene_id.as_str()), result) {
                    first_error.get_or_insert(err);
                }
                reset += 1;
            }
            self.recompute();
        }

        info!(
            "event=plotline_remove module=engine status=ok plotline_id={plotline_id} reset_scenes={reset}"
        );
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Write state of one record; `None` for unknown ids.
    pub fn write_state(&self, scene_id: &str) -> Option<WriteState> {
        self.record(scene_id)?;
        Some(match self.failed_writes.get(scene_id) {
            Some(message) => WriteState::Failed(message.clone()),
            None => WriteState::Synced,
        })
    }

    /// Takes all pending status messages, oldest first.
    pub fn drain_status(&mut self) -> Vec<StatusMessage> {
        std::mem::take(&mut self.status)
    }

    fn index_of(&self, scene_id: &str) -> EngineResult<usize> {
        self.records
            .iter()
            .position(|record| record.id == scene_id)
            .ok_or_else(|| EngineError::SceneNotFound(scene_id.to_string()))
    }

    fn validate_dependency(
        &self,
        scene_id: &str,
        update: &TemporalFieldsUpdate,
    ) -> EngineResult<()> {
        let Some(target) = update.new_dependency() else {
            return Ok(());
        };
        if target == scene_id {
            return Err(EngineError::SelfDependency(scene_id.to_string()));
        }
        if would_create_cycle(&self.records, scene_id, target) {
            warn!(
                "event=temporal_update module=engine status=error error_code=dependency_cycle scene_id={scene_id}"
            );
            return Err(EngineError::DependencyCycle {
                scene_id: scene_id.to_string(),
                depends_on: target.to_string(),
            });
        }
        Ok(())
    }

    fn recompute(&mut self) {
        self.warnings = analyze(&self.records, &self.calendar, &self.config);
        self.connectors = narrative_connectors(&self.records);
        debug!(
            "event=analysis_recompute module=engine status=ok warnings={} connectors={}",
            self.warnings.len(),
            self.connectors.len()
        );
    }

    fn settle(
        &mut self,
        scene_id: Option<&str>,
        result: Result<(), StoreError>,
    ) -> EngineResult<()> {
        match result {
            Ok(()) => {
                if let Some(id) = scene_id {
                    self.failed_writes.remove(id);
                }
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                warn!(
                    "event=store_write module=engine status=error scene_id={} error={message}",
                    scene_id.unwrap_or("-")
                );
                if let Some(id) = scene_id {
                    self.failed_writes.insert(id.to_string(), message.clone());
                }
                self.status.push(StatusMessage {
                    scene_id: scene_id.map(str::to_string),
                    message,
                });
                Err(EngineError::Persist {
                    scene_id: scene_id.map(str::to_string),
                    source: err,
                })
            }
        }
    }
}

fn normalize_plotline_name(name: &str) -> EngineResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidPlotlineName(name.to_string()));
    }
    Ok(trimmed.to_string())
}
