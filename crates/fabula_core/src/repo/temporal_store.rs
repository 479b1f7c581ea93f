//! Persistence contract for temporal data.
//!
//! # Responsibility
//! - Define what the timeline engine needs from the project store: an
//!   initial snapshot plus write entry points for temporal fields, order,
//!   plotlines and calendar settings.
//!
//! # Invariants
//! - Every write is all-or-nothing from the caller's view.
//! - Stores never see projected (display-only) durations.

use crate::db::DbError;
use crate::model::plotline::Plotline;
use crate::model::scene::{ManuscriptScene, SceneId, TemporalFieldsUpdate};
use crate::time::calendar::CalendarConfig;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from temporal store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target scene does not exist in the manuscript.
    SceneNotFound(SceneId),
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
    /// Backend refused or failed the write.
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::SceneNotFound(id) => write!(f, "scene not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid stored project data: {message}"),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Everything needed to construct a timeline engine for one project.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectSnapshot {
    /// Manuscript entries, tree-shaped or flat.
    pub scenes: Vec<ManuscriptScene>,
    pub plotlines: Vec<Plotline>,
    pub calendar: CalendarConfig,
}

/// Store interface the timeline engine writes through.
pub trait TemporalStore {
    /// Loads the current project state.
    fn load_project(&self) -> StoreResult<ProjectSnapshot>;
    /// Applies a partial temporal edit to one scene.
    fn update_temporal_fields(
        &self,
        scene_id: &str,
        update: &TemporalFieldsUpdate,
    ) -> StoreResult<()>;
    /// Replaces manuscript order in one step; `order` lists every scene.
    fn replace_manuscript_order(&self, order: &[SceneId]) -> StoreResult<()>;
    /// Replaces the plotline list.
    fn save_plotlines(&self, plotlines: &[Plotline]) -> StoreResult<()>;
    /// Replaces calendar settings (system, epoch and months together).
    fn save_calendar_config(&self, config: &CalendarConfig) -> StoreResult<()>;
}
