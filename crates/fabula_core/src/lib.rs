//! Core domain logic for Fabula, the story-time engine.
//! This crate is the single source of truth for temporal invariants.

pub mod analysis;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schedule;
pub mod service;
pub mod time;

pub use analysis::connectors::NarrativeConnector;
pub use analysis::paradox::{analyze, ParadoxKind, ParadoxWarning};
pub use config::EngineConfig;
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::plotline::{Plotline, PlotlineDeleteMode, PlotlineId};
pub use model::scene::{
    project_manuscript, CharacterId, DurationSource, ManuscriptScene, SceneDuration, SceneId,
    TemporalFieldsUpdate, TemporalRecord,
};
pub use repo::memory_store::MemoryTemporalStore;
pub use repo::sqlite_store::SqliteTemporalStore;
pub use repo::temporal_store::{ProjectSnapshot, StoreError, StoreResult, TemporalStore};
pub use schedule::adapter::{DropRequest, MoveRequest};
pub use schedule::reorder::{ReorderPreview, ReorderPreviewEntry};
pub use service::timeline_engine::{
    EngineError, EngineResult, StatusMessage, TimelineEngine, WriteState,
};
pub use time::calendar::{CalendarConfig, CalendarDate, CalendarSystem, MonthConfig};
pub use time::duration::{format_duration, parse_duration};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
