//! Temporal domain model.
//!
//! # Responsibility
//! - Define the per-scene temporal projection and plotline lanes.
//! - Keep one record shape for analysis, scheduling and persistence.
//!
//! # Invariants
//! - Records are derived from the manuscript; ids are owned by it.
//! - Plotline references are soft: nothing cascades on delete.

pub mod plotline;
pub mod scene;
