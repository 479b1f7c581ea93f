//! Persistence layer for temporal project data.
//!
//! # Responsibility
//! - Define the store contract the timeline engine writes through.
//! - Isolate SQLite query details from engine orchestration.
//!
//! # Invariants
//! - Store APIs return semantic errors (`SceneNotFound`) in addition to DB
//!   transport errors.

pub mod memory_store;
pub mod sqlite_store;
pub mod temporal_store;
