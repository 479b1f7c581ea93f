//! Story-time driven writes: gesture planning and chronological reordering.
//!
//! # Invariants
//! - Planning functions are pure; the timeline engine applies and persists.

pub mod adapter;
pub mod reorder;
