//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls and derived views into use-case level APIs.
//! - Keep UI/CLI layers decoupled from storage details.

pub mod timeline_engine;
