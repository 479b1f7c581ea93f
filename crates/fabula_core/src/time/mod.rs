//! Story-time arithmetic.
//!
//! # Responsibility
//! - Calendar systems for ordinal day <-> date/display conversion.
//! - Duration text <-> canonical millisecond conversion.
//!
//! # Invariants
//! - Nothing in this module fails loudly: malformed input degrades to `0`,
//!   an empty string, or `None`.

pub mod calendar;
pub mod duration;
