//! Plotline (lane) model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Plotline identifier referenced softly by scenes.
pub type PlotlineId = String;

pub const DEFAULT_PLOTLINE_ID: &str = "main";
pub const DEFAULT_PLOTLINE_NAME: &str = "Main Plot";
pub const DEFAULT_PLOTLINE_COLOR: &str = "#3b82f6";

/// Named, colored lane grouping scenes on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Plotline {
    pub id: PlotlineId,
    pub name: String,
    pub color: String,
}

impl Plotline {
    /// Creates a plotline with a generated `plotline-<uuid>` id.
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: format!("plotline-{}", Uuid::new_v4()),
            name: name.into(),
            color: color.into(),
        }
    }

    /// Lane every new project starts with.
    pub fn main() -> Self {
        Self {
            id: DEFAULT_PLOTLINE_ID.to_string(),
            name: DEFAULT_PLOTLINE_NAME.to_string(),
            color: DEFAULT_PLOTLINE_COLOR.to_string(),
        }
    }
}

/// What happens to scene references when a plotline is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotlineDeleteMode {
    /// Scenes keep the now-dangling tag.
    LeaveDangling,
    /// Scenes tagged with the removed lane move to the default lane.
    ResetToDefaultLane,
}
