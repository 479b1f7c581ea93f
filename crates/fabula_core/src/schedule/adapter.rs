//! Timeline gesture translation.
//!
//! # Responsibility
//! - Turn move/resize and drop gestures from the visual timeline into
//!   temporal field updates.
//!
//! # Invariants
//! - Gestures never write a zero or negative duration.
//! - Drop defaults are projected (display-only), never persisted.
//! - Instants are ms on the story axis of the active calendar.

use crate::config::EngineConfig;
use crate::model::plotline::{Plotline, PlotlineId};
use crate::model::scene::{SceneId, TemporalFieldsUpdate, TemporalRecord};
use crate::time::calendar::CalendarConfig;
use crate::time::duration::{format_duration, parse_duration};

/// Item dragged or resized on the timeline surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub scene_id: SceneId,
    pub start_ms: i64,
    /// Present when the item was resized or is a range.
    pub end_ms: Option<i64>,
    /// Lane the item ended up in, if the surface reports one.
    pub lane: Option<PlotlineId>,
}

/// Unassigned scene dropped onto the timeline surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropRequest {
    pub scene_id: SceneId,
    pub at_ms: i64,
    pub lane: Option<PlotlineId>,
}

/// Planned effect of one gesture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleChange {
    /// Fields written back to the store.
    pub update: TemporalFieldsUpdate,
    /// Display-only duration for scenes that had none.
    pub projected_duration_ms: Option<i64>,
}

/// Plans a move/resize.
///
/// The start becomes the chronological date. A positive `end - start` becomes
/// the duration, canonicalized through the duration formatter so the stored
/// text and the in-memory ms agree. Unknown lanes leave the tag unchanged.
pub fn plan_move(
    request: &MoveRequest,
    calendar: &CalendarConfig,
    plotlines: &[Plotline],
) -> ScheduleChange {
    let mut update = TemporalFieldsUpdate::default()
        .set_chronological_date(calendar.format_instant(request.start_ms));

    if let Some(end_ms) = request.end_ms {
        let delta = end_ms.saturating_sub(request.start_ms);
        if delta > 0 {
            let canonical = parse_duration(&format_duration(delta));
            if canonical > 0 {
                update = update.set_duration_ms(canonical);
            }
        }
    }

    if let Some(lane) = request
        .lane
        .as_deref()
        .filter(|lane| is_known_lane(lane, plotlines))
    {
        update = update.set_plotline_tag(lane);
    }

    ScheduleChange {
        update,
        projected_duration_ms: None,
    }
}

/// Plans a drop from the holding pen.
///
/// Sets the chronological date and lane; a scene without any duration gets
/// the configured projected default so it renders with non-zero width.
pub fn plan_drop(
    record: &TemporalRecord,
    request: &DropRequest,
    calendar: &CalendarConfig,
    plotlines: &[Plotline],
    config: &EngineConfig,
) -> ScheduleChange {
    let mut update = TemporalFieldsUpdate::default()
        .set_chronological_date(calendar.format_instant(request.at_ms));
    update.plotline_tag = Some(resolve_lane(request.lane.as_deref(), plotlines));

    let projected_duration_ms = if record.duration.is_none() && config.drop_default_duration_ms > 0
    {
        Some(config.drop_default_duration_ms)
    } else {
        None
    };

    ScheduleChange {
        update,
        projected_duration_ms,
    }
}

/// Requested lane when known, otherwise the first lane, otherwise the
/// default lane (`None`).
pub fn resolve_lane(requested: Option<&str>, plotlines: &[Plotline]) -> Option<PlotlineId> {
    requested
        .filter(|lane| is_known_lane(lane, plotlines))
        .map(str::to_string)
        .or_else(|| plotlines.first().map(|plotline| plotline.id.clone()))
}

fn is_known_lane(lane: &str, plotlines: &[Plotline]) -> bool {
    plotlines.iter().any(|plotline| plotline.id == lane)
}
