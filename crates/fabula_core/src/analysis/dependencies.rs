//! `depends_on` graph checks.
//!
//! Each scene has at most one predecessor, so the graph is a functional
//! graph: walks are linear and every cycle is found with one pass.

use crate::model::scene::{SceneId, TemporalRecord};
use std::collections::{HashMap, HashSet};

/// Returns whether pointing `scene_id` at `depends_on` closes a cycle.
///
/// Dangling targets end the walk. A pre-existing cycle that does not pass
/// through `scene_id` is not reported here.
pub fn would_create_cycle(records: &[TemporalRecord], scene_id: &str, depends_on: &str) -> bool {
    let edges = edges(records);
    let mut visited = HashSet::new();
    let mut cursor = Some(depends_on);
    while let Some(current) = cursor {
        if current == scene_id {
            return true;
        }
        if !visited.insert(current) {
            return false;
        }
        cursor = edges.get(current).copied();
    }
    false
}

/// Lists every dependency cycle, each starting from its first member in
/// input order. A scene depending on itself is a cycle of one.
pub fn find_dependency_cycles(records: &[TemporalRecord]) -> Vec<Vec<SceneId>> {
    let edges = edges(records);
    let mut finished: HashSet<&str> = HashSet::new();
    let mut cycles = Vec::new();

    for record in records {
        let mut path: Vec<&str> = Vec::new();
        let mut on_path: HashMap<&str, usize> = HashMap::new();
        let mut cursor = Some(record.id.as_str());

        while let Some(current) = cursor {
            if finished.contains(current) {
                break;
            }
            if let Some(start) = on_path.get(current) {
                cycles.push(path[*start..].iter().map(|id| id.to_string()).collect());
                break;
            }
            on_path.insert(current, path.len());
            path.push(current);
            cursor = edges.get(current).copied();
        }
        finished.extend(path);
    }

    cycles
}

fn edges(records: &[TemporalRecord]) -> HashMap<&str, &str> {
    records
        .iter()
        .filter_map(|record| {
            record
                .depends_on
                .as_deref()
                .map(|target| (record.id.as_str(), target))
        })
        .collect()
}
