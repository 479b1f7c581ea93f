use fabula_core::{
    format_duration, parse_duration, CalendarConfig, CalendarDate, CalendarSystem,
    DropRequest, EngineConfig, EngineError, ManuscriptScene, MemoryTemporalStore, MonthConfig,
    MoveRequest, ParadoxKind, Plotline, PlotlineDeleteMode, ProjectSnapshot, SceneDuration,
    StatusMessage, TemporalFieldsUpdate, TimelineEngine, WriteState,
};

const HOUR_MS: i64 = 3_600_000;

fn scene(id: &str, order: u32) -> ManuscriptScene {
    ManuscriptScene::new(id, format!("Scene {id}"), order)
}

fn dated(id: &str, order: u32, date: &str) -> ManuscriptScene {
    let mut scene = scene(id, order);
    scene.chronological_date = Some(date.to_string());
    scene
}

fn with_pov(mut scene: ManuscriptScene, pov: &str) -> ManuscriptScene {
    scene.pov_character_id = Some(pov.to_string());
    scene
}

fn engine(scenes: Vec<ManuscriptScene>) -> TimelineEngine<MemoryTemporalStore> {
    let snapshot = ProjectSnapshot {
        scenes,
        plotlines: vec![Plotline::main()],
        calendar: CalendarConfig::gregorian(),
    };
    TimelineEngine::new(
        MemoryTemporalStore::new(snapshot.clone()),
        snapshot,
        EngineConfig::default(),
    )
}

fn ids(records: Vec<&fabula_core::TemporalRecord>) -> Vec<String> {
    records.into_iter().map(|record| record.id.clone()).collect()
}

#[test]
fn duration_round_trip_for_canonical_output() {
    assert_eq!(format_duration(7_776_000_000), "3 months");
    assert_eq!(parse_duration("3 months"), 7_776_000_000);
    for ms in [60_000, 90 * 60_000, 2 * HOUR_MS, 36 * HOUR_MS, 14 * 24 * HOUR_MS] {
        assert_eq!(parse_duration(&format_duration(ms)), ms);
    }
}

#[test]
fn fixed_360_maps_ordinals_to_year_month_day() {
    let calendar = CalendarConfig::fixed_360(1200);
    assert_eq!(
        calendar.date_from_ordinal(0),
        CalendarDate {
            year: 1200,
            month: 0,
            day: 0
        }
    );
    assert_eq!(
        calendar.date_from_ordinal(389),
        CalendarDate {
            year: 1201,
            month: 0,
            day: 29
        }
    );
}

#[test]
fn simultaneous_presence_requires_same_character() {
    let engine_same = engine(vec![
        with_pov(dated("a", 0, "2024-01-01"), "alice"),
        with_pov(dated("b", 1, "2024-01-01"), "alice"),
    ]);
    let warnings = engine_same.paradox_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, ParadoxKind::SimultaneousPresence);
    assert_eq!(warnings[0].scene_ids, vec!["a", "b"]);

    let engine_different = engine(vec![
        with_pov(dated("a", 0, "2024-01-01"), "alice"),
        with_pov(dated("b", 1, "2024-01-01"), "bob"),
    ]);
    assert!(engine_different.paradox_warnings().is_empty());
}

#[test]
fn causality_violation_follows_date_edits() {
    let mut effect = dated("b", 1, "2024-01-01");
    effect.depends_on = Some("a".to_string());
    let mut engine = engine(vec![dated("a", 0, "2024-02-01"), effect]);

    let warnings = engine.paradox_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, ParadoxKind::CausalityViolation);
    assert_eq!(warnings[0].scene_ids, vec!["a", "b"]);

    engine
        .update_temporal_fields(
            "a",
            TemporalFieldsUpdate::default().set_chronological_date("2024-01-01"),
        )
        .unwrap();
    engine
        .update_temporal_fields(
            "b",
            TemporalFieldsUpdate::default().set_chronological_date("2024-02-01"),
        )
        .unwrap();
    assert!(engine.paradox_warnings().is_empty());
}

#[test]
fn orphan_gap_uses_threshold() {
    let wide = engine(vec![dated("a", 0, "2020-01-01"), dated("b", 1, "2023-04-15")]);
    let warnings = wide.paradox_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, ParadoxKind::OrphanGap);
    assert_eq!(warnings[0].scene_ids, vec!["a", "b"]);

    let narrow = engine(vec![dated("a", 0, "2020-01-01"), dated("b", 1, "2022-09-27")]);
    assert!(narrow.paradox_warnings().is_empty());
}

#[test]
fn unassigned_scenes_stay_out_of_analysis() {
    let engine = engine(vec![
        with_pov(scene("pen1", 0), "alice"),
        with_pov(scene("pen2", 1), "alice"),
        dated("a", 2, "2024-01-01"),
    ]);
    assert_eq!(ids(engine.assigned_scenes()), vec!["a"]);
    assert_eq!(ids(engine.unassigned_scenes()), vec!["pen1", "pen2"]);
    assert!(engine.paradox_warnings().is_empty());
}

#[test]
fn chronological_reorder_is_idempotent_and_keeps_pen_last() {
    let mut day_two = scene("d2", 3);
    day_two.abstract_timeframe = Some("Day 2".to_string());
    let mut engine = engine(vec![
        dated("late", 0, "2024-03-01"),
        scene("pen", 1),
        dated("early", 2, "2024-01-01"),
        day_two,
        dated("early_twin", 4, "2024-01-01"),
    ]);

    let preview = engine.preview_chronological_reorder();
    assert!(preview.changed);
    assert_eq!(preview.total, 5);
    assert_eq!(preview.entries[0].id, "early");

    engine.apply_chronological_reorder().unwrap();
    let first: Vec<String> = engine.records().iter().map(|r| r.id.clone()).collect();
    assert_eq!(first, vec!["early", "early_twin", "late", "d2", "pen"]);

    engine.apply_chronological_reorder().unwrap();
    let second: Vec<String> = engine.records().iter().map(|r| r.id.clone()).collect();
    assert_eq!(first, second);
    assert!(!engine.preview_chronological_reorder().changed);

    let stored: Vec<String> = engine
        .store()
        .snapshot()
        .scenes
        .into_iter()
        .map(|scene| scene.id)
        .collect();
    assert_eq!(stored, first);
}

#[test]
fn connectors_flag_flashbacks_in_reading_order() {
    let engine = engine(vec![
        dated("a", 0, "2024-02-01"),
        scene("pen", 1),
        dated("b", 2, "2024-01-01"),
    ]);
    let connectors = engine.narrative_connectors();
    assert_eq!(connectors.len(), 1);
    assert_eq!(connectors[0].from, "a");
    assert_eq!(connectors[0].to, "b");
    assert!(connectors[0].is_flashback);
}

#[test]
fn dependency_cycles_are_rejected_at_write_time() {
    let mut b = dated("b", 1, "2024-01-02");
    b.depends_on = Some("a".to_string());
    let mut engine = engine(vec![dated("a", 0, "2024-01-01"), b]);

    let err = engine
        .update_temporal_fields("a", TemporalFieldsUpdate::default().set_depends_on("b"))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::DependencyCycle { ref scene_id, ref depends_on }
            if scene_id == "a" && depends_on == "b"
    ));
    assert_eq!(engine.record("a").unwrap().depends_on, None);

    engine
        .update_temporal_fields("a", TemporalFieldsUpdate::default().set_depends_on("missing"))
        .unwrap();
    assert_eq!(engine.record("a").unwrap().depends_on.as_deref(), Some("missing"));
}

#[test]
fn loaded_cycles_are_reported() {
    let mut a = scene("a", 0);
    a.depends_on = Some("b".to_string());
    let mut b = scene("b", 1);
    b.depends_on = Some("a".to_string());
    let engine = engine(vec![a, b]);
    assert_eq!(
        engine.dependency_cycles(),
        vec![vec!["a".to_string(), "b".to_string()]]
    );
}

#[test]
fn move_sets_date_duration_and_lane() {
    let snapshot = ProjectSnapshot {
        scenes: vec![dated("s1", 0, "2024-01-01")],
        plotlines: vec![Plotline::main(), Plotline::new("Heist", "#f59e0b")],
        calendar: CalendarConfig::gregorian(),
    };
    let heist = snapshot.plotlines[1].id.clone();
    let store = MemoryTemporalStore::new(snapshot.clone());
    let mut engine = TimelineEngine::new(store.clone(), snapshot, EngineConfig::default());

    let start = engine
        .calendar()
        .parse_instant("2024-05-01T09:00:00Z")
        .unwrap();
    engine
        .handle_scheduling_move(&MoveRequest {
            scene_id: "s1".to_string(),
            start_ms: start,
            end_ms: Some(start + 90 * 60_000),
            lane: Some(heist.clone()),
        })
        .unwrap();

    let record = engine.record("s1").unwrap();
    assert_eq!(
        record.chronological_date.as_deref(),
        Some("2024-05-01T09:00:00Z")
    );
    assert_eq!(record.explicit_duration_ms(), Some(90 * 60_000));
    assert_eq!(record.plotline_tag.as_deref(), Some(heist.as_str()));

    let stored = store.scene("s1").unwrap();
    assert_eq!(stored.duration.as_deref(), Some("90 minutes"));

    engine
        .handle_scheduling_move(&MoveRequest {
            scene_id: "s1".to_string(),
            start_ms: start,
            end_ms: Some(start - HOUR_MS),
            lane: None,
        })
        .unwrap();
    assert_eq!(
        engine.record("s1").unwrap().explicit_duration_ms(),
        Some(90 * 60_000)
    );
}

#[test]
fn drop_assigns_projected_duration_and_first_lane() {
    let mut engine = engine(vec![scene("pen", 0)]);
    engine
        .handle_scheduling_drop(&DropRequest {
            scene_id: "pen".to_string(),
            at_ms: 0,
            lane: Some("nowhere".to_string()),
        })
        .unwrap();

    let record = engine.record("pen").unwrap();
    assert_eq!(
        record.chronological_date.as_deref(),
        Some("1970-01-01T00:00:00Z")
    );
    assert_eq!(record.plotline_tag.as_deref(), Some("main"));
    assert_eq!(record.duration, Some(SceneDuration::projected(2 * HOUR_MS)));
    assert_eq!(ids(engine.assigned_scenes()), vec!["pen"]);

    let stored = engine.store().scene("pen").unwrap();
    assert_eq!(stored.duration, None);
    assert_eq!(stored.plotline_tag.as_deref(), Some("main"));
}

#[test]
fn failed_writes_keep_state_and_surface_once() {
    let mut engine = engine(vec![scene("s1", 0)]);
    engine.store().set_failure(Some("disk full"));

    let err = engine
        .update_temporal_fields(
            "s1",
            TemporalFieldsUpdate::default().set_abstract_timeframe("Day 3"),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Persist { scene_id: Some(ref id), .. } if id == "s1"));
    assert_eq!(engine.record("s1").unwrap().time_key(), Some("Day 3"));
    assert!(matches!(
        engine.write_state("s1"),
        Some(WriteState::Failed(ref message)) if message.contains("disk full")
    ));

    let status = engine.drain_status();
    assert_eq!(status.len(), 1);
    assert_eq!(
        status[0],
        StatusMessage {
            scene_id: Some("s1".to_string()),
            message: "store unavailable: disk full".to_string(),
        }
    );
    assert!(engine.drain_status().is_empty());

    engine.store().set_failure(None);
    engine
        .update_temporal_fields(
            "s1",
            TemporalFieldsUpdate::default().set_abstract_timeframe("Day 4"),
        )
        .unwrap();
    assert_eq!(engine.write_state("s1"), Some(WriteState::Synced));
}

#[test]
fn calendar_restructure_flags_dated_records_for_review() {
    let mut day_one = scene("abstract", 1);
    day_one.abstract_timeframe = Some("Day 1".to_string());
    let mut engine = engine(vec![dated("a", 0, "2024-01-01"), day_one]);

    engine.set_start_year(500).unwrap();
    assert!(engine.records_needing_review().is_empty());

    engine.set_system(CalendarSystem::Custom).unwrap();
    assert_eq!(ids(engine.records_needing_review()), vec!["a"]);
    assert!(engine.acknowledge_review("a"));
    assert!(!engine.acknowledge_review("a"));

    engine
        .set_custom_months(vec![MonthConfig::new("Long", 90)])
        .unwrap();
    assert_eq!(ids(engine.records_needing_review()), vec!["a"]);

    let stored = engine.store().snapshot().calendar;
    assert_eq!(stored.system, CalendarSystem::Custom);
    assert_eq!(stored.epoch_year, 500);
    assert_eq!(stored.months, vec![MonthConfig::new("Long", 90)]);
}

#[test]
fn removing_plotline_can_reset_scenes_to_default_lane() {
    let mut engine = engine(Vec::new());
    let heist = engine.add_plotline("Heist", "#f59e0b").unwrap();
    assert!(heist.starts_with("plotline-"));

    let mut engine = {
        let mut tagged = dated("a", 0, "2024-01-01");
        tagged.plotline_tag = Some(heist.clone());
        let mut other = dated("b", 1, "2024-01-02");
        other.plotline_tag = Some(heist.clone());
        let snapshot = ProjectSnapshot {
            scenes: vec![tagged, other],
            plotlines: engine.plotlines().to_vec(),
            calendar: CalendarConfig::gregorian(),
        };
        TimelineEngine::new(
            MemoryTemporalStore::new(snapshot.clone()),
            snapshot,
            EngineConfig::default(),
        )
    };

    engine
        .update_plotline(&heist, Some(" Vault Job "), None)
        .unwrap();
    assert_eq!(engine.plotlines()[1].name, "Vault Job");
    assert!(matches!(
        engine.update_plotline(&heist, Some("  "), None),
        Err(EngineError::InvalidPlotlineName(_))
    ));

    engine
        .remove_plotline(&heist, PlotlineDeleteMode::ResetToDefaultLane)
        .unwrap();
    assert_eq!(engine.plotlines(), &[Plotline::main()]);
    assert_eq!(engine.record("a").unwrap().plotline_tag, None);
    assert_eq!(engine.store().scene("b").unwrap().plotline_tag, None);

    assert!(matches!(
        engine.remove_plotline(&heist, PlotlineDeleteMode::LeaveDangling),
        Err(EngineError::PlotlineNotFound(_))
    ));
}

#[test]
fn leave_dangling_keeps_scene_tags() {
    let mut tagged = dated("a", 0, "2024-01-01");
    tagged.plotline_tag = Some("main".to_string());
    let mut engine = engine(vec![tagged]);

    engine
        .remove_plotline("main", PlotlineDeleteMode::LeaveDangling)
        .unwrap();
    assert!(engine.plotlines().is_empty());
    assert_eq!(engine.record("a").unwrap().plotline_tag.as_deref(), Some("main"));
}

#[test]
fn from_store_loads_tree_shaped_manuscript() {
    let mut child = dated("s1", 0, "2024-01-01");
    child.parent_id = Some("ch1".to_string());
    let snapshot = ProjectSnapshot {
        scenes: vec![scene("ch2", 1), child, scene("ch1", 0)],
        plotlines: vec![Plotline::main()],
        calendar: CalendarConfig::fixed_360(1),
    };
    let engine =
        TimelineEngine::from_store(MemoryTemporalStore::new(snapshot), EngineConfig::default())
            .unwrap();
    let order: Vec<&str> = engine.records().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(order, vec!["ch1", "s1", "ch2"]);
    assert_eq!(engine.calendar().system, CalendarSystem::Fixed360);
}

#[test]
fn editing_a_flagged_date_settles_its_review() {
    let mut engine = engine(vec![
        dated("a", 0, "2024-01-01"),
        dated("b", 1, "2024-02-01"),
        dated("c", 2, "2024-03-01"),
    ]);
    engine
        .apply_calendar_config(CalendarConfig::fixed_360(1))
        .unwrap();
    assert_eq!(ids(engine.records_needing_review()), vec!["a", "b", "c"]);

    engine
        .update_temporal_fields(
            "b",
            TemporalFieldsUpdate::default().set_pov_character_id("alice"),
        )
        .unwrap();
    assert_eq!(ids(engine.records_needing_review()), vec!["a", "b", "c"]);

    engine
        .update_temporal_fields(
            "a",
            TemporalFieldsUpdate::default().set_chronological_date("0001-02-01"),
        )
        .unwrap();
    assert_eq!(ids(engine.records_needing_review()), vec!["b", "c"]);

    engine
        .handle_scheduling_move(&MoveRequest {
            scene_id: "c".to_string(),
            start_ms: 0,
            end_ms: None,
            lane: None,
        })
        .unwrap();
    assert_eq!(ids(engine.records_needing_review()), vec!["b"]);
    assert!(engine.acknowledge_review("b"));
}

#[test]
fn extreme_story_years_load_without_warnings() {
    let snapshot = ProjectSnapshot {
        scenes: vec![
            dated("first", 0, "0001-01-01"),
            dated("far", 1, "100000000000-01-01"),
        ],
        plotlines: vec![Plotline::main()],
        calendar: CalendarConfig::fixed_360(1),
    };
    let engine = TimelineEngine::new(
        MemoryTemporalStore::new(snapshot.clone()),
        snapshot,
        EngineConfig::default(),
    );
    assert_eq!(ids(engine.assigned_scenes()), vec!["first", "far"]);
    assert!(engine.paradox_warnings().is_empty());
}

#[test]
fn extreme_epoch_years_keep_the_engine_usable() {
    let mut engine = engine(vec![
        dated("a", 0, "2024-01-01"),
        dated("b", 1, "2030-01-01"),
    ]);
    assert_eq!(engine.paradox_warnings().len(), 1);

    engine
        .apply_calendar_config(CalendarConfig::fixed_360(i64::MAX))
        .unwrap();
    assert!(engine.paradox_warnings().is_empty());
    assert_eq!(ids(engine.records_needing_review()), vec!["a", "b"]);

    engine.set_start_year(i64::MIN).unwrap();
    engine.set_system(CalendarSystem::Custom).unwrap();
    assert!(engine.paradox_warnings().is_empty());
    assert_eq!(engine.calendar().epoch_year, i64::MIN);
}

#[test]
fn scheduling_at_extreme_instants_on_invented_calendars() {
    for calendar in [
        CalendarConfig::fixed_360(1),
        CalendarConfig::custom(1, vec![MonthConfig::new("Long", 90)]),
    ] {
        let snapshot = ProjectSnapshot {
            scenes: vec![scene("low", 0), scene("high", 1)],
            plotlines: vec![Plotline::main()],
            calendar,
        };
        let mut engine = TimelineEngine::new(
            MemoryTemporalStore::new(snapshot.clone()),
            snapshot,
            EngineConfig::default(),
        );

        engine
            .handle_scheduling_move(&MoveRequest {
                scene_id: "low".to_string(),
                start_ms: i64::MIN,
                end_ms: Some(i64::MAX),
                lane: None,
            })
            .unwrap();
        engine
            .handle_scheduling_drop(&DropRequest {
                scene_id: "high".to_string(),
                at_ms: i64::MAX,
                lane: None,
            })
            .unwrap();

        assert_eq!(engine.assigned_scenes().len(), 2);
        assert!(engine.paradox_warnings().is_empty());
        let low = engine.record("low").unwrap();
        assert!(low.explicit_duration_ms().is_some_and(|ms| ms > 0));
    }
}
