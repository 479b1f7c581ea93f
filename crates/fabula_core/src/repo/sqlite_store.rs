//! SQLite-backed temporal store.
//!
//! # Responsibility
//! - Persist scene temporal fields, manuscript order, plotlines and calendar
//!   settings for one project database.
//!
//! # Invariants
//! - Connections must be migrated to the latest schema (`try_new` checks).
//! - Multi-row writes run inside one transaction.
//! - Durations are stored as canonical duration text, never raw ms.

use crate::db::ensure_schema;
use crate::model::plotline::Plotline;
use crate::model::scene::{ManuscriptScene, SceneId, TemporalFieldsUpdate};
use crate::repo::temporal_store::{ProjectSnapshot, StoreError, StoreResult, TemporalStore};
use crate::time::calendar::{CalendarConfig, CalendarSystem, MonthConfig};
use crate::time::duration::format_duration;
use log::{debug, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const SCENE_COLUMNS: &[&str] = &[
    "id",
    "parent_id",
    "title",
    "word_count",
    "sort_order",
    "chronological_date",
    "abstract_timeframe",
    "duration",
    "plotline_tag",
    "depends_on",
    "pov_character_id",
];

const PLOTLINE_COLUMNS: &[&str] = &["id", "name", "color", "sort_order"];
const CALENDAR_SETTINGS_COLUMNS: &[&str] = &["id", "system", "epoch_year"];
const CALENDAR_MONTH_COLUMNS: &[&str] = &["position", "name", "days"];

const SCENE_SELECT_SQL: &str = "SELECT
    id,
    parent_id,
    title,
    word_count,
    sort_order,
    chronological_date,
    abstract_timeframe,
    duration,
    plotline_tag,
    depends_on,
    pov_character_id
FROM scenes";

/// Temporal store over one project connection.
pub struct SqliteTemporalStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTemporalStore<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - Returns `StoreError::Db` when schema version or tables do not match.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_schema(
            conn,
            &[
                ("scenes", SCENE_COLUMNS),
                ("plotlines", PLOTLINE_COLUMNS),
                ("calendar_settings", CALENDAR_SETTINGS_COLUMNS),
                ("calendar_months", CALENDAR_MONTH_COLUMNS),
            ],
        )?;
        Ok(Self { conn })
    }

    /// Inserts or replaces one manuscript scene (import path).
    pub fn upsert_scene(&self, scene: &ManuscriptScene) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO scenes (
                id,
                parent_id,
                title,
                word_count,
                sort_order,
                chronological_date,
                abstract_timeframe,
                duration,
                plotline_tag,
                depends_on,
                pov_character_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                parent_id = excluded.parent_id,
                title = excluded.title,
                word_count = excluded.word_count,
                sort_order = excluded.sort_order,
                chronological_date = excluded.chronological_date,
                abstract_timeframe = excluded.abstract_timeframe,
                duration = excluded.duration,
                plotline_tag = excluded.plotline_tag,
                depends_on = excluded.depends_on,
                pov_character_id = excluded.pov_character_id;",
            params![
                scene.id.as_str(),
                scene.parent_id.as_deref(),
                scene.title.as_str(),
                scene.word_count,
                scene.order,
                scene.chronological_date.as_deref(),
                scene.abstract_timeframe.as_deref(),
                scene.duration.as_deref(),
                scene.plotline_tag.as_deref(),
                scene.depends_on.as_deref(),
                scene.pov_character_id.as_deref(),
            ],
        )?;
        Ok(())
    }

    /// Lists scenes ordered by `sort_order ASC, rowid ASC`.
    pub fn list_scenes(&self) -> StoreResult<Vec<ManuscriptScene>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SCENE_SELECT_SQL} ORDER BY sort_order ASC, rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut scenes = Vec::new();
        while let Some(row) = rows.next()? {
            scenes.push(parse_scene_row(row)?);
        }
        Ok(scenes)
    }

    /// Loads one scene by id.
    pub fn get_scene(&self, scene_id: &str) -> StoreResult<Option<ManuscriptScene>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SCENE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([scene_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_scene_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_plotlines(&self) -> StoreResult<Vec<Plotline>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, color
             FROM plotlines
             ORDER BY sort_order ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut plotlines = Vec::new();
        while let Some(row) = rows.next()? {
            plotlines.push(Plotline {
                id: row.get("id")?,
                name: row.get("name")?,
                color: row.get("color")?,
            });
        }
        Ok(plotlines)
    }

    fn load_calendar(&self) -> StoreResult<CalendarConfig> {
        let (system_text, epoch_year): (String, i64) = self.conn.query_row(
            "SELECT system, epoch_year FROM calendar_settings WHERE id = 1;",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let system = CalendarSystem::parse(&system_text).ok_or_else(|| {
            StoreError::InvalidData(format!(
                "invalid calendar system `{system_text}` in calendar_settings.system"
            ))
        })?;

        let mut stmt = self
            .conn
            .prepare("SELECT name, days FROM calendar_months ORDER BY position ASC;")?;
        let mut rows = stmt.query([])?;
        let mut months = Vec::new();
        while let Some(row) = rows.next()? {
            months.push(MonthConfig {
                name: row.get("name")?,
                days: row.get("days")?,
            });
        }

        Ok(CalendarConfig {
            system,
            epoch_year,
            months,
        })
    }
}

impl TemporalStore for SqliteTemporalStore<'_> {
    fn load_project(&self) -> StoreResult<ProjectSnapshot> {
        Ok(ProjectSnapshot {
            scenes: self.list_scenes()?,
            plotlines: self.list_plotlines()?,
            calendar: self.load_calendar()?,
        })
    }

    fn update_temporal_fields(
        &self,
        scene_id: &str,
        update: &TemporalFieldsUpdate,
    ) -> StoreResult<()> {
        let mut assignments: Vec<&str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        let text_fields = [
            ("chronological_date = ?", &update.chronological_date),
            ("abstract_timeframe = ?", &update.abstract_timeframe),
            ("plotline_tag = ?", &update.plotline_tag),
            ("depends_on = ?", &update.depends_on),
            ("pov_character_id = ?", &update.pov_character_id),
        ];
        for (assignment, patch) in text_fields {
            if let Some(value) = patch {
                assignments.push(assignment);
                bind_values.push(text_value(value.as_deref()));
            }
        }
        if let Some(duration_ms) = update.duration_ms {
            assignments.push("duration = ?");
            let text = duration_ms.map(format_duration).unwrap_or_default();
            bind_values.push(text_value(Some(text.as_str())));
        }

        if assignments.is_empty() {
            return match self.get_scene(scene_id)? {
                Some(_) => Ok(()),
                None => Err(StoreError::SceneNotFound(scene_id.to_string())),
            };
        }

        let sql = format!("UPDATE scenes SET {} WHERE id = ?;", assignments.join(", "));
        bind_values.push(Value::Text(scene_id.to_string()));
        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(StoreError::SceneNotFound(scene_id.to_string()));
        }

        debug!(
            "event=scene_temporal_update module=repo status=ok fields={}",
            assignments.len()
        );
        Ok(())
    }

    fn replace_manuscript_order(&self, order: &[SceneId]) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (index, scene_id) in order.iter().enumerate() {
            let changed = tx.execute(
                "UPDATE scenes SET sort_order = ?1 WHERE id = ?2;",
                params![index as i64, scene_id.as_str()],
            )?;
            if changed == 0 {
                warn!("event=manuscript_reorder module=repo status=error error_code=scene_not_found");
                return Err(StoreError::SceneNotFound(scene_id.clone()));
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn save_plotlines(&self, plotlines: &[Plotline]) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM plotlines;", [])?;
        for (index, plotline) in plotlines.iter().enumerate() {
            tx.execute(
                "INSERT INTO plotlines (id, name, color, sort_order) VALUES (?1, ?2, ?3, ?4);",
                params![
                    plotline.id.as_str(),
                    plotline.name.as_str(),
                    plotline.color.as_str(),
                    index as i64,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn save_calendar_config(&self, config: &CalendarConfig) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO calendar_settings (id, system, epoch_year) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
                system = excluded.system,
                epoch_year = excluded.epoch_year;",
            params![config.system.as_str(), config.epoch_year],
        )?;
        tx.execute("DELETE FROM calendar_months;", [])?;
        for (position, month) in config.months.iter().enumerate() {
            tx.execute(
                "INSERT INTO calendar_months (position, name, days) VALUES (?1, ?2, ?3);",
                params![position as i64, month.name.as_str(), month.days],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn text_value(value: Option<&str>) -> Value {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => Value::Text(value.to_string()),
        None => Value::Null,
    }
}

fn parse_scene_row(row: &Row<'_>) -> StoreResult<ManuscriptScene> {
    let word_count: i64 = row.get("word_count")?;
    let sort_order: i64 = row.get("sort_order")?;
    let id: SceneId = row.get("id")?;
    Ok(ManuscriptScene {
        word_count: u32::try_from(word_count).map_err(|_| {
            StoreError::InvalidData(format!("invalid word_count `{word_count}` for scene {id}"))
        })?,
        order: u32::try_from(sort_order).map_err(|_| {
            StoreError::InvalidData(format!("invalid sort_order `{sort_order}` for scene {id}"))
        })?,
        parent_id: row.get("parent_id")?,
        title: row.get("title")?,
        chronological_date: row.get("chronological_date")?,
        abstract_timeframe: row.get("abstract_timeframe")?,
        duration: row.get("duration")?,
        plotline_tag: row.get("plotline_tag")?,
        depends_on: row.get("depends_on")?,
        pov_character_id: row.get("pov_character_id")?,
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_db_in_memory;

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            SqliteTemporalStore::try_new(&conn),
            Err(StoreError::Db(_))
        ));
    }

    #[test]
    fn blank_text_is_stored_as_null() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteTemporalStore::try_new(&conn).unwrap();
        store
            .upsert_scene(&ManuscriptScene::new("s1", "Opening", 0))
            .unwrap();

        let update = TemporalFieldsUpdate::default().set_abstract_timeframe("   ");
        store.update_temporal_fields("s1", &update).unwrap();
        let scene = store.get_scene("s1").unwrap().unwrap();
        assert_eq!(scene.abstract_timeframe, None);
    }
}
