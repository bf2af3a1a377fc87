use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rusqlite::{Connection, params};

use crate::aggregate::{build_daily_summary, join_entries_with_items};
use crate::engine::EngineSelector;
use crate::models::{
    DailySummary, Entry, Item, Macros, NewEntry, NewItem, SETTINGS_ID, Settings, SettingsPatch,
    UpdateItem, WeightUnit, validate_entry_grams, validate_item, validate_logged_grams,
};
use crate::nutrition::per_gram;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS settings (
                    id TEXT PRIMARY KEY NOT NULL,
                    body_weight REAL,
                    weight_unit TEXT NOT NULL DEFAULT 'lbs',
                    maintenance_calories REAL,
                    caloric_adjustment REAL,
                    macro_ratio_unit TEXT NOT NULL DEFAULT 'kg',
                    protein_per_unit REAL,
                    fat_per_unit REAL,
                    fiber_goal REAL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    base_grams REAL NOT NULL CHECK (base_grams > 0),
                    calories REAL NOT NULL DEFAULT 0,
                    protein REAL NOT NULL DEFAULT 0,
                    fat REAL NOT NULL DEFAULT 0,
                    carbs REAL NOT NULL DEFAULT 0,
                    fiber REAL NOT NULL DEFAULT 0,
                    image_data TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS entries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    item_id INTEGER NOT NULL,
                    grams REAL NOT NULL CHECK (grams >= 0),
                    date TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_items_created_at ON items(created_at);
                CREATE INDEX IF NOT EXISTS idx_entries_date ON entries(date);
                CREATE INDEX IF NOT EXISTS idx_entries_item ON entries(item_id);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    // Expects columns:
    // 0: id, 1: name, 2: base_grams, 3: calories, 4: protein, 5: fat,
    // 6: carbs, 7: fiber, 8: image_data, 9: created_at, 10: updated_at
    fn item_from_row(row: &rusqlite::Row) -> rusqlite::Result<Item> {
        let base_grams: f64 = row.get(2)?;
        let macros = Macros {
            calories: row.get(3)?,
            protein: row.get(4)?,
            fat: row.get(5)?,
            carbs: row.get(6)?,
            fiber: row.get(7)?,
        };
        Ok(Item {
            id: row.get(0)?,
            name: row.get(1)?,
            base_grams,
            macros,
            per_gram: per_gram(&macros, Some(base_grams)),
            image_data: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<Entry> {
        let date_str: String = row.get(3)?;
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(Entry {
            id: row.get(0)?,
            item_id: row.get(1)?,
            grams: row.get(2)?,
            date,
            created_at: row.get(4)?,
        })
    }

    fn settings_from_row(row: &rusqlite::Row) -> rusqlite::Result<Settings> {
        let weight_unit: String = row.get(1)?;
        let macro_ratio_unit: String = row.get(4)?;
        Ok(Settings {
            body_weight: row.get(0)?,
            weight_unit: WeightUnit::from_tag_lossy(&weight_unit),
            maintenance_calories: row.get(2)?,
            caloric_adjustment: row.get(3)?,
            macro_ratio_unit: WeightUnit::from_tag_lossy(&macro_ratio_unit),
            protein_per_unit: row.get(5)?,
            fat_per_unit: row.get(6)?,
            fiber_goal: row.get(7)?,
        })
    }

    // --- Settings ---

    /// Load the settings singleton, writing the defaults on first use.
    pub fn get_settings(&self) -> Result<Settings> {
        let mut stmt = self.conn.prepare(
            "SELECT body_weight, weight_unit, maintenance_calories, caloric_adjustment,
                    macro_ratio_unit, protein_per_unit, fat_per_unit, fiber_goal
             FROM settings WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![SETTINGS_ID])?;
        if let Some(row) = rows.next()? {
            return Ok(Self::settings_from_row(row)?);
        }

        tracing::info!("no settings found, writing defaults");
        let settings = Settings::default();
        self.save_settings(&settings)?;
        Ok(settings)
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO settings (id, body_weight, weight_unit, maintenance_calories, caloric_adjustment,
                                   macro_ratio_unit, protein_per_unit, fat_per_unit, fiber_goal, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                body_weight = excluded.body_weight,
                weight_unit = excluded.weight_unit,
                maintenance_calories = excluded.maintenance_calories,
                caloric_adjustment = excluded.caloric_adjustment,
                macro_ratio_unit = excluded.macro_ratio_unit,
                protein_per_unit = excluded.protein_per_unit,
                fat_per_unit = excluded.fat_per_unit,
                fiber_goal = excluded.fiber_goal,
                updated_at = excluded.updated_at",
            params![
                SETTINGS_ID,
                settings.body_weight,
                settings.weight_unit.as_str(),
                settings.maintenance_calories,
                settings.caloric_adjustment,
                settings.macro_ratio_unit.as_str(),
                settings.protein_per_unit,
                settings.fat_per_unit,
                settings.fiber_goal,
                now,
            ],
        )?;
        Ok(())
    }

    pub fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings> {
        let mut settings = self.get_settings()?;
        settings.apply(patch);
        self.save_settings(&settings)?;
        Ok(settings)
    }

    /// Add `delta` to the caloric adjustment.
    pub fn adjust_calories(&self, delta: f64) -> Result<Settings> {
        let mut settings = self.get_settings()?;
        let current = settings.caloric_adjustment.unwrap_or(0.0);
        settings.caloric_adjustment = Some(current + delta);
        self.save_settings(&settings)?;
        Ok(settings)
    }

    pub fn reset_settings(&self) -> Result<Settings> {
        let settings = Settings::default();
        self.save_settings(&settings)?;
        Ok(settings)
    }

    // --- Items ---

    pub fn insert_item(&self, item: &NewItem) -> Result<Item> {
        validate_item(item)?;
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO items (name, base_grams, calories, protein, fat, carbs, fiber, image_data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                item.name.trim(),
                item.base_grams,
                item.macros.calories,
                item.macros.protein,
                item.macros.fat,
                item.macros.carbs,
                item.macros.fiber,
                item.image_data,
                now,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_item(id)
    }

    pub fn get_item(&self, id: i64) -> Result<Item> {
        self.find_item(id)?.context("Item not found")
    }

    pub fn find_item(&self, id: i64) -> Result<Option<Item>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, base_grams, calories, protein, fat, carbs, fiber, image_data, created_at, updated_at
             FROM items WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::item_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// All items, newest first.
    pub fn list_items(&self) -> Result<Vec<Item>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, base_grams, calories, protein, fat, carbs, fiber, image_data, created_at, updated_at
             FROM items ORDER BY id DESC",
        )?;
        let items = stmt
            .query_map([], Self::item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn search_items(&self, query: &str) -> Result<Vec<Item>> {
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        let mut stmt = self.conn.prepare(
            "SELECT id, name, base_grams, calories, protein, fat, carbs, fiber, image_data, created_at, updated_at
             FROM items WHERE name LIKE ?1 ESCAPE '\\' ORDER BY id DESC LIMIT 20",
        )?;
        let items = stmt
            .query_map(params![pattern], Self::item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Newest item whose name equals `name`, ignoring ASCII case and
    /// surrounding whitespace.
    pub fn find_item_by_name(&self, name: &str) -> Result<Option<Item>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, base_grams, calories, protein, fat, carbs, fiber, image_data, created_at, updated_at
             FROM items WHERE name = ?1 COLLATE NOCASE ORDER BY id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query(params![name.trim()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::item_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Edit name, serving mass, macros or image. Identity and creation time
    /// never change, and the per-gram profile follows from the new values.
    pub fn update_item(&self, id: i64, update: &UpdateItem) -> Result<Item> {
        let existing = self.get_item(id)?;
        let merged = update.merged_with(&existing);
        validate_item(&merged)?;

        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "UPDATE items SET name = ?1, base_grams = ?2, calories = ?3, protein = ?4, fat = ?5,
                              carbs = ?6, fiber = ?7, image_data = ?8, updated_at = ?9
             WHERE id = ?10",
            params![
                merged.name.trim(),
                merged.base_grams,
                merged.macros.calories,
                merged.macros.protein,
                merged.macros.fat,
                merged.macros.carbs,
                merged.macros.fiber,
                merged.image_data,
                now,
                id,
            ],
        )?;
        self.get_item(id)
    }

    /// Delete an item, then every entry that referenced it.
    ///
    /// Returns whether the item existed and how many entries were removed.
    pub fn delete_item(&self, id: i64) -> Result<(bool, usize)> {
        let rows = self
            .conn
            .execute("DELETE FROM items WHERE id = ?1", params![id])?;
        let removed_entries = self.delete_entries_for_item(id)?;
        tracing::debug!(item_id = id, removed_entries, "deleted item");
        Ok((rows > 0, removed_entries))
    }

    // --- Entries ---

    pub fn insert_entry(&self, entry: &NewEntry) -> Result<Entry> {
        validate_logged_grams(entry.grams)?;
        // Entries are only ever created against an item that exists now.
        self.get_item(entry.item_id)?;

        let now = Local::now().to_rfc3339();
        let date_str = entry.date.format("%Y-%m-%d").to_string();
        self.conn.execute(
            "INSERT INTO entries (item_id, grams, date, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![entry.item_id, entry.grams, date_str, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_entry(id)
    }

    pub fn get_entry(&self, id: i64) -> Result<Entry> {
        self.find_entry(id)?.context("Entry not found")
    }

    pub fn find_entry(&self, id: i64) -> Result<Option<Entry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, item_id, grams, date, created_at FROM entries WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::entry_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn update_entry_grams(&self, id: i64, grams: f64) -> Result<Entry> {
        validate_entry_grams(grams)?;
        let rows = self.conn.execute(
            "UPDATE entries SET grams = ?1 WHERE id = ?2",
            params![grams, id],
        )?;
        if rows == 0 {
            anyhow::bail!("Entry not found");
        }
        self.get_entry(id)
    }

    pub fn delete_entry(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM entries WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn delete_entries_for_item(&self, item_id: i64) -> Result<usize> {
        let rows = self
            .conn
            .execute("DELETE FROM entries WHERE item_id = ?1", params![item_id])?;
        Ok(rows)
    }

    /// Entries logged on `date`, in logging order.
    pub fn get_entries_for_date(&self, date: NaiveDate) -> Result<Vec<Entry>> {
        let date_str = date.format("%Y-%m-%d").to_string();
        let mut stmt = self.conn.prepare(
            "SELECT id, item_id, grams, date, created_at
             FROM entries WHERE date = ?1
             ORDER BY id",
        )?;
        let entries = stmt
            .query_map(params![date_str], Self::entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Entries for `date` paired with their items. Entries whose item is
    /// gone are left out.
    pub fn entries_with_items(&self, date: NaiveDate) -> Result<Vec<(Entry, Item)>> {
        let entries = self.get_entries_for_date(date)?;
        let items = self.list_items()?;
        Ok(join_entries_with_items(entries, items))
    }

    pub fn build_daily_summary(
        &self,
        date: NaiveDate,
        engines: &EngineSelector,
    ) -> Result<DailySummary> {
        let joined = self.entries_with_items(date)?;
        let settings = self.get_settings()?;
        Ok(build_daily_summary(date, &joined, &settings, engines))
    }
}
