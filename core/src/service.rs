use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};

use crate::db::Database;
use crate::engine::EngineSelector;
use crate::models::{
    DailySummary, Entry, Item, Macros, NewEntry, NewItem, Settings, SettingsPatch, UpdateItem,
};

/// Facade for embedding hosts: string dates in, typed records out.
///
/// Goals and totals always go through the [`EngineSelector`], so a failing
/// primary engine never reaches the caller.
pub struct TrackerService {
    db: Database,
    engines: EngineSelector,
}

impl TrackerService {
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Database::open(Path::new(db_path))?;
        Ok(Self {
            db,
            engines: EngineSelector::default(),
        })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db,
            engines: EngineSelector::default(),
        })
    }

    #[must_use]
    pub fn with_engines(mut self, engines: EngineSelector) -> Self {
        self.engines = engines;
        self
    }

    pub fn engines(&self) -> &EngineSelector {
        &self.engines
    }

    fn parse_date(date: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{date}'. Use YYYY-MM-DD"))
    }

    // --- Summary ---

    pub fn get_daily_summary(&self, date: &str) -> Result<DailySummary> {
        let date = Self::parse_date(date)?;
        self.db.build_daily_summary(date, &self.engines)
    }

    pub fn today_summary(&self) -> Result<DailySummary> {
        self.db
            .build_daily_summary(Local::now().date_naive(), &self.engines)
    }

    pub fn current_goals(&self) -> Result<Macros> {
        let settings = self.db.get_settings()?;
        Ok(self.engines.calculate_goals(&settings))
    }

    // --- Entries ---

    pub fn log_entry(&self, date: &str, item_id: i64, grams: f64) -> Result<Entry> {
        let date = Self::parse_date(date)?;
        self.db.insert_entry(&NewEntry {
            item_id,
            grams,
            date,
        })
    }

    pub fn log_entry_today(&self, item_id: i64, grams: f64) -> Result<Entry> {
        self.db.insert_entry(&NewEntry {
            item_id,
            grams,
            date: Local::now().date_naive(),
        })
    }

    pub fn get_entry(&self, id: i64) -> Result<Entry> {
        self.db.get_entry(id)
    }

    pub fn update_entry(&self, id: i64, grams: f64) -> Result<Entry> {
        self.db.update_entry_grams(id, grams)
    }

    pub fn delete_entry(&self, id: i64) -> Result<bool> {
        self.db.delete_entry(id)
    }

    pub fn entries_with_items(&self, date: &str) -> Result<Vec<(Entry, Item)>> {
        let date = Self::parse_date(date)?;
        self.db.entries_with_items(date)
    }

    // --- Items ---

    pub fn add_item(&self, item: &NewItem) -> Result<Item> {
        self.db.insert_item(item)
    }

    pub fn get_item(&self, id: i64) -> Result<Item> {
        self.db.get_item(id)
    }

    pub fn list_items(&self, search: Option<&str>) -> Result<Vec<Item>> {
        match search {
            Some(q) => self.db.search_items(q),
            None => self.db.list_items(),
        }
    }

    pub fn update_item(&self, id: i64, update: &UpdateItem) -> Result<Item> {
        self.db.update_item(id, update)
    }

    /// Delete an item and its entries. Returns the number of entries removed.
    pub fn delete_item(&self, id: i64) -> Result<usize> {
        let (existed, removed) = self.db.delete_item(id)?;
        if !existed {
            bail!("Item not found");
        }
        Ok(removed)
    }

    // --- Settings ---

    pub fn get_settings(&self) -> Result<Settings> {
        self.db.get_settings()
    }

    pub fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings> {
        self.db.update_settings(patch)
    }

    pub fn adjust_calories(&self, delta: f64) -> Result<Settings> {
        self.db.adjust_calories(delta)
    }

    pub fn reset_settings(&self) -> Result<Settings> {
        self.db.reset_settings()
    }

    // --- Raw JSON computation ---

    pub fn goals_from_json(&self, payload: &str) -> Result<Macros> {
        self.engines.goals_from_json(payload)
    }

    pub fn totals_from_json(&self, payload: &str) -> Result<Macros> {
        self.engines.totals_from_json(payload)
    }
}
