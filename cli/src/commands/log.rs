use anyhow::Result;
use chrono::Local;

use macrotrack_core::db::Database;
use macrotrack_core::models::{NewEntry, validate_logged_grams};

use super::helpers::{exit_not_found, parse_grams};
use super::resolve_item;

/// Log `grams` of an item against today.
pub(crate) fn cmd_log(
    db: &Database,
    item_query: &str,
    grams_str: &str,
    item_id: Option<i64>,
    json: bool,
) -> Result<()> {
    let grams = parse_grams(grams_str)?;
    validate_logged_grams(grams)?;

    let item = if let Some(id) = item_id {
        match db.find_item(id)? {
            Some(item) => item,
            None => exit_not_found(&format!("No item with ID {id}"), json),
        }
    } else {
        if db.find_item_by_name(item_query)?.is_none()
            && db.search_items(item_query)?.is_empty()
        {
            exit_not_found(&format!("No item found for '{item_query}'"), json);
        }
        resolve_item(db, item_query)?
    };

    let entry = db.insert_entry(&NewEntry {
        item_id: item.id,
        grams,
        date: Local::now().date_naive(),
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let name = &item.name;
        let cal = item.macros_for(entry.grams).calories;
        let id = entry.id;
        println!("Logged [{id}]: {name} {grams:.0}g ({cal:.0} kcal)");
    }

    Ok(())
}
