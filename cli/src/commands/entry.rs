use anyhow::Result;

use macrotrack_core::db::Database;

use super::helpers::{exit_not_found, parse_date, parse_grams, print_entry_table};
use macrotrack_core::models::EntryLine;

pub(crate) fn cmd_entry_list(db: &Database, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let lines: Vec<EntryLine> = db
        .entries_with_items(date)?
        .into_iter()
        .map(|(entry, item)| EntryLine {
            totals: item.macros_for(entry.grams),
            item_name: item.name,
            entry,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(());
    }

    if lines.is_empty() {
        let date = date.format("%Y-%m-%d");
        exit_not_found(&format!("No entries for {date}"), false);
    }

    print_entry_table(&lines);
    Ok(())
}

/// Change the grams of an existing entry. Zero is accepted.
pub(crate) fn cmd_entry_update(db: &Database, id: i64, grams_str: &str, json: bool) -> Result<()> {
    let grams = parse_grams(grams_str)?;
    if db.find_entry(id)?.is_none() {
        exit_not_found(&format!("No entry with ID {id}"), json);
    }

    let entry = db.update_entry_grams(id, grams)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let grams = entry.grams;
        println!("Updated entry {id}: {grams:.0}g");
    }
    Ok(())
}

pub(crate) fn cmd_entry_delete(db: &Database, id: i64, json: bool) -> Result<()> {
    let deleted = db.delete_entry(id)?;

    if !deleted {
        exit_not_found(&format!("No entry with ID {id}"), json);
    }

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted entry {id}");
    }
    Ok(())
}
