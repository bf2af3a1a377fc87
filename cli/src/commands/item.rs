use anyhow::Result;

use macrotrack_core::db::Database;
use macrotrack_core::models::{Item, Macros, NewItem, Nutrient, UpdateItem};

use super::helpers::{exit_not_found, print_item_table};

pub(crate) fn cmd_item_add(
    db: &Database,
    name: &str,
    base_grams: f64,
    macros: Macros,
    image_data: Option<String>,
    json: bool,
) -> Result<()> {
    let item = db.insert_item(&NewItem {
        name: name.to_string(),
        base_grams,
        macros,
        image_data,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        let id = item.id;
        let summary = item.summary();
        println!("Added item [{id}] {summary}");
    }
    Ok(())
}

pub(crate) fn cmd_item_list(db: &Database, search: Option<&str>, json: bool) -> Result<()> {
    let items = match search {
        Some(q) => db.search_items(q)?,
        None => db.list_items()?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        exit_not_found("No items found", false);
    }

    let refs: Vec<&Item> = items.iter().collect();
    print_item_table(&refs);
    Ok(())
}

pub(crate) fn cmd_item_show(db: &Database, id: i64, json: bool) -> Result<()> {
    let Some(item) = db.find_item(id)? else {
        exit_not_found(&format!("No item with ID {id}"), json);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
        return Ok(());
    }

    let summary = item.summary();
    println!("[{}] {summary}", item.id);
    for n in Nutrient::ALL {
        let label = n.label();
        let unit = n.unit();
        let total = item.macros.get(n);
        let per_gram = item.per_gram.get(n);
        println!("  {label:<9} {total:>8.1} {unit:<4} ({per_gram:.3}/g)");
    }
    if item.image_data.is_some() {
        println!("  (has image)");
    }
    Ok(())
}

pub(crate) fn cmd_item_update(
    db: &Database,
    id: i64,
    update: &UpdateItem,
    json: bool,
) -> Result<()> {
    if db.find_item(id)?.is_none() {
        exit_not_found(&format!("No item with ID {id}"), json);
    }

    let item = db.update_item(id, update)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        let summary = item.summary();
        println!("Updated item [{id}] {summary}");
    }
    Ok(())
}

pub(crate) fn cmd_item_delete(db: &Database, id: i64, json: bool) -> Result<()> {
    let (existed, removed_entries) = db.delete_item(id)?;

    if !existed {
        exit_not_found(&format!("No item with ID {id}"), json);
    }

    if json {
        println!(
            "{}",
            serde_json::json!({ "deleted": id, "removed_entries": removed_entries })
        );
    } else {
        println!("Deleted item {id} and {removed_entries} logged entries");
    }
    Ok(())
}
