mod calc;
mod entry;
mod helpers;
mod item;
mod log;
mod settings;
mod summary;

use anyhow::{Result, bail};

use macrotrack_core::db::Database;
use macrotrack_core::models::Item;

use helpers::{print_item_table, prompt_choice};

pub(crate) use calc::{cmd_calc_goals, cmd_calc_totals};
pub(crate) use entry::{cmd_entry_delete, cmd_entry_list, cmd_entry_update};
pub(crate) use item::{cmd_item_add, cmd_item_delete, cmd_item_list, cmd_item_show, cmd_item_update};
pub(crate) use log::cmd_log;
pub(crate) use settings::{
    SettingField, SettingsArgs, cmd_settings_adjust, cmd_settings_reset, cmd_settings_set,
    cmd_settings_show,
};
pub(crate) use summary::{cmd_goals, cmd_summary};

/// Resolve an item name to a saved item, prompting when several match.
pub(super) fn resolve_item(db: &Database, query: &str) -> Result<Item> {
    if let Some(exact) = db.find_item_by_name(query)? {
        return Ok(exact);
    }

    let mut matches = db.search_items(query)?;

    if matches.is_empty() {
        bail!("No item found for '{query}'");
    }

    if matches.len() == 1 {
        return Ok(matches.swap_remove(0));
    }

    let refs: Vec<&Item> = matches.iter().collect();
    print_item_table(&refs);
    let idx = prompt_choice(matches.len())?;
    Ok(matches.swap_remove(idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrotrack_core::models::{Macros, NewItem};

    fn add(db: &Database, name: &str) -> Item {
        db.insert_item(&NewItem {
            name: name.to_string(),
            base_grams: 100.0,
            macros: Macros::ZERO,
            image_data: None,
        })
        .unwrap()
    }

    #[test]
    fn test_resolve_single_match() {
        let db = Database::open_in_memory().unwrap();
        let apple = add(&db, "Apple");
        add(&db, "Banana");
        assert_eq!(resolve_item(&db, "app").unwrap().id, apple.id);
    }

    #[test]
    fn test_resolve_prefers_exact_name() {
        let db = Database::open_in_memory().unwrap();
        let milk = add(&db, "Milk");
        add(&db, "Milk Chocolate");
        assert_eq!(resolve_item(&db, "milk").unwrap().id, milk.id);
    }

    #[test]
    fn test_resolve_exact_name_beyond_search_page() {
        let db = Database::open_in_memory().unwrap();
        let milk = add(&db, "Milk");
        for i in 0..25 {
            add(&db, &format!("Milk Chocolate {i}"));
        }
        assert_eq!(resolve_item(&db, "milk").unwrap().id, milk.id);
    }

    #[test]
    fn test_resolve_no_match() {
        let db = Database::open_in_memory().unwrap();
        add(&db, "Apple");
        let err = resolve_item(&db, "kiwi").unwrap_err();
        assert_eq!(err.to_string(), "No item found for 'kiwi'");
    }
}
