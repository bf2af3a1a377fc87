use anyhow::Result;
use chrono::Local;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use macrotrack_core::db::Database;
use macrotrack_core::engine::EngineSelector;
use macrotrack_core::models::{Macros, Nutrient, StatLine};

use super::helpers::{no_neg_zero, print_entry_table};

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Nutrient")]
    nutrient: String,
    #[tabled(rename = "Consumed / Goal")]
    progress: String,
}

fn print_stats(stats: &[StatLine]) {
    let rows: Vec<StatRow> = stats
        .iter()
        .map(|s| StatRow {
            nutrient: format!("{} ({})", s.nutrient.label(), s.nutrient.unit()),
            progress: StatLine {
                consumed: no_neg_zero(s.consumed),
                ..*s
            }
            .to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

/// Today's consumed-vs-goal for each nutrient, followed by today's entries.
pub(crate) fn cmd_summary(db: &Database, engines: &EngineSelector, json: bool) -> Result<()> {
    let today = Local::now().date_naive();
    let summary = db.build_daily_summary(today, engines)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let date = &summary.date;
    println!("=== {date} ===\n");
    print_stats(&summary.stats);

    if summary.entries.is_empty() {
        println!("\nNothing logged yet today.");
    } else {
        println!();
        print_entry_table(&summary.entries);
    }

    Ok(())
}

pub(crate) fn cmd_goals(db: &Database, engines: &EngineSelector, json: bool) -> Result<()> {
    let settings = db.get_settings()?;
    let goals = engines.calculate_goals(&settings);

    if json {
        println!("{}", serde_json::to_string_pretty(&goals)?);
        return Ok(());
    }

    print_macros(&goals);
    Ok(())
}

pub(super) fn print_macros(macros: &Macros) {
    for n in Nutrient::ALL {
        let label = n.label();
        let unit = n.unit();
        let value = no_neg_zero(macros.get(n));
        println!("  {label:<9} {value:>8.1} {unit}");
    }
}
