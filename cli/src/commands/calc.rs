use anyhow::{Context, Result};
use std::io::{self, Read};

use macrotrack_core::engine::EngineSelector;
use macrotrack_core::models::Macros;

use super::summary::print_macros;

fn read_stdin() -> Result<String> {
    let mut payload = String::new();
    io::stdin()
        .read_to_string(&mut payload)
        .context("Failed to read JSON from stdin")?;
    Ok(payload)
}

fn print(result: &Macros, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print_macros(result);
    }
    Ok(())
}

/// Goals for a settings record read from stdin.
pub(crate) fn cmd_calc_goals(engines: &EngineSelector, json: bool) -> Result<()> {
    let goals = engines.goals_from_json(&read_stdin()?)?;
    print(&goals, json)
}

/// Totals for an array of `{grams, per_gram}` records read from stdin.
pub(crate) fn cmd_calc_totals(engines: &EngineSelector, json: bool) -> Result<()> {
    let totals = engines.totals_from_json(&read_stdin()?)?;
    print(&totals, json)
}
