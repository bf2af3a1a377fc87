mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::commands::{
    SettingField, SettingsArgs, cmd_calc_goals, cmd_calc_totals, cmd_entry_delete,
    cmd_entry_list, cmd_entry_update, cmd_goals, cmd_item_add, cmd_item_delete, cmd_item_list,
    cmd_item_show, cmd_item_update, cmd_log, cmd_settings_adjust, cmd_settings_reset,
    cmd_settings_set, cmd_settings_show, cmd_summary,
};
use crate::config::Config;
use macrotrack_core::db::Database;
use macrotrack_core::engine::EngineSelector;
use macrotrack_core::models::{Macros, UpdateItem};

#[derive(Parser)]
#[command(
    name = "macrotrack",
    version,
    about = "Track what you eat against calorie and macro goals"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's consumed vs goal for each nutrient
    Summary {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the daily goals derived from your settings
    Goals {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log grams of a saved item for today
    Log {
        /// Item name to search for
        item: String,
        /// Grams eaten (e.g. "150" or "150g")
        grams: String,
        /// Log directly by item ID (skip search)
        #[arg(long)]
        item_id: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List, edit or delete logged entries
    Entry {
        #[command(subcommand)]
        command: EntryCommands,
    },
    /// Manage saved food items
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },
    /// View or change body and goal settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Run the goal or totals calculation on a JSON payload read from stdin
    Calc {
        #[command(subcommand)]
        command: CalcCommands,
    },
}

#[derive(Subcommand)]
enum EntryCommands {
    /// List entries for a day with their item details
    List {
        /// Date (YYYY-MM-DD, today or yesterday; default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the grams of an entry
    Update {
        /// Entry ID
        id: i64,
        /// New amount in grams (zero allowed)
        grams: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an entry
    Delete {
        /// Entry ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ItemCommands {
    /// Save a new item from its nutrition label
    Add {
        /// Item name
        name: String,
        /// Serving mass in grams the label values refer to
        #[arg(long)]
        grams: f64,
        /// Calories per serving
        #[arg(long, default_value = "0")]
        calories: f64,
        /// Protein grams per serving
        #[arg(long, default_value = "0")]
        protein: f64,
        /// Fat grams per serving
        #[arg(long, default_value = "0")]
        fat: f64,
        /// Carbohydrate grams per serving
        #[arg(long, default_value = "0")]
        carbs: f64,
        /// Fiber grams per serving
        #[arg(long, default_value = "0")]
        fiber: f64,
        /// Image as an opaque string (e.g. a data URL)
        #[arg(long)]
        image_data: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List saved items, newest first
    List {
        /// Filter by name
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one item with its per-gram profile
    Show {
        /// Item ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an item; logged entries pick up the new values
    Update {
        /// Item ID
        id: i64,
        #[arg(long)]
        name: Option<String>,
        /// Serving mass in grams
        #[arg(long)]
        grams: Option<f64>,
        #[arg(long)]
        calories: Option<f64>,
        #[arg(long)]
        protein: Option<f64>,
        #[arg(long)]
        fat: Option<f64>,
        #[arg(long)]
        carbs: Option<f64>,
        #[arg(long)]
        fiber: Option<f64>,
        /// Replace the stored image
        #[arg(long, conflicts_with = "clear_image")]
        image_data: Option<String>,
        /// Remove the stored image
        #[arg(long)]
        clear_image: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an item and every entry that logged it
    Delete {
        /// Item ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show current settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change one or more settings
    Set {
        /// Body weight, in --weight-unit
        #[arg(long)]
        weight: Option<f64>,
        /// Unit of body weight: kg or lbs
        #[arg(long)]
        weight_unit: Option<String>,
        /// Maintenance calories per day
        #[arg(long)]
        maintenance: Option<f64>,
        /// Daily surplus (+) or deficit (-) in kcal
        #[arg(long, allow_hyphen_values = true)]
        adjustment: Option<f64>,
        /// Unit the protein and fat ratios are per: kg or lbs
        #[arg(long)]
        ratio_unit: Option<String>,
        /// Protein grams per unit of body weight
        #[arg(long)]
        protein: Option<f64>,
        /// Fat grams per unit of body weight
        #[arg(long)]
        fat: Option<f64>,
        /// Daily fiber goal in grams
        #[arg(long)]
        fiber: Option<f64>,
        /// Clear a numeric setting (repeatable)
        #[arg(long, value_enum)]
        clear: Vec<SettingField>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add to the caloric adjustment (e.g. 100 or -100)
    Adjust {
        /// Change in kcal
        #[arg(allow_hyphen_values = true)]
        delta: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore first-launch defaults
    Reset {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum CalcCommands {
    /// Goals from a settings object
    Goals {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Totals from an array of {grams, per_gram} entries
    Totals {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MACROTRACK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let engines = EngineSelector::from_kind(config.engine);

    let db = Database::open(&config.db_path)?;

    match cli.command {
        Commands::Summary { json } => cmd_summary(&db, &engines, json),
        Commands::Goals { json } => cmd_goals(&db, &engines, json),
        Commands::Log {
            item,
            grams,
            item_id,
            json,
        } => cmd_log(&db, &item, &grams, item_id, json),
        Commands::Entry { command } => match command {
            EntryCommands::List { date, json } => cmd_entry_list(&db, date, json),
            EntryCommands::Update { id, grams, json } => cmd_entry_update(&db, id, &grams, json),
            EntryCommands::Delete { id, json } => cmd_entry_delete(&db, id, json),
        },
        Commands::Item { command } => match command {
            ItemCommands::Add {
                name,
                grams,
                calories,
                protein,
                fat,
                carbs,
                fiber,
                image_data,
                json,
            } => cmd_item_add(
                &db,
                &name,
                grams,
                Macros {
                    calories,
                    protein,
                    fat,
                    fiber,
                    carbs,
                },
                image_data,
                json,
            ),
            ItemCommands::List { search, json } => cmd_item_list(&db, search.as_deref(), json),
            ItemCommands::Show { id, json } => cmd_item_show(&db, id, json),
            ItemCommands::Update {
                id,
                name,
                grams,
                calories,
                protein,
                fat,
                carbs,
                fiber,
                image_data,
                clear_image,
                json,
            } => {
                let image_data = if clear_image {
                    Some(None)
                } else {
                    image_data.map(Some)
                };
                let update = UpdateItem {
                    name,
                    base_grams: grams,
                    calories,
                    protein,
                    fat,
                    carbs,
                    fiber,
                    image_data,
                };
                cmd_item_update(&db, id, &update, json)
            }
            ItemCommands::Delete { id, json } => cmd_item_delete(&db, id, json),
        },
        Commands::Settings { command } => match command {
            SettingsCommands::Show { json } => cmd_settings_show(&db, json),
            SettingsCommands::Set {
                weight,
                weight_unit,
                maintenance,
                adjustment,
                ratio_unit,
                protein,
                fat,
                fiber,
                clear,
                json,
            } => {
                let args = SettingsArgs {
                    body_weight: weight,
                    weight_unit,
                    maintenance,
                    adjustment,
                    ratio_unit,
                    protein,
                    fat,
                    fiber,
                    clear,
                };
                cmd_settings_set(&db, &args, json)
            }
            SettingsCommands::Adjust { delta, json } => cmd_settings_adjust(&db, delta, json),
            SettingsCommands::Reset { json } => cmd_settings_reset(&db, json),
        },
        Commands::Calc { command } => match command {
            CalcCommands::Goals { json } => cmd_calc_goals(&engines, json),
            CalcCommands::Totals { json } => cmd_calc_totals(&engines, json),
        },
    }
}
