use anyhow::{Result, bail};
use clap::ValueEnum;

use macrotrack_core::db::Database;
use macrotrack_core::models::{Settings, SettingsPatch, WeightUnit};
use macrotrack_core::units::{from_base_unit, to_base_unit};

/// Numeric settings that can be cleared back to "not set".
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SettingField {
    BodyWeight,
    Maintenance,
    Adjustment,
    Protein,
    Fat,
    Fiber,
}

/// Values from `settings set`. Units are strict here; stored values are not.
#[derive(Debug, Default)]
pub(crate) struct SettingsArgs {
    pub body_weight: Option<f64>,
    pub weight_unit: Option<String>,
    pub maintenance: Option<f64>,
    pub adjustment: Option<f64>,
    pub ratio_unit: Option<String>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub clear: Vec<SettingField>,
}

fn finite(name: &str, value: Option<f64>) -> Result<Option<Option<f64>>> {
    match value {
        Some(v) if !v.is_finite() => bail!("{name} must be a finite number"),
        Some(v) => Ok(Some(Some(v))),
        None => Ok(None),
    }
}

pub(crate) fn build_patch(args: &SettingsArgs) -> Result<SettingsPatch> {
    let mut patch = SettingsPatch {
        body_weight: finite("Body weight", args.body_weight)?,
        weight_unit: args
            .weight_unit
            .as_deref()
            .map(str::parse::<WeightUnit>)
            .transpose()?,
        maintenance_calories: finite("Maintenance calories", args.maintenance)?,
        caloric_adjustment: finite("Caloric adjustment", args.adjustment)?,
        macro_ratio_unit: args
            .ratio_unit
            .as_deref()
            .map(str::parse::<WeightUnit>)
            .transpose()?,
        protein_per_unit: finite("Protein ratio", args.protein)?,
        fat_per_unit: finite("Fat ratio", args.fat)?,
        fiber_goal: finite("Fiber goal", args.fiber)?,
    };

    for field in &args.clear {
        let slot = match field {
            SettingField::BodyWeight => &mut patch.body_weight,
            SettingField::Maintenance => &mut patch.maintenance_calories,
            SettingField::Adjustment => &mut patch.caloric_adjustment,
            SettingField::Protein => &mut patch.protein_per_unit,
            SettingField::Fat => &mut patch.fat_per_unit,
            SettingField::Fiber => &mut patch.fiber_goal,
        };
        if matches!(slot, Some(Some(_))) {
            bail!("Cannot both set and clear {field:?}");
        }
        *slot = Some(None);
    }

    Ok(patch)
}

fn print_settings(settings: &Settings) {
    fn num(v: Option<f64>) -> String {
        v.map_or_else(|| "not set".to_string(), |v| format!("{v}"))
    }

    let unit = settings.weight_unit;
    let ratio_unit = settings.macro_ratio_unit;
    match settings.body_weight {
        Some(w) => {
            let other = match unit {
                WeightUnit::Lbs => WeightUnit::Kg,
                WeightUnit::Kg => WeightUnit::Lbs,
            };
            let converted = from_base_unit(to_base_unit(Some(w), unit), other);
            println!("  Body weight:   {w} {unit} ({converted:.1} {other})");
        }
        None => println!("  Body weight:   not set ({unit})"),
    }
    println!("  Maintenance:   {} kcal", num(settings.maintenance_calories));
    println!("  Adjustment:    {} kcal", num(settings.caloric_adjustment));
    println!("  Protein ratio: {} g/{ratio_unit}", num(settings.protein_per_unit));
    println!("  Fat ratio:     {} g/{ratio_unit}", num(settings.fat_per_unit));
    println!("  Fiber goal:    {} g", num(settings.fiber_goal));
}

fn print_result(settings: &Settings, heading: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(settings)?);
    } else {
        println!("{heading}");
        print_settings(settings);
    }
    Ok(())
}

pub(crate) fn cmd_settings_show(db: &Database, json: bool) -> Result<()> {
    let settings = db.get_settings()?;
    print_result(&settings, "Settings:", json)
}

pub(crate) fn cmd_settings_set(db: &Database, args: &SettingsArgs, json: bool) -> Result<()> {
    let patch = build_patch(args)?;
    if patch.is_empty() {
        bail!("Nothing to change. Pass at least one setting, see `macrotrack settings set --help`");
    }
    let settings = db.update_settings(&patch)?;
    print_result(&settings, "Settings updated:", json)
}

pub(crate) fn cmd_settings_adjust(db: &Database, delta: f64, json: bool) -> Result<()> {
    if !delta.is_finite() {
        bail!("Adjustment must be a finite number");
    }
    let settings = db.adjust_calories(delta)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        let total = settings.caloric_adjustment.unwrap_or(0.0);
        println!("Caloric adjustment: {total:+.0} kcal");
    }
    Ok(())
}

pub(crate) fn cmd_settings_reset(db: &Database, json: bool) -> Result<()> {
    let settings = db.reset_settings()?;
    print_result(&settings, "Settings reset to defaults:", json)
}
