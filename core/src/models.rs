use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Fixed key of the settings singleton row.
pub const SETTINGS_ID: &str = "current";

/// The five tracked nutrients, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nutrient {
    Calories,
    Protein,
    Fat,
    Fiber,
    Carbs,
}

impl Nutrient {
    pub const ALL: [Nutrient; 5] = [
        Nutrient::Calories,
        Nutrient::Protein,
        Nutrient::Fat,
        Nutrient::Fiber,
        Nutrient::Carbs,
    ];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Nutrient::Calories => "calories",
            Nutrient::Protein => "protein",
            Nutrient::Fat => "fat",
            Nutrient::Fiber => "fiber",
            Nutrient::Carbs => "carbs",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Nutrient::Calories => "Calories",
            Nutrient::Protein => "Protein",
            Nutrient::Fat => "Fat",
            Nutrient::Fiber => "Fiber",
            Nutrient::Carbs => "Carbs",
        }
    }

    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            Nutrient::Calories => "kcal",
            _ => "g",
        }
    }
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A set of nutrient amounts. Used for an item's declared totals, its
/// per-gram profile, consumed totals and goals alike.
///
/// Missing keys deserialize as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Macros {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub fiber: f64,
    pub carbs: f64,
}

impl Macros {
    pub const ZERO: Macros = Macros {
        calories: 0.0,
        protein: 0.0,
        fat: 0.0,
        fiber: 0.0,
        carbs: 0.0,
    };

    #[must_use]
    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Calories => self.calories,
            Nutrient::Protein => self.protein,
            Nutrient::Fat => self.fat,
            Nutrient::Fiber => self.fiber,
            Nutrient::Carbs => self.carbs,
        }
    }

    pub fn get_mut(&mut self, nutrient: Nutrient) -> &mut f64 {
        match nutrient {
            Nutrient::Calories => &mut self.calories,
            Nutrient::Protein => &mut self.protein,
            Nutrient::Fat => &mut self.fat,
            Nutrient::Fiber => &mut self.fiber,
            Nutrient::Carbs => &mut self.carbs,
        }
    }

    /// Apply `f` to every nutrient, keeping the key set.
    #[must_use]
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Macros {
            calories: f(self.calories),
            protein: f(self.protein),
            fat: f(self.fat),
            fiber: f(self.fiber),
            carbs: f(self.carbs),
        }
    }

    #[must_use]
    pub fn scale(self, factor: f64) -> Self {
        self.map(|v| v * factor)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Nutrient, f64)> + '_ {
        Nutrient::ALL.into_iter().map(|n| (n, self.get(n)))
    }
}

impl Add for Macros {
    type Output = Macros;

    fn add(mut self, rhs: Macros) -> Macros {
        self += rhs;
        self
    }
}

impl AddAssign for Macros {
    fn add_assign(&mut self, rhs: Macros) {
        for n in Nutrient::ALL {
            *self.get_mut(n) += rhs.get(n);
        }
    }
}

// --- Settings ---

/// Mass unit tag. Kilograms are the base unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[serde(alias = "lb")]
    Lbs,
    Kg,
}

impl WeightUnit {
    /// Lenient tag parsing used for stored and host-supplied values.
    /// Anything that is not pound-based is treated as the base unit.
    #[must_use]
    pub fn from_tag_lossy(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "lbs" | "lb" => WeightUnit::Lbs,
            _ => WeightUnit::Kg,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WeightUnit::Lbs => "lbs",
            WeightUnit::Kg => "kg",
        }
    }
}

impl FromStr for WeightUnit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "lbs" | "lb" => Ok(WeightUnit::Lbs),
            "kg" => Ok(WeightUnit::Kg),
            _ => bail!("Invalid unit '{s}'. Use 'kg' or 'lbs'"),
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User body/activity settings. A single record exists per database.
///
/// Absent numbers are kept as `None` and only defaulted at computation time,
/// see [`crate::goals::ResolvedSettings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(deserialize_with = "lenient_number")]
    pub body_weight: Option<f64>,
    #[serde(deserialize_with = "lenient_weight_unit")]
    pub weight_unit: WeightUnit,
    #[serde(deserialize_with = "lenient_number")]
    pub maintenance_calories: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub caloric_adjustment: Option<f64>,
    #[serde(deserialize_with = "lenient_ratio_unit")]
    pub macro_ratio_unit: WeightUnit,
    #[serde(deserialize_with = "lenient_number")]
    pub protein_per_unit: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub fat_per_unit: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub fiber_goal: Option<f64>,
}

impl Default for Settings {
    /// The record written on first launch.
    fn default() -> Self {
        Settings {
            body_weight: None,
            weight_unit: WeightUnit::Lbs,
            maintenance_calories: None,
            caloric_adjustment: Some(0.0),
            macro_ratio_unit: WeightUnit::Kg,
            protein_per_unit: Some(crate::goals::DEFAULT_PROTEIN_PER_UNIT),
            fat_per_unit: Some(crate::goals::DEFAULT_FAT_PER_UNIT),
            fiber_goal: Some(crate::goals::DEFAULT_FIBER_GOAL),
        }
    }
}

impl Settings {
    /// Settings with every numeric field absent.
    #[must_use]
    pub fn empty() -> Self {
        Settings {
            body_weight: None,
            weight_unit: WeightUnit::Lbs,
            maintenance_calories: None,
            caloric_adjustment: None,
            macro_ratio_unit: WeightUnit::Kg,
            protein_per_unit: None,
            fat_per_unit: None,
            fiber_goal: None,
        }
    }

    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(v) = patch.body_weight {
            self.body_weight = v;
        }
        if let Some(u) = patch.weight_unit {
            self.weight_unit = u;
        }
        if let Some(v) = patch.maintenance_calories {
            self.maintenance_calories = v;
        }
        if let Some(v) = patch.caloric_adjustment {
            self.caloric_adjustment = v;
        }
        if let Some(u) = patch.macro_ratio_unit {
            self.macro_ratio_unit = u;
        }
        if let Some(v) = patch.protein_per_unit {
            self.protein_per_unit = v;
        }
        if let Some(v) = patch.fat_per_unit {
            self.fat_per_unit = v;
        }
        if let Some(v) = patch.fiber_goal {
            self.fiber_goal = v;
        }
    }
}

/// Partial settings edit. `Some(None)` clears a numeric field.
#[derive(Debug, Clone, Default)]
#[allow(clippy::option_option)]
pub struct SettingsPatch {
    pub body_weight: Option<Option<f64>>,
    pub weight_unit: Option<WeightUnit>,
    pub maintenance_calories: Option<Option<f64>>,
    pub caloric_adjustment: Option<Option<f64>>,
    pub macro_ratio_unit: Option<WeightUnit>,
    pub protein_per_unit: Option<Option<f64>>,
    pub fat_per_unit: Option<Option<f64>>,
    pub fiber_goal: Option<Option<f64>>,
}

impl SettingsPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body_weight.is_none()
            && self.weight_unit.is_none()
            && self.maintenance_calories.is_none()
            && self.caloric_adjustment.is_none()
            && self.macro_ratio_unit.is_none()
            && self.protein_per_unit.is_none()
            && self.fat_per_unit.is_none()
            && self.fiber_goal.is_none()
    }
}

/// Accepts numbers, numeric strings, booleans, `null` and `""`.
/// Anything unparseable or non-finite becomes `None`.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}

fn lenient_weight_unit<'de, D>(deserializer: D) -> Result<WeightUnit, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .map_or(WeightUnit::Lbs, WeightUnit::from_tag_lossy))
}

fn lenient_ratio_unit<'de, D>(deserializer: D) -> Result<WeightUnit, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .map_or(WeightUnit::Kg, WeightUnit::from_tag_lossy))
}

/// Coerce a loosely typed JSON value to a finite number.
#[must_use]
pub fn number_from_value(value: &serde_json::Value) -> Option<f64> {
    use serde_json::Value;

    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    n.filter(|v| v.is_finite())
}

// --- Items ---

#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub base_grams: f64,
    pub macros: Macros,
    pub per_gram: Macros,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Item {
    /// One-line description, e.g. "Oats: 389 kcal per 100 g".
    #[must_use]
    pub fn summary(&self) -> String {
        if self.base_grams == 0.0 {
            return self.name.clone();
        }
        let name = &self.name;
        let calories = self.macros.calories;
        let base = self.base_grams;
        format!("{name}: {calories:.0} kcal per {base:.0} g")
    }

    /// Nutrient amounts in `grams` of this item.
    #[must_use]
    pub fn macros_for(&self, grams: f64) -> Macros {
        self.per_gram.scale(grams)
    }
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub base_grams: f64,
    pub macros: Macros,
    pub image_data: Option<String>,
}

#[derive(Debug, Clone, Default)]
#[allow(clippy::option_option)]
pub struct UpdateItem {
    pub name: Option<String>,
    pub base_grams: Option<f64>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub carbs: Option<f64>,
    pub fiber: Option<f64>,
    pub image_data: Option<Option<String>>,
}

impl UpdateItem {
    /// Overlay this edit on an existing item's editable fields.
    #[must_use]
    pub fn merged_with(&self, item: &Item) -> NewItem {
        let mut macros = item.macros;
        for (n, v) in [
            (Nutrient::Calories, self.calories),
            (Nutrient::Protein, self.protein),
            (Nutrient::Fat, self.fat),
            (Nutrient::Carbs, self.carbs),
            (Nutrient::Fiber, self.fiber),
        ] {
            if let Some(v) = v {
                *macros.get_mut(n) = v;
            }
        }
        NewItem {
            name: self.name.clone().unwrap_or_else(|| item.name.clone()),
            base_grams: self.base_grams.unwrap_or(item.base_grams),
            macros,
            image_data: self
                .image_data
                .clone()
                .unwrap_or_else(|| item.image_data.clone()),
        }
    }
}

// --- Entries ---

#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub id: i64,
    pub item_id: i64,
    pub grams: f64,
    pub date: NaiveDate,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewEntry {
    pub item_id: i64,
    pub grams: f64,
    pub date: NaiveDate,
}

// --- Daily summary ---

/// A logged entry together with the item it resolved to.
#[derive(Debug, Clone, Serialize)]
pub struct EntryLine {
    pub entry: Entry,
    pub item_name: String,
    pub totals: Macros,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatLine {
    pub nutrient: Nutrient,
    pub consumed: f64,
    pub goal: f64,
}

impl fmt::Display for StatLine {
    /// `"<consumed> / <goal>"`. A zero goal renders as `-` and leaves one
    /// decimal on the consumed amount.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let consumed = self.consumed;
        let goal = self.goal;
        let consumed_text = if goal == 0.0 {
            format!("{consumed:.1}")
        } else {
            format!("{consumed:.0}")
        };
        if goal > 0.0 {
            write!(f, "{consumed_text} / {goal:.0}")
        } else {
            write!(f, "{consumed_text} / -")
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub date: String,
    pub entries: Vec<EntryLine>,
    pub consumed: Macros,
    pub goals: Macros,
    pub stats: Vec<StatLine>,
}

// --- Validation ---

pub fn validate_item(item: &NewItem) -> Result<()> {
    if item.name.trim().is_empty() {
        bail!("Name is required");
    }
    if !item.base_grams.is_finite() || item.base_grams <= 0.0 {
        bail!("Serving mass must be greater than zero");
    }
    for (nutrient, value) in item.macros.iter() {
        if !value.is_finite() || value < 0.0 {
            bail!("{} must be a non-negative number", nutrient.label());
        }
    }
    Ok(())
}

/// Grams for a newly logged entry.
pub fn validate_logged_grams(grams: f64) -> Result<()> {
    if !grams.is_finite() || grams <= 0.0 {
        bail!("Grams consumed must be greater than zero");
    }
    Ok(())
}

/// Grams for an edit of an existing entry. Zero is allowed.
pub fn validate_entry_grams(grams: f64) -> Result<()> {
    if !grams.is_finite() || grams < 0.0 {
        bail!("Grams consumed cannot be negative");
    }
    Ok(())
}
