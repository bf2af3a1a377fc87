//! Interchangeable computation engines for goals and consumed totals.
//!
//! [`JsonEngine`] evaluates over loosely typed JSON records, the shape
//! embedding hosts hand over. [`NativeEngine`] runs the typed arithmetic in
//! [`crate::goals`] and [`crate::aggregate`]. Both must agree numerically;
//! [`EngineSelector`] prefers the primary and falls back to native whenever
//! the primary is missing, errors, or returns an incomplete result.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, bail};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::aggregate::{ConsumedEntry, calculate_consumed_totals};
use crate::goals::{
    DEFAULT_FAT_PER_UNIT, DEFAULT_FIBER_GOAL, DEFAULT_PROTEIN_PER_UNIT, calculate_goals,
};
use crate::models::{Macros, Nutrient, Settings, WeightUnit, number_from_value};
use crate::units::LBS_PER_KG;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("engine returned an empty result")]
    EmptyResult,

    #[error("result is missing '{0}'")]
    MissingField(&'static str),
}

/// A backend able to compute goals and consumed totals.
///
/// Implementations are pure: no shared state, safe to call concurrently.
pub trait NutritionEngine: Send + Sync {
    fn name(&self) -> &'static str;
    fn calculate_goals(&self, settings: &Settings) -> Result<Macros, EngineError>;
    fn calculate_consumed_totals(&self, entries: &[ConsumedEntry]) -> Result<Macros, EngineError>;
}

// --- Native ---

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine;

impl NutritionEngine for NativeEngine {
    fn name(&self) -> &'static str {
        "native"
    }

    fn calculate_goals(&self, settings: &Settings) -> Result<Macros, EngineError> {
        Ok(calculate_goals(settings))
    }

    fn calculate_consumed_totals(&self, entries: &[ConsumedEntry]) -> Result<Macros, EngineError> {
        Ok(calculate_consumed_totals(entries))
    }
}

// --- JSON ---

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEngine;

fn safe_float(value: Option<&Value>, fallback: f64) -> f64 {
    value.and_then(number_from_value).unwrap_or(fallback)
}

fn unit_tag(value: Option<&Value>, fallback: WeightUnit) -> WeightUnit {
    value
        .and_then(Value::as_str)
        .map_or(fallback, WeightUnit::from_tag_lossy)
}

fn weight_to_kg(value: f64, unit: WeightUnit) -> f64 {
    if unit == WeightUnit::Lbs {
        value / LBS_PER_KG
    } else {
        value
    }
}

fn ratio_to_per_kg(value: f64, unit: WeightUnit) -> f64 {
    if unit == WeightUnit::Lbs {
        value * LBS_PER_KG
    } else {
        value
    }
}

impl JsonEngine {
    /// Goals for a settings object. Absent, `null`, empty or non-numeric
    /// fields take their defaults.
    pub fn goals_from_value(&self, settings: &Value) -> Result<Value, EngineError> {
        let empty = Map::new();
        let data = match settings {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(EngineError::InvalidPayload(format!(
                    "settings must be an object, got {}",
                    kind(other)
                )));
            }
        };

        let weight_unit = unit_tag(data.get("weight_unit"), WeightUnit::Lbs);
        let weight_kg = weight_to_kg(safe_float(data.get("body_weight"), 0.0), weight_unit);

        let maintenance = safe_float(data.get("maintenance_calories"), 0.0);
        let adjustment = safe_float(data.get("caloric_adjustment"), 0.0);
        let calories = (maintenance + adjustment).max(0.0);

        let ratio_unit = unit_tag(data.get("macro_ratio_unit"), WeightUnit::Kg);
        let protein_ratio = ratio_to_per_kg(
            safe_float(data.get("protein_per_unit"), DEFAULT_PROTEIN_PER_UNIT),
            ratio_unit,
        );
        let fat_ratio = ratio_to_per_kg(
            safe_float(data.get("fat_per_unit"), DEFAULT_FAT_PER_UNIT),
            ratio_unit,
        );

        let mut goals = Map::new();
        goals.insert("calories".into(), Value::from(calories));
        goals.insert("protein".into(), Value::from(weight_kg * protein_ratio));
        goals.insert("fat".into(), Value::from(weight_kg * fat_ratio));
        goals.insert(
            "fiber".into(),
            Value::from(safe_float(data.get("fiber_goal"), DEFAULT_FIBER_GOAL)),
        );
        goals.insert("carbs".into(), Value::from(0.0));
        Ok(Value::Object(goals))
    }

    /// Consumed totals for an array of `{grams, per_gram}` records.
    pub fn totals_from_value(&self, entries: &Value) -> Result<Value, EngineError> {
        let mut totals: Vec<(&'static str, f64)> =
            Nutrient::ALL.iter().map(|n| (n.key(), 0.0)).collect();

        let list = match entries {
            Value::Array(list) => list.as_slice(),
            Value::Null => &[],
            other => {
                return Err(EngineError::InvalidPayload(format!(
                    "entries must be an array, got {}",
                    kind(other)
                )));
            }
        };

        for entry in list {
            let grams = safe_float(entry.get("grams"), 0.0);
            if grams <= 0.0 {
                continue;
            }
            let per_gram = entry.get("per_gram");
            for (key, total) in &mut totals {
                *total += safe_float(per_gram.and_then(|p| p.get(*key)), 0.0) * grams;
            }
        }

        Ok(Value::Object(
            totals
                .into_iter()
                .map(|(k, v)| (k.to_string(), Value::from(v)))
                .collect(),
        ))
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Read a five-key result record back into [`Macros`]. An empty or partial
/// record is an error so the selector can fall back.
pub fn macros_from_value(value: &Value) -> Result<Macros, EngineError> {
    let map = value.as_object().ok_or(EngineError::EmptyResult)?;
    if map.is_empty() {
        return Err(EngineError::EmptyResult);
    }
    let mut macros = Macros::ZERO;
    for n in Nutrient::ALL {
        let v = map
            .get(n.key())
            .and_then(Value::as_f64)
            .ok_or(EngineError::MissingField(n.key()))?;
        *macros.get_mut(n) = v;
    }
    Ok(macros)
}

impl NutritionEngine for JsonEngine {
    fn name(&self) -> &'static str {
        "json"
    }

    fn calculate_goals(&self, settings: &Settings) -> Result<Macros, EngineError> {
        let payload = serde_json::to_value(settings)
            .map_err(|e| EngineError::InvalidPayload(e.to_string()))?;
        macros_from_value(&self.goals_from_value(&payload)?)
    }

    fn calculate_consumed_totals(&self, entries: &[ConsumedEntry]) -> Result<Macros, EngineError> {
        let payload = serde_json::to_value(entries)
            .map_err(|e| EngineError::InvalidPayload(e.to_string()))?;
        macros_from_value(&self.totals_from_value(&payload)?)
    }
}

// --- Selection ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    #[default]
    Json,
    Native,
}

impl FromStr for EngineKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(EngineKind::Json),
            "native" => Ok(EngineKind::Native),
            _ => bail!("Unknown engine '{s}'. Use 'json' or 'native'"),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Json => f.write_str("json"),
            EngineKind::Native => f.write_str("native"),
        }
    }
}

/// Runs the primary engine and silently falls back to [`NativeEngine`].
pub struct EngineSelector {
    primary: Option<Box<dyn NutritionEngine>>,
}

impl EngineSelector {
    #[must_use]
    pub fn new(primary: Box<dyn NutritionEngine>) -> Self {
        Self {
            primary: Some(primary),
        }
    }

    #[must_use]
    pub fn native_only() -> Self {
        Self { primary: None }
    }

    #[must_use]
    pub fn from_kind(kind: EngineKind) -> Self {
        match kind {
            EngineKind::Json => Self::new(Box::new(JsonEngine)),
            EngineKind::Native => Self::native_only(),
        }
    }

    #[must_use]
    pub fn primary_name(&self) -> Option<&'static str> {
        self.primary.as_ref().map(|e| e.name())
    }

    #[must_use]
    pub fn calculate_goals(&self, settings: &Settings) -> Macros {
        if let Some(primary) = &self.primary {
            match primary.calculate_goals(settings) {
                Ok(goals) => return goals,
                Err(e) => {
                    tracing::warn!(engine = primary.name(), error = %e, "goal calculation failed, using fallback");
                }
            }
        }
        calculate_goals(settings)
    }

    #[must_use]
    pub fn calculate_consumed_totals(&self, entries: &[ConsumedEntry]) -> Macros {
        if let Some(primary) = &self.primary {
            match primary.calculate_consumed_totals(entries) {
                Ok(totals) => return totals,
                Err(e) => {
                    tracing::warn!(engine = primary.name(), error = %e, "totals calculation failed, using fallback");
                }
            }
        }
        calculate_consumed_totals(entries)
    }

    /// Goals for a raw JSON settings payload. `null` means all defaults.
    pub fn goals_from_json(&self, payload: &str) -> anyhow::Result<Macros> {
        let value: Value = serde_json::from_str(payload).context("Invalid JSON")?;
        let settings = match value {
            Value::Null => Settings::empty(),
            Value::Object(_) => serde_json::from_value(value).context("Invalid settings")?,
            other => bail!("Settings must be a JSON object, got {}", kind(&other)),
        };
        Ok(self.calculate_goals(&settings))
    }

    /// Totals for a raw JSON array of `{grams, per_gram}` records.
    pub fn totals_from_json(&self, payload: &str) -> anyhow::Result<Macros> {
        let value: Value = serde_json::from_str(payload).context("Invalid JSON")?;
        let entries: Vec<ConsumedEntry> = match value {
            Value::Null => Vec::new(),
            Value::Array(list) => list
                .into_iter()
                .filter(Value::is_object)
                .map(serde_json::from_value)
                .collect::<Result<_, _>>()
                .context("Invalid entries")?,
            other => bail!("Entries must be a JSON array, got {}", kind(&other)),
        };
        Ok(self.calculate_consumed_totals(&entries))
    }
}

impl Default for EngineSelector {
    fn default() -> Self {
        Self::from_kind(EngineKind::default())
    }
}

impl fmt::Debug for EngineSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSelector")
            .field("primary", &self.primary_name())
            .field("fallback", &NativeEngine.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    struct FailingEngine;

    impl NutritionEngine for FailingEngine {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn calculate_goals(&self, _settings: &Settings) -> Result<Macros, EngineError> {
            Err(EngineError::Unavailable("not loaded".to_string()))
        }

        fn calculate_consumed_totals(
            &self,
            _entries: &[ConsumedEntry],
        ) -> Result<Macros, EngineError> {
            Err(EngineError::Unavailable("not loaded".to_string()))
        }
    }

    struct EmptyEngine;

    impl NutritionEngine for EmptyEngine {
        fn name(&self) -> &'static str {
            "empty"
        }

        fn calculate_goals(&self, _settings: &Settings) -> Result<Macros, EngineError> {
            macros_from_value(&json!({}))
        }

        fn calculate_consumed_totals(
            &self,
            _entries: &[ConsumedEntry],
        ) -> Result<Macros, EngineError> {
            macros_from_value(&json!({"calories": 1.0}))
        }
    }

    fn sample_settings() -> Settings {
        Settings {
            body_weight: Some(185.0),
            weight_unit: WeightUnit::Lbs,
            maintenance_calories: Some(2600.0),
            caloric_adjustment: Some(-400.0),
            macro_ratio_unit: WeightUnit::Lbs,
            protein_per_unit: Some(0.9),
            fat_per_unit: Some(0.35),
            fiber_goal: Some(30.0),
        }
    }

    fn sample_entries() -> Vec<ConsumedEntry> {
        vec![
            ConsumedEntry::new(
                150.0,
                Macros {
                    calories: 1.65,
                    protein: 0.31,
                    fat: 0.036,
                    fiber: 0.0,
                    carbs: 0.0,
                },
            ),
            ConsumedEntry::new(
                0.0,
                Macros {
                    calories: 9.0,
                    ..Macros::ZERO
                },
            ),
            ConsumedEntry::new(
                40.0,
                Macros {
                    calories: 3.89,
                    protein: 0.169,
                    fat: 0.069,
                    fiber: 0.106,
                    carbs: 0.663,
                },
            ),
        ]
    }

    #[test]
    fn test_json_engine_empty_settings() {
        let goals = JsonEngine.goals_from_value(&json!({})).unwrap();
        assert_eq!(
            goals,
            json!({"calories": 0.0, "protein": 0.0, "fat": 0.0, "fiber": 25.0, "carbs": 0.0})
        );
    }

    #[test]
    fn test_json_engine_coerces_loose_values() {
        let goals = JsonEngine
            .goals_from_value(&json!({
                "body_weight": "200",
                "weight_unit": "lbs",
                "maintenance_calories": "",
                "caloric_adjustment": null,
                "protein_per_unit": "oops",
                "fiber_goal": null,
            }))
            .unwrap();
        let m = macros_from_value(&goals).unwrap();
        assert!((m.protein - 200.0 / 2.20462 * 1.8).abs() < 1e-9);
        assert_eq!(m.calories, 0.0);
        assert_eq!(m.fiber, 25.0);
    }

    #[test]
    fn test_json_engine_rejects_wrong_shapes() {
        assert!(matches!(
            JsonEngine.goals_from_value(&json!([1, 2])),
            Err(EngineError::InvalidPayload(_))
        ));
        assert!(matches!(
            JsonEngine.totals_from_value(&json!({"grams": 1})),
            Err(EngineError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_json_engine_totals_null_is_empty() {
        let totals = macros_from_value(&JsonEngine.totals_from_value(&Value::Null).unwrap()).unwrap();
        assert_eq!(totals, Macros::ZERO);
    }

    #[test]
    fn test_macros_from_value_requires_all_keys() {
        assert!(matches!(
            macros_from_value(&json!({})),
            Err(EngineError::EmptyResult)
        ));
        assert!(matches!(
            macros_from_value(&json!({"calories": 1.0, "protein": 2.0})),
            Err(EngineError::MissingField("fat"))
        ));
    }

    #[test]
    fn test_engines_agree_on_sample() {
        let settings = sample_settings();
        let entries = sample_entries();
        assert_eq!(
            JsonEngine.calculate_goals(&settings).unwrap(),
            NativeEngine.calculate_goals(&settings).unwrap()
        );
        assert_eq!(
            JsonEngine.calculate_consumed_totals(&entries).unwrap(),
            NativeEngine.calculate_consumed_totals(&entries).unwrap()
        );
    }

    #[test]
    fn test_selector_falls_back_on_error() {
        let selector = EngineSelector::new(Box::new(FailingEngine));
        let settings = sample_settings();
        let entries = sample_entries();
        assert_eq!(selector.calculate_goals(&settings), calculate_goals(&settings));
        assert_eq!(
            selector.calculate_consumed_totals(&entries),
            calculate_consumed_totals(&entries)
        );
    }

    #[test]
    fn test_selector_falls_back_on_empty_result() {
        let selector = EngineSelector::new(Box::new(EmptyEngine));
        let settings = sample_settings();
        let entries = sample_entries();
        assert_eq!(selector.calculate_goals(&settings), calculate_goals(&settings));
        assert_eq!(
            selector.calculate_consumed_totals(&entries),
            calculate_consumed_totals(&entries)
        );
    }

    #[test]
    fn test_selector_kinds() {
        assert_eq!(EngineSelector::default().primary_name(), Some("json"));
        assert_eq!(EngineSelector::native_only().primary_name(), None);
        assert_eq!("NATIVE".parse::<EngineKind>().unwrap(), EngineKind::Native);
        assert!("python".parse::<EngineKind>().is_err());
    }

    #[test]
    fn test_selector_json_payloads() {
        let selector = EngineSelector::default();
        let goals = selector
            .goals_from_json(r#"{"maintenance_calories": "1800", "caloric_adjustment": 200}"#)
            .unwrap();
        assert_eq!(goals.calories, 2000.0);
        assert_eq!(goals.fiber, 25.0);

        let totals = selector
            .totals_from_json(r#"[{"grams": 200, "per_gram": {"carbs": 0.25}}]"#)
            .unwrap();
        assert!((totals.carbs - 50.0).abs() < 1e-9);

        let loose = selector
            .totals_from_json(
                r#"[{"grams": 10, "per_gram": {"calories": 3, "protein": null, "fat": "0.5"}}, 7, "x"]"#,
            )
            .unwrap();
        assert!((loose.calories - 30.0).abs() < 1e-9);
        assert!((loose.fat - 5.0).abs() < 1e-9);
        assert_eq!(loose.protein, 0.0);
        let native = EngineSelector::native_only()
            .totals_from_json(r#"[{"grams": 10, "per_gram": {"protein": null}}, 7]"#)
            .unwrap();
        assert_eq!(native, Macros::ZERO);

        let err = selector.goals_from_json("42").unwrap_err();
        assert!(err.to_string().contains("number"));
        assert!(selector.totals_from_json("").is_err());
    }

    fn arb_unit() -> impl Strategy<Value = WeightUnit> {
        prop_oneof![Just(WeightUnit::Lbs), Just(WeightUnit::Kg)]
    }

    fn arb_opt(range: std::ops::Range<f64>) -> impl Strategy<Value = Option<f64>> {
        prop::option::of(range)
    }

    prop_compose! {
        fn arb_settings()(
            body_weight in arb_opt(0.0..400.0),
            weight_unit in arb_unit(),
            maintenance_calories in arb_opt(0.0..5000.0),
            caloric_adjustment in arb_opt(-6000.0..2000.0),
            macro_ratio_unit in arb_unit(),
            protein_per_unit in arb_opt(0.0..4.0),
            fat_per_unit in arb_opt(0.0..2.0),
            fiber_goal in arb_opt(0.0..80.0),
        ) -> Settings {
            Settings {
                body_weight,
                weight_unit,
                maintenance_calories,
                caloric_adjustment,
                macro_ratio_unit,
                protein_per_unit,
                fat_per_unit,
                fiber_goal,
            }
        }
    }

    prop_compose! {
        fn arb_entry()(
            grams in -100.0f64..1000.0,
            calories in 0.0f64..9.0,
            protein in 0.0f64..1.0,
            fat in 0.0f64..1.0,
            fiber in 0.0f64..0.5,
            carbs in 0.0f64..1.0,
        ) -> ConsumedEntry {
            ConsumedEntry::new(grams, Macros { calories, protein, fat, fiber, carbs })
        }
    }

    proptest! {
        #[test]
        fn prop_engines_agree_on_goals(settings in arb_settings()) {
            let json = JsonEngine.calculate_goals(&settings).unwrap();
            let native = NativeEngine.calculate_goals(&settings).unwrap();
            for n in Nutrient::ALL {
                prop_assert!((json.get(n) - native.get(n)).abs() <= 1e-9, "{n}");
            }
            prop_assert!(native.calories >= 0.0);
        }

        #[test]
        fn prop_engines_agree_on_totals(entries in prop::collection::vec(arb_entry(), 0..30)) {
            let json = JsonEngine.calculate_consumed_totals(&entries).unwrap();
            let native = NativeEngine.calculate_consumed_totals(&entries).unwrap();
            for n in Nutrient::ALL {
                prop_assert!((json.get(n) - native.get(n)).abs() <= 1e-9, "{n}");
            }
        }
    }
}
