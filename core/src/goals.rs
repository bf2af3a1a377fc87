//! Daily calorie and macro targets derived from [`Settings`].

use crate::models::{Macros, Settings, WeightUnit};
use crate::units::{ratio_per_base_unit, to_base_unit};

pub const DEFAULT_PROTEIN_PER_UNIT: f64 = 1.8;
pub const DEFAULT_FAT_PER_UNIT: f64 = 0.6;
pub const DEFAULT_FIBER_GOAL: f64 = 25.0;

/// Settings with every absent number replaced by its computation default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSettings {
    pub body_weight: f64,
    pub weight_unit: WeightUnit,
    pub maintenance_calories: f64,
    pub caloric_adjustment: f64,
    pub macro_ratio_unit: WeightUnit,
    pub protein_per_unit: f64,
    pub fat_per_unit: f64,
    pub fiber_goal: f64,
}

fn or_default(value: Option<f64>, default: f64) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(default)
}

impl Settings {
    #[must_use]
    pub fn resolved(&self) -> ResolvedSettings {
        ResolvedSettings {
            body_weight: or_default(self.body_weight, 0.0),
            weight_unit: self.weight_unit,
            maintenance_calories: or_default(self.maintenance_calories, 0.0),
            caloric_adjustment: or_default(self.caloric_adjustment, 0.0),
            macro_ratio_unit: self.macro_ratio_unit,
            protein_per_unit: or_default(self.protein_per_unit, DEFAULT_PROTEIN_PER_UNIT),
            fat_per_unit: or_default(self.fat_per_unit, DEFAULT_FAT_PER_UNIT),
            fiber_goal: or_default(self.fiber_goal, DEFAULT_FIBER_GOAL),
        }
    }
}

/// Compute all five goals. Never fails and never returns a negative
/// calorie goal. There is no carbohydrate formula, so `carbs` is always 0.
#[must_use]
pub fn calculate_goals(settings: &Settings) -> Macros {
    let s = settings.resolved();
    let weight_kg = to_base_unit(Some(s.body_weight), s.weight_unit);

    let calories = (s.maintenance_calories + s.caloric_adjustment).max(0.0);
    let protein = weight_kg * ratio_per_base_unit(Some(s.protein_per_unit), s.macro_ratio_unit);
    let fat = weight_kg * ratio_per_base_unit(Some(s.fat_per_unit), s.macro_ratio_unit);

    Macros {
        calories,
        protein,
        fat,
        fiber: s.fiber_goal,
        carbs: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_settings() {
        let goals = calculate_goals(&Settings::empty());
        assert_eq!(
            goals,
            Macros {
                calories: 0.0,
                protein: 0.0,
                fat: 0.0,
                fiber: 25.0,
                carbs: 0.0,
            }
        );
    }

    #[test]
    fn test_first_launch_settings() {
        let goals = calculate_goals(&Settings::default());
        assert_eq!(goals.calories, 0.0);
        assert_eq!(goals.protein, 0.0);
        assert_eq!(goals.fiber, 25.0);
    }

    #[test]
    fn test_calories_clamped_at_zero() {
        let settings = Settings {
            maintenance_calories: Some(1500.0),
            caloric_adjustment: Some(-5000.0),
            ..Settings::empty()
        };
        assert_eq!(calculate_goals(&settings).calories, 0.0);
    }

    #[test]
    fn test_calories_with_adjustment() {
        let settings = Settings {
            maintenance_calories: Some(2500.0),
            caloric_adjustment: Some(-300.0),
            ..Settings::empty()
        };
        assert_eq!(calculate_goals(&settings).calories, 2200.0);
    }

    #[test]
    fn test_protein_from_pounds_with_per_kg_ratio() {
        let settings = Settings {
            body_weight: Some(200.0),
            weight_unit: WeightUnit::Lbs,
            protein_per_unit: Some(1.8),
            macro_ratio_unit: WeightUnit::Kg,
            ..Settings::empty()
        };
        let goals = calculate_goals(&settings);
        assert!((goals.protein - 200.0 / 2.20462 * 1.8).abs() < 1e-9);
        assert!((goals.protein - 163.3).abs() < 0.05);
        // Fat ratio falls back to 0.6 g/kg
        assert!((goals.fat - 200.0 / 2.20462 * 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_per_pound_ratio() {
        let settings = Settings {
            body_weight: Some(180.0),
            weight_unit: WeightUnit::Lbs,
            protein_per_unit: Some(1.0),
            fat_per_unit: Some(0.3),
            macro_ratio_unit: WeightUnit::Lbs,
            ..Settings::empty()
        };
        let goals = calculate_goals(&settings);
        // 1 g/lb at 180 lb is 180 g
        assert!((goals.protein - 180.0).abs() < 1e-9);
        assert!((goals.fat - 54.0).abs() < 1e-9);
    }

    #[test]
    fn test_fiber_not_unit_converted() {
        let settings = Settings {
            body_weight: Some(90.0),
            weight_unit: WeightUnit::Kg,
            macro_ratio_unit: WeightUnit::Lbs,
            fiber_goal: Some(38.0),
            ..Settings::empty()
        };
        let goals = calculate_goals(&settings);
        assert_eq!(goals.fiber, 38.0);
        assert_eq!(goals.carbs, 0.0);
    }

    #[test]
    fn test_non_finite_numbers_use_defaults() {
        let settings = Settings {
            body_weight: Some(f64::NAN),
            fiber_goal: Some(f64::INFINITY),
            ..Settings::empty()
        };
        let goals = calculate_goals(&settings);
        assert_eq!(goals.protein, 0.0);
        assert_eq!(goals.fiber, 25.0);
    }
}
