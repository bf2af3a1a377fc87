//! Mass unit conversion. Kilograms are the base unit.
//!
//! Both directions use the same constant so a mass and a per-mass ratio
//! converted from the same unit multiply back to the same product.

use crate::models::WeightUnit;

pub const LBS_PER_KG: f64 = 2.20462;

/// Absent or non-finite input counts as zero.
fn coerce(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Express a mass in kilograms.
#[must_use]
pub fn to_base_unit(value: Option<f64>, unit: WeightUnit) -> f64 {
    let value = coerce(value);
    match unit {
        WeightUnit::Lbs => value / LBS_PER_KG,
        WeightUnit::Kg => value,
    }
}

/// Express a "per mass unit" ratio per kilogram.
///
/// A per-pound ratio yields more per kilogram, so this multiplies where
/// [`to_base_unit`] divides.
#[must_use]
pub fn ratio_per_base_unit(value: Option<f64>, unit: WeightUnit) -> f64 {
    let value = coerce(value);
    match unit {
        WeightUnit::Lbs => value * LBS_PER_KG,
        WeightUnit::Kg => value,
    }
}

/// Express a kilogram mass in `unit`. Used for display only.
#[must_use]
pub fn from_base_unit(kg: f64, unit: WeightUnit) -> f64 {
    match unit {
        WeightUnit::Lbs => kg * LBS_PER_KG,
        WeightUnit::Kg => kg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_to_base_unit() {
        assert!((to_base_unit(Some(220.462), WeightUnit::Lbs) - 100.0).abs() < 1e-9);
        assert_eq!(to_base_unit(Some(80.0), WeightUnit::Kg), 80.0);
    }

    #[test]
    fn test_ratio_per_base_unit() {
        assert!((ratio_per_base_unit(Some(1.0), WeightUnit::Lbs) - 2.20462).abs() < 1e-12);
        assert_eq!(ratio_per_base_unit(Some(1.8), WeightUnit::Kg), 1.8);
    }

    #[test]
    fn test_absent_and_non_numeric_coerce_to_zero() {
        assert_eq!(to_base_unit(None, WeightUnit::Lbs), 0.0);
        assert_eq!(to_base_unit(Some(f64::NAN), WeightUnit::Kg), 0.0);
        assert_eq!(ratio_per_base_unit(None, WeightUnit::Lbs), 0.0);
        assert_eq!(ratio_per_base_unit(Some(f64::INFINITY), WeightUnit::Kg), 0.0);
    }

    #[test]
    fn test_from_base_unit() {
        assert!((from_base_unit(100.0, WeightUnit::Lbs) - 220.462).abs() < 1e-9);
        assert_eq!(from_base_unit(100.0, WeightUnit::Kg), 100.0);
    }

    proptest! {
        /// A mass and a ratio stated in the same unit give the same product
        /// whichever unit they start in.
        #[test]
        fn prop_mass_times_ratio_is_unit_independent(kg in 0.0f64..500.0, per_kg in 0.0f64..10.0) {
            let lbs = kg * LBS_PER_KG;
            let per_lb = per_kg / LBS_PER_KG;

            let from_kg = to_base_unit(Some(kg), WeightUnit::Kg)
                * ratio_per_base_unit(Some(per_kg), WeightUnit::Kg);
            let from_lbs = to_base_unit(Some(lbs), WeightUnit::Lbs)
                * ratio_per_base_unit(Some(per_lb), WeightUnit::Lbs);
            let mixed = to_base_unit(Some(lbs), WeightUnit::Lbs)
                * ratio_per_base_unit(Some(per_kg), WeightUnit::Kg);

            prop_assert!((from_kg - from_lbs).abs() <= 1e-9 * from_kg.max(1.0));
            prop_assert!((from_kg - mixed).abs() <= 1e-9 * from_kg.max(1.0));
        }

        #[test]
        fn prop_base_unit_round_trip(value in 0.0f64..1000.0) {
            let kg = to_base_unit(Some(value), WeightUnit::Lbs);
            prop_assert!((from_base_unit(kg, WeightUnit::Lbs) - value).abs() <= 1e-9 * value.max(1.0));
        }
    }
}
