use crate::models::Macros;

/// Divide declared totals by the serving mass they were measured over.
///
/// A missing, zero, negative or non-finite serving mass divides by 1, so the
/// profile equals the raw totals.
#[must_use]
pub fn per_gram(totals: &Macros, base_grams: Option<f64>) -> Macros {
    let divisor = match base_grams {
        Some(g) if g.is_finite() && g > 0.0 => g,
        _ => 1.0,
    };
    totals.map(|v| v / divisor)
}
