//! Summing what was eaten today and lining it up against goals.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::EngineSelector;
use crate::models::{DailySummary, Entry, EntryLine, Item, Macros, Nutrient, Settings, StatLine};

/// The minimal shape the aggregator needs from a logged entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsumedEntry {
    #[serde(default, deserialize_with = "lenient_grams")]
    pub grams: f64,
    #[serde(default, deserialize_with = "lenient_macros")]
    pub per_gram: Macros,
}

impl ConsumedEntry {
    #[must_use]
    pub fn new(grams: f64, per_gram: Macros) -> Self {
        Self { grams, per_gram }
    }
}

impl From<(&Entry, &Item)> for ConsumedEntry {
    fn from((entry, item): (&Entry, &Item)) -> Self {
        Self::new(entry.grams, item.per_gram)
    }
}

fn lenient_grams<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(crate::models::number_from_value(&value).unwrap_or(0.0))
}

/// Missing, null, non-numeric or non-object values count as 0.
fn lenient_macros<'de, D>(deserializer: D) -> Result<Macros, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let mut macros = Macros::ZERO;
    if let Some(map) = value.as_object() {
        for n in Nutrient::ALL {
            *macros.get_mut(n) = map
                .get(n.key())
                .and_then(crate::models::number_from_value)
                .unwrap_or(0.0);
        }
    }
    Ok(macros)
}

/// Sum `per_gram × grams` over all entries. Entries with non-positive grams
/// contribute nothing.
#[must_use]
pub fn calculate_consumed_totals(entries: &[ConsumedEntry]) -> Macros {
    let mut totals = Macros::ZERO;
    for entry in entries {
        if entry.grams.is_nan() || entry.grams <= 0.0 {
            continue;
        }
        for n in Nutrient::ALL {
            *totals.get_mut(n) += entry.per_gram.get(n) * entry.grams;
        }
    }
    totals
}

/// Pair each entry with its item, dropping entries whose item no longer
/// exists. Result is in logging order (ascending id).
#[must_use]
pub fn join_entries_with_items(mut entries: Vec<Entry>, items: Vec<Item>) -> Vec<(Entry, Item)> {
    let by_id: HashMap<i64, Item> = items.into_iter().map(|i| (i.id, i)).collect();
    entries.sort_by_key(|e| e.id);

    let mut joined = Vec::with_capacity(entries.len());
    for entry in entries {
        // Several entries may share an item, so clone rather than remove.
        match by_id.get(&entry.item_id) {
            Some(item) => joined.push((entry, item.clone())),
            None => {
                tracing::debug!(
                    entry_id = entry.id,
                    item_id = entry.item_id,
                    "skipping entry with missing item"
                );
            }
        }
    }
    joined
}

/// Build the consumed-vs-goal view for one day.
#[must_use]
pub fn build_daily_summary(
    date: NaiveDate,
    joined: &[(Entry, Item)],
    settings: &Settings,
    engines: &EngineSelector,
) -> DailySummary {
    let consumed_input: Vec<ConsumedEntry> = joined
        .iter()
        .map(|(e, i)| ConsumedEntry::from((e, i)))
        .collect();

    let consumed = engines.calculate_consumed_totals(&consumed_input);
    let goals = engines.calculate_goals(settings);

    let entries = joined
        .iter()
        .map(|(entry, item)| EntryLine {
            entry: entry.clone(),
            item_name: item.name.clone(),
            totals: item.macros_for(entry.grams),
        })
        .collect();

    let stats = Nutrient::ALL
        .into_iter()
        .map(|nutrient| StatLine {
            nutrient,
            consumed: consumed.get(nutrient),
            goal: goals.get(nutrient),
        })
        .collect();

    DailySummary {
        date: date.format("%Y-%m-%d").to_string(),
        entries,
        consumed,
        goals,
        stats,
    }
}
