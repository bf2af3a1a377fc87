//! Nutrition tracking core: reusable food items, daily entries, and
//! calorie/macro goals derived from body settings.

pub mod aggregate;
pub mod db;
pub mod engine;
pub mod goals;
pub mod models;
pub mod nutrition;
pub mod service;
pub mod units;
