//! Budget aggregate, its lines and their unit-price snapshots.

pub mod line;
pub mod model;
pub mod unit_price;

pub use line::{validate_tree, BudgetLine};
pub use model::{Budget, BudgetRecord, BudgetState, IntegritySeal};
pub use unit_price::{InputSnapshot, UnitPriceSnapshot, UnitPriceSnapshotRecord};
