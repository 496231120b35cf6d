pub mod catalog;
pub mod history;
pub mod holds;

pub use catalog::{CatalogItem, DonationCatalog, GeoParams, SearchArea};
pub use history::{HistoryEntry, HistoryReconciler};
pub use holds::{HoldManager, Order};
