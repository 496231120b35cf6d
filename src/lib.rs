//! Reservation client for the food rescue donation store.
//!
//! Donations are browsed through [`DonationCatalog`], reserved, picked up or
//! cancelled through [`HoldManager`], tracked as orders on an [`OrderBoard`]
//! and reviewed as a merged timeline from [`HistoryReconciler`]. All of them
//! talk to the store through an injected [`StoreClient`].

use std::sync::Arc;

pub mod admission;
pub mod config;
pub mod error;
pub mod events;
pub mod orders;
pub mod services;
pub mod session;
pub mod store;
pub mod view;

pub use admission::{can_request_more, is_request_disabled};
pub use config::ClientConfig;
pub use error::{PantryError, Result};
pub use orders::OrderBoard;
pub use services::{
    CatalogItem, DonationCatalog, HistoryEntry, HistoryReconciler, HoldManager, Order, SearchArea,
};
pub use session::{HomeFeed, RequestOutcome};
pub use store::models::{Donation, Hold, HoldStatus, PickupRecord, RecordId};
pub use store::{HttpStore, MemoryStore, StoreClient};
pub use view::ViewState;

/// Entry point wiring every component to one store.
#[derive(Clone)]
pub struct PantryClient {
    store: Arc<dyn StoreClient>,
    config: ClientConfig,
}

impl PantryClient {
    /// Client for the HTTP store described by `config`.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let store = HttpStore::new(&config)?;
        tracing::info!("Using donation store at {}", store.base_url());
        Ok(Self::with_store(Arc::new(store), config))
    }

    pub fn with_store(store: Arc<dyn StoreClient>, config: ClientConfig) -> Self {
        PantryClient { store, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn catalog(&self) -> DonationCatalog {
        DonationCatalog::new(self.store.clone())
    }

    pub fn holds(&self) -> HoldManager {
        HoldManager::new(self.store.clone())
    }

    pub fn history(&self) -> HistoryReconciler {
        HistoryReconciler::new(self.store.clone())
    }

    pub fn home_feed(&self, user_id: RecordId) -> HomeFeed {
        HomeFeed::new(self.catalog(), self.holds(), user_id, self.config.max_orders)
    }

    pub fn order_board(&self, user_id: RecordId) -> OrderBoard {
        OrderBoard::new(self.holds(), user_id)
    }
}
