use crate::admission;
use crate::error::Result;
use crate::events::{EventBus, PantryEvent};
use crate::services::{CatalogItem, DonationCatalog, HoldManager, SearchArea};
use crate::store::models::{HoldReceipt, RecordId};
use crate::view::ViewState;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// The user is at capacity; nothing was sent.
    Gated,
    Placed(HoldReceipt),
}

/// Browsing side of a session: the cached available list and the local count
/// of active holds that gates new requests.
///
/// Both are updated only after the store confirms a hold.
pub struct HomeFeed {
    catalog: DonationCatalog,
    holds: HoldManager,
    user_id: RecordId,
    max_orders: u32,
    available: ViewState<CatalogItem>,
    /// `None` until known; an unknown count gates every request.
    active_count: Option<usize>,
    events: Option<EventBus>,
}

impl HomeFeed {
    pub fn new(catalog: DonationCatalog, holds: HoldManager, user_id: RecordId, max_orders: u32) -> Self {
        HomeFeed {
            catalog,
            holds,
            user_id,
            max_orders,
            available: ViewState::Loading,
            active_count: None,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn available(&self) -> &ViewState<CatalogItem> {
        &self.available
    }

    pub fn active_count(&self) -> Option<usize> {
        self.active_count
    }

    pub fn max_orders(&self) -> u32 {
        self.max_orders
    }

    /// Reloads the donation list for `area` and the user's active-hold count.
    pub async fn load(&mut self, area: &SearchArea) {
        let (items, count) = tokio::join!(
            self.catalog.list_available(area, None),
            self.holds.count_active(&self.user_id),
        );

        if let Err(e) = &items {
            tracing::warn!("Could not load donations: {}", e);
        }
        self.available = ViewState::from_result(items);

        self.active_count = match count {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::warn!("Could not load order count for user {}: {}", self.user_id, e);
                None
            }
        };
    }

    pub fn can_request_more(&self) -> bool {
        admission::can_request_more(self.active_count, self.max_orders)
    }

    pub fn is_request_disabled(&self) -> bool {
        admission::is_request_disabled(self.active_count, self.max_orders)
    }

    /// Requests `donation_id`, unless the user is already at capacity.
    pub async fn request(&mut self, donation_id: &RecordId) -> Result<RequestOutcome> {
        if self.is_request_disabled() {
            tracing::info!(
                "Order limit reached for user {} ({:?} of {}); request disabled",
                self.user_id,
                self.active_count,
                self.max_orders
            );
            return Ok(RequestOutcome::Gated);
        }

        let receipt = self.holds.create(donation_id, &self.user_id).await?;

        self.available
            .remove_where(|item| item.donation_id.as_ref() == Some(donation_id));
        self.active_count = self.active_count.map(|n| n + 1);
        if let Some(events) = &self.events {
            events.publish(PantryEvent::HoldRequested {
                donation_id: donation_id.clone(),
                hold_id: receipt.hold.as_ref().and_then(|h| h.id.clone()),
            });
        }
        Ok(RequestOutcome::Placed(receipt))
    }
}
