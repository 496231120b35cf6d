use crate::error::{PantryError, Result};
use crate::events::{EventBus, PantryEvent};
use crate::services::{HoldManager, Order};
use crate::store::models::{Hold, PickupRecord, RecordId};
use crate::view::ViewState;

/// A user's active orders.
///
/// Orders leave the board only after the store confirms a pickup or a
/// cancellation. Actions on an order that is not on the board are refused
/// locally, so a finished hold is never submitted twice.
pub struct OrderBoard {
    holds: HoldManager,
    user_id: RecordId,
    orders: ViewState<Order>,
    events: Option<EventBus>,
}

impl OrderBoard {
    pub fn new(holds: HoldManager, user_id: RecordId) -> Self {
        OrderBoard {
            holds,
            user_id,
            orders: ViewState::Loading,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> &ViewState<Order> {
        &self.orders
    }

    pub fn orders(&self) -> &[Order] {
        self.orders.items()
    }

    pub fn contains(&self, order_id: &RecordId) -> bool {
        self.orders().iter().any(|o| &o.order_id == order_id)
    }

    pub async fn refresh(&mut self) -> &ViewState<Order> {
        let result = self.holds.list_active(&self.user_id).await;
        if let Err(e) = &result {
            tracing::warn!("Could not load orders for user {}: {}", self.user_id, e);
        }
        self.orders = ViewState::from_result(result);
        &self.orders
    }

    /// Marks the order picked up.
    pub async fn confirm_pickup(&mut self, order_id: &RecordId) -> Result<Option<PickupRecord>> {
        self.ensure_listed(order_id)?;
        let record = self.holds.complete(&self.user_id, order_id).await?;

        self.orders.remove_where(|o| &o.order_id == order_id);
        self.publish(PantryEvent::HoldPickupStatusChanged {
            hold_id: order_id.clone(),
            picked_up: true,
        });
        Ok(record)
    }

    pub async fn cancel(&mut self, order_id: &RecordId) -> Result<Option<Hold>> {
        self.ensure_listed(order_id)?;
        let hold = self.holds.cancel(&self.user_id, order_id).await?;

        self.orders.remove_where(|o| &o.order_id == order_id);
        self.publish(PantryEvent::HoldCancelled { hold_id: order_id.clone() });
        Ok(hold)
    }

    fn ensure_listed(&self, order_id: &RecordId) -> Result<()> {
        if order_id.is_blank() {
            return Err(PantryError::validation("holdId is required"));
        }
        if !self.contains(order_id) {
            return Err(PantryError::validation(format!("order {} is not active", order_id)));
        }
        Ok(())
    }

    fn publish(&self, event: PantryEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}
