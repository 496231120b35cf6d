//! Typed notifications from the coordinator to sibling views.

use std::fmt;
use std::str::FromStr;

use tokio::sync::mpsc;

use crate::store::models::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Home,
    Orders,
    History,
    Account,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Home => "home",
            View::Orders => "orders",
            View::History => "history",
            View::Account => "account",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(View::Home),
            "orders" => Ok(View::Orders),
            "history" => Ok(View::History),
            "account" => Ok(View::Account),
            other => Err(format!("unknown view: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PantryEvent {
    NavigationChanged { view: View },
    HoldRequested { donation_id: RecordId, hold_id: Option<RecordId> },
    HoldPickupStatusChanged { hold_id: RecordId, picked_up: bool },
    HoldCancelled { hold_id: RecordId },
}

/// Sending half handed to coordinators; clone it freely.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<PantryEvent>,
}

pub type EventReceiver = mpsc::UnboundedReceiver<PantryEvent>;

pub fn channel() -> (EventBus, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventBus { tx }, rx)
}

impl EventBus {
    /// Delivers `event` if anyone still listens; otherwise drops it.
    pub fn publish(&self, event: PantryEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::debug!("Dropping event with no subscriber: {:?}", e.0);
        }
    }

    pub fn navigate(&self, view: View) {
        self.publish(PantryEvent::NavigationChanged { view });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_typed_payloads_in_order() {
        let (bus, mut rx) = channel();
        bus.navigate(View::Orders);
        bus.publish(PantryEvent::HoldCancelled { hold_id: RecordId::from(3) });

        assert_eq!(rx.recv().await, Some(PantryEvent::NavigationChanged { view: View::Orders }));
        assert_eq!(rx.recv().await, Some(PantryEvent::HoldCancelled { hold_id: RecordId::from(3) }));
    }

    #[test]
    fn publishing_without_subscriber_is_harmless() {
        let (bus, rx) = channel();
        drop(rx);
        bus.navigate(View::History);
    }

    #[test]
    fn views_parse_from_menu_names() {
        assert_eq!("Orders".parse::<View>(), Ok(View::Orders));
        assert!("settings".parse::<View>().is_err());
        assert_eq!(View::Account.to_string(), "account");
    }
}
