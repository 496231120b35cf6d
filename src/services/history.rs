use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{PantryError, Result};
use crate::store::models::{decode_list, Donation, Hold, PickupRecord, RecordId};
use crate::store::{StoreClient, HISTORY_PATH, HOLDS_PATH};

use super::catalog::DonationCatalog;

/// One completed pickup in a user's timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Option<RecordId>,
    pub donation_name: String,
    pub requested_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
}

/// Merges completed holds, pickup snapshots and live donations.
#[derive(Clone)]
pub struct HistoryReconciler {
    store: Arc<dyn StoreClient>,
    catalog: DonationCatalog,
}

impl HistoryReconciler {
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        HistoryReconciler {
            catalog: DonationCatalog::new(store.clone()),
            store,
        }
    }

    /// Completed pickups for `user_id`, most recently requested first.
    ///
    /// The holds and pickup-history listings must both succeed; the donation
    /// listing only improves display names.
    pub async fn build_timeline(&self, user_id: &RecordId) -> Result<Vec<HistoryEntry>> {
        if user_id.is_blank() {
            return Err(PantryError::validation("userId is required"));
        }

        let user_query = [("userId", user_id.to_string())];
        let (holds, pickups, donations) = tokio::join!(
            self.store.get(HOLDS_PATH, &user_query),
            self.store.get(HISTORY_PATH, &user_query),
            self.catalog.list_all(),
        );

        let holds = holds?.into_success("Failed to fetch holds history")?;
        let pickups = pickups?.into_success("Failed to fetch pickup history")?;
        let donations = match donations {
            Ok(donations) => donations,
            Err(e) => {
                tracing::warn!("History for user {} falls back to stored names: {}", user_id, e);
                Vec::new()
            }
        };

        Ok(merge_timeline(
            decode_list(holds.body),
            decode_list(pickups.body),
            donations,
        ))
    }
}

/// Pure merge step of [`HistoryReconciler::build_timeline`].
pub fn merge_timeline(holds: Vec<Hold>, pickups: Vec<PickupRecord>, donations: Vec<Donation>) -> Vec<HistoryEntry> {
    let donation_by_id: HashMap<RecordId, Donation> = donations
        .into_iter()
        .filter_map(|d| d.id.clone().map(|id| (id, d)))
        .collect();
    // Later records replace earlier ones for the same donation.
    let pickup_by_donation: HashMap<RecordId, PickupRecord> = pickups
        .into_iter()
        .filter_map(|r| r.donation_id.clone().map(|id| (id, r)))
        .collect();

    let mut entries: Vec<HistoryEntry> = holds
        .into_iter()
        .filter(Hold::is_completed)
        .map(|hold| {
            let pickup = hold.donation_id.as_ref().and_then(|id| pickup_by_donation.get(id));
            let donation = hold.donation_id.as_ref().and_then(|id| donation_by_id.get(id));

            let donation_name = pickup
                .and_then(|p| non_empty(&p.donation_description))
                .or_else(|| donation.and_then(|d| non_empty(&d.description)))
                .unwrap_or_else(|| {
                    let id = hold.donation_id.as_ref().map(RecordId::to_string).unwrap_or_default();
                    format!("Donation {}", id)
                });

            HistoryEntry {
                donation_name,
                requested_at: hold.created_at,
                picked_up_at: pickup.and_then(|p| p.completed_at).or(hold.completed_at),
                id: hold.id,
            }
        })
        .collect();

    entries.sort_by_key(|e| std::cmp::Reverse(e.requested_at.map_or(0, |t| t.timestamp_millis())));
    entries
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}
