use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::error::{PantryError, Result};
use crate::store::models::{decode_entity, decode_list, Donation, Hold, HoldReceipt, PickupRecord, RecordId};
use crate::store::{hold_path, pickup_path, StoreClient, HOLDS_PATH};

use super::catalog::DonationCatalog;

pub const NOT_PROVIDED: &str = "Not provided";

/// An active hold joined with its donation, as shown to its owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: RecordId,
    pub donation_id: RecordId,
    pub item_title: String,
    pub item_description: String,
    pub item_quantity: String,
    pub address: String,
    pub contact_info: String,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Missing donation details degrade to placeholders; the order itself is
    /// always produced.
    pub fn from_parts(hold: Hold, donation: Option<&Donation>) -> Self {
        let donation_id = hold.donation_id.unwrap_or_else(|| RecordId::from(""));
        let detail = |pick: fn(&Donation) -> Option<&String>| {
            donation
                .and_then(pick)
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| NOT_PROVIDED.to_string())
        };

        Order {
            order_id: hold.id.unwrap_or_else(|| RecordId::from("")),
            item_title: donation
                .and_then(|d| d.description.clone())
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| format!("Donation {}", donation_id)),
            item_description: detail(|d| d.donation_type.as_ref()),
            item_quantity: detail(|d| d.quantity.as_ref()),
            address: detail(|d| d.address.as_ref()),
            contact_info: detail(|d| d.donor_contact.as_ref()),
            status: hold
                .status
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|| NOT_PROVIDED.to_string()),
            created_at: hold.created_at,
            expires_at: hold.expires_at,
            donation_id,
        }
    }
}

/// Sole writer of hold state.
#[derive(Clone)]
pub struct HoldManager {
    store: Arc<dyn StoreClient>,
    catalog: DonationCatalog,
}

impl HoldManager {
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        HoldManager {
            catalog: DonationCatalog::new(store.clone()),
            store,
        }
    }

    /// Places a hold on `donation_id` for `user_id`.
    ///
    /// A donation that already has an active hold is rejected by the store and
    /// comes back as an ordinary [`PantryError::Store`].
    pub async fn create(&self, donation_id: &RecordId, user_id: &RecordId) -> Result<HoldReceipt> {
        require(donation_id, "donationId is required")?;
        require(user_id, "userId is required")?;

        let body = json!({ "donationId": donation_id, "userId": user_id });
        let resp = self.store.post(HOLDS_PATH, Some(body)).await?;
        let resp = resp.into_success("Failed to request donation").map_err(|e| {
            tracing::warn!("Hold on donation {} for user {} refused: {}", donation_id, user_id, e);
            e
        })?;

        let receipt = HoldReceipt {
            hold: decode_entity(resp.body.as_ref(), "hold"),
            donation: decode_entity(resp.body.as_ref(), "donation"),
        };
        tracing::info!("User {} placed a hold on donation {}", user_id, donation_id);
        Ok(receipt)
    }

    /// Marks the hold picked up; the store appends a pickup record.
    pub async fn complete(&self, user_id: &RecordId, hold_id: &RecordId) -> Result<Option<PickupRecord>> {
        require(hold_id, "holdId is required")?;

        let resp = self.store.post(&pickup_path(hold_id.as_str()), None).await?;
        let resp = resp.into_success("Failed to confirm pickup").map_err(|e| {
            tracing::warn!("Pickup of hold {} for user {} refused: {}", hold_id, user_id, e);
            e
        })?;

        tracing::info!("User {} picked up hold {}", user_id, hold_id);
        Ok(decode_entity(resp.body.as_ref(), "record"))
    }

    /// Cancels the hold, returning its donation to the available pool.
    pub async fn cancel(&self, user_id: &RecordId, hold_id: &RecordId) -> Result<Option<Hold>> {
        require(hold_id, "holdId is required")?;

        let resp = self.store.delete(&hold_path(hold_id.as_str())).await?;
        let resp = resp.into_success("Failed to cancel hold").map_err(|e| {
            tracing::warn!("Cancel of hold {} for user {} refused: {}", hold_id, user_id, e);
            e
        })?;

        tracing::info!("User {} cancelled hold {}", user_id, hold_id);
        Ok(decode_entity(resp.body.as_ref(), "hold"))
    }

    /// Active holds for `user_id`, each joined with its donation.
    pub async fn list_active(&self, user_id: &RecordId) -> Result<Vec<Order>> {
        require(user_id, "userId is required")?;

        let (holds, donations) = tokio::join!(self.active_holds(user_id), self.all_donations());
        let holds = holds?;
        let by_id: HashMap<RecordId, Donation> = donations
            .into_iter()
            .filter_map(|d| d.id.clone().map(|id| (id, d)))
            .collect();

        Ok(holds
            .into_iter()
            .map(|hold| {
                let donation = hold.donation_id.as_ref().and_then(|id| by_id.get(id));
                Order::from_parts(hold, donation)
            })
            .collect())
    }

    pub async fn count_active(&self, user_id: &RecordId) -> Result<usize> {
        require(user_id, "userId is required")?;
        Ok(self.active_holds(user_id).await?.len())
    }

    async fn active_holds(&self, user_id: &RecordId) -> Result<Vec<Hold>> {
        let query = [("userId", user_id.to_string()), ("active", "true".to_string())];
        let resp = self
            .store
            .get(HOLDS_PATH, &query)
            .await?
            .into_success("Failed to fetch orders")?;
        Ok(decode_list(resp.body))
    }

    /// Enrichment only: a failed listing yields no donations.
    async fn all_donations(&self) -> Vec<Donation> {
        match self.catalog.list_all().await {
            Ok(donations) => donations,
            Err(e) => {
                tracing::warn!("Order details unavailable, using placeholders: {}", e);
                Vec::new()
            }
        }
    }
}

fn require(id: &RecordId, message: &str) -> Result<()> {
    if id.is_blank() {
        Err(PantryError::validation(message))
    } else {
        Ok(())
    }
}
