use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::store::models::{decode_list, Donation, RecordId};
use crate::store::{StoreClient, DONATIONS_PATH};

const DEFAULT_RADIUS: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoParams {
    pub lat: f64,
    pub lng: f64,
    pub radius: f64,
}

const UNKNOWN_REGION: GeoParams = GeoParams { lat: 0.0, lng: 0.0, radius: DEFAULT_RADIUS };

const REGIONS: &[(&str, GeoParams)] = &[
    ("PA", GeoParams { lat: 40.4406, lng: -79.9959, radius: DEFAULT_RADIUS }),
    ("CA", GeoParams { lat: 34.0522, lng: -118.2437, radius: DEFAULT_RADIUS }),
];

/// Where to look for donations.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchArea {
    /// Region code such as `PA`. Unknown codes search around (0, 0).
    Region(String),
    Point(GeoParams),
}

impl SearchArea {
    pub fn region(code: impl Into<String>) -> Self {
        SearchArea::Region(code.into())
    }

    pub fn point(lat: f64, lng: f64, radius: f64) -> Self {
        SearchArea::Point(GeoParams { lat, lng, radius })
    }

    pub fn resolve(&self) -> GeoParams {
        match self {
            SearchArea::Point(params) => *params,
            SearchArea::Region(code) => {
                let code = code.trim().to_uppercase();
                REGIONS
                    .iter()
                    .find(|(name, _)| *name == code)
                    .map(|(_, params)| *params)
                    .unwrap_or(UNKNOWN_REGION)
            }
        }
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let GeoParams { lat, lng, radius } = self.resolve();
        vec![
            ("lat", lat.to_string()),
            ("lng", lng.to_string()),
            ("radius", radius.to_string()),
        ]
    }
}

/// Display shape of an available donation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub donation_id: Option<RecordId>,
    pub title: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub donation_type: Option<String>,
    pub quantity: Option<String>,
    pub donor_name: Option<String>,
    pub donor_contact: Option<String>,
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub is_held: Option<bool>,
}

impl From<Donation> for CatalogItem {
    fn from(d: Donation) -> Self {
        CatalogItem {
            donation_id: d.id,
            title: d.description,
            expiration_date: d.expires_at,
            donation_type: d.donation_type,
            quantity: d.quantity,
            donor_name: d.donor_name,
            donor_contact: d.donor_contact,
            address: d.address,
            lat: d.lat,
            lng: d.lng,
            is_held: d.is_held,
        }
    }
}

/// Reads donations from the store. Performs no filtering of its own.
#[derive(Clone)]
pub struct DonationCatalog {
    store: Arc<dyn StoreClient>,
}

impl DonationCatalog {
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        DonationCatalog { store }
    }

    /// Available donations in `area`, truncated to `limit` when it is a
    /// finite value of at least one.
    pub async fn list_available(&self, area: &SearchArea, limit: Option<f64>) -> Result<Vec<CatalogItem>> {
        let donations = self.fetch(area, "Failed to fetch donations").await?;
        let mut items: Vec<CatalogItem> = donations.into_iter().map(CatalogItem::from).collect();
        if let Some(max) = effective_limit(limit) {
            items.truncate(max);
        }
        Ok(items)
    }

    pub async fn count_available(&self, area: &SearchArea) -> Result<usize> {
        Ok(self.fetch(area, "Failed to fetch donation count").await?.len())
    }

    /// Every donation the store knows, held or not, each flagged with `isHeld`.
    pub async fn list_all(&self) -> Result<Vec<Donation>> {
        let resp = self
            .store
            .get(DONATIONS_PATH, &[("showAll", "true".to_string())])
            .await?
            .into_success("Failed to fetch donations")?;
        Ok(decode_list(resp.body))
    }

    async fn fetch(&self, area: &SearchArea, fallback: &str) -> Result<Vec<Donation>> {
        let resp = self.store.get(DONATIONS_PATH, &area.query()).await?;
        let resp = resp.into_success(fallback).map_err(|e| {
            tracing::warn!("Donation listing failed: {}", e);
            e
        })?;
        Ok(decode_list(resp.body))
    }
}

fn effective_limit(limit: Option<f64>) -> Option<usize> {
    let limit = limit?.floor();
    if limit.is_finite() && limit >= 1.0 {
        Some(limit as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PantryError;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn catalog(store: MemoryStore) -> (Arc<MemoryStore>, DonationCatalog) {
        let store = Arc::new(store);
        (store.clone(), DonationCatalog::new(store))
    }

    #[test]
    fn regions_resolve_case_insensitively_with_permissive_fallback() {
        assert_eq!(SearchArea::region("pa").resolve(), SearchArea::point(40.4406, -79.9959, 50.0).resolve());
        assert_eq!(SearchArea::region("CA").resolve().lng, -118.2437);
        assert_eq!(SearchArea::region("ZZ").resolve(), UNKNOWN_REGION);
        assert_eq!(SearchArea::region("").resolve(), UNKNOWN_REGION);
    }

    #[test]
    fn query_matches_store_parameters() {
        assert_eq!(
            SearchArea::region("PA").query(),
            vec![
                ("lat", "40.4406".to_string()),
                ("lng", "-79.9959".to_string()),
                ("radius", "50".to_string()),
            ]
        );
    }

    #[test]
    fn limits_below_one_or_non_finite_mean_unlimited() {
        assert_eq!(effective_limit(None), None);
        assert_eq!(effective_limit(Some(0.0)), None);
        assert_eq!(effective_limit(Some(-2.0)), None);
        assert_eq!(effective_limit(Some(0.5)), None);
        assert_eq!(effective_limit(Some(f64::NAN)), None);
        assert_eq!(effective_limit(Some(f64::INFINITY)), None);
        assert_eq!(effective_limit(Some(2.9)), Some(2));
    }

    #[tokio::test]
    async fn maps_store_records_into_catalog_items() {
        let (_, catalog) = catalog(MemoryStore::seeded());
        let items = catalog.list_available(&SearchArea::region("PA"), Some(2.0)).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].donation_id, Some(RecordId::from("DON-001")));
        assert_eq!(items[0].title.as_deref(), Some("Assorted fresh vegetables (carrots, broccoli, peppers)"));
        assert_eq!(items[0].is_held, Some(false));
        assert_eq!(catalog.count_available(&SearchArea::region("PA")).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn sparse_records_map_without_failing() {
        let (_, catalog) = catalog(MemoryStore::with_donations(vec![Donation {
            id: Some(RecordId::from(42)),
            ..Donation::default()
        }]));
        let items = catalog.list_available(&SearchArea::region("nowhere"), None).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, None);
        assert_eq!(items[0].expiration_date, None);
        assert_eq!(serde_json::to_value(&items[0]).unwrap()["donationId"], json!(42));
    }

    #[tokio::test]
    async fn failures_become_structured_errors() {
        let (store, catalog) = catalog(MemoryStore::seeded());
        store.inject_failure("/donations", 500, None);
        let err = catalog.list_available(&SearchArea::region("PA"), None).await.unwrap_err();
        assert_eq!(
            err,
            PantryError::Store { status: 500, message: "Failed to fetch donations (500)".into() }
        );

        store.inject_failure("/donations", 503, Some("inventory offline"));
        let err = catalog.count_available(&SearchArea::region("PA")).await.unwrap_err();
        assert_eq!(err.to_string(), "inventory offline");
    }

    #[tokio::test]
    async fn list_all_includes_held_donations() {
        let (store, catalog) = catalog(MemoryStore::seeded());
        crate::services::HoldManager::new(store.clone())
            .create(&RecordId::from("DON-004"), &RecordId::from(1))
            .await
            .unwrap();

        let all = catalog.list_all().await.unwrap();
        assert_eq!(all.len(), 5);
        let held: Vec<_> = all.iter().filter(|d| d.is_held == Some(true)).collect();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].id, Some(RecordId::from("DON-004")));
        assert_eq!(store.request_log().last().map(String::as_str), Some("GET /donations"));
    }
}
