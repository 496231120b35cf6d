//! In-process store with the reference store's observable behaviour.
//!
//! Used by tests and local development. It keeps the active-hold uniqueness
//! rule, lazily expires holds that outlive their reservation window and writes
//! a pickup snapshot whenever a hold completes.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use super::lenient;
use super::models::{Donation, Hold, HoldStatus, PickupRecord, RecordId};
use super::{StoreClient, StoreResponse};
use crate::error::Result;

/// Reservation window applied to new holds.
pub const HOLD_DURATION_HOURS: i64 = 2;

#[derive(Default)]
struct StoreState {
    donations: Vec<Donation>,
    holds: Vec<Hold>,
    history: Vec<PickupRecord>,
    next_hold_id: i64,
    next_record_id: i64,
    failures: HashMap<String, (u16, Option<String>)>,
    requests: Vec<String>,
}

impl StoreState {
    fn expire_stale(&mut self, now: DateTime<Utc>) {
        for hold in self.holds.iter_mut() {
            let lapsed = hold.expires_at.is_some_and(|at| at <= now);
            if hold.status == Some(HoldStatus::Active) && lapsed {
                hold.status = Some(HoldStatus::Expired);
            }
        }
    }

    fn unavailable_ids(&self) -> HashSet<RecordId> {
        self.holds
            .iter()
            .filter(|h| matches!(h.status, Some(HoldStatus::Active) | Some(HoldStatus::Completed)))
            .filter_map(|h| h.donation_id.clone())
            .collect()
    }

    fn donation(&self, id: &RecordId) -> Option<&Donation> {
        self.donations.iter().find(|d| d.id.as_ref() == Some(id))
    }

    fn active_hold_mut(&mut self, hold_id: &str) -> Option<&mut Hold> {
        self.holds.iter_mut().find(|h| {
            h.id.as_ref().is_some_and(|id| id.as_str() == hold_id)
                && h.status == Some(HoldStatus::Active)
        })
    }
}

struct SampleDonation {
    id: &'static str,
    description: &'static str,
    kind: &'static str,
    quantity: &'static str,
    donor: &'static str,
    phone: &'static str,
    address: &'static str,
    lat: f64,
    lng: f64,
    expires: &'static str,
}

impl SampleDonation {
    fn to_donation(&self) -> Donation {
        Donation {
            id: Some(RecordId::from(self.id)),
            description: Some(self.description.to_string()),
            donation_type: Some(self.kind.to_string()),
            quantity: Some(self.quantity.to_string()),
            expires_at: lenient::parse_timestamp_str(self.expires),
            donor_name: Some(self.donor.to_string()),
            donor_contact: Some(self.phone.to_string()),
            address: Some(self.address.to_string()),
            lat: Some(self.lat),
            lng: Some(self.lng),
            is_held: None,
        }
    }
}

const SAMPLE_DONATIONS: &[SampleDonation] = &[
    SampleDonation {
        id: "DON-001",
        description: "Assorted fresh vegetables (carrots, broccoli, peppers)",
        kind: "Produce",
        quantity: "~20 lbs",
        donor: "Pittsburgh Fresh Market",
        phone: "412-555-0101",
        address: "100 Market Square, Pittsburgh, PA 15222",
        lat: 40.4406,
        lng: -79.9959,
        expires: "2026-02-15T18:00:00Z",
    },
    SampleDonation {
        id: "DON-002",
        description: "Leftover catered sandwiches and wraps",
        kind: "Prepared Food",
        quantity: "30 servings",
        donor: "CMU Cohon Center",
        phone: "412-555-0202",
        address: "5032 Forbes Ave, Pittsburgh, PA 15213",
        lat: 40.4433,
        lng: -79.9423,
        expires: "2026-02-12T20:00:00Z",
    },
    SampleDonation {
        id: "DON-003",
        description: "Canned soups and pasta (assorted, near sell-by date)",
        kind: "Canned Goods",
        quantity: "2 cases",
        donor: "Giant Eagle - Squirrel Hill",
        phone: "412-555-0303",
        address: "5550 Forward Ave, Pittsburgh, PA 15217",
        lat: 40.4381,
        lng: -79.9226,
        expires: "2026-03-01T23:59:00Z",
    },
    SampleDonation {
        id: "DON-004",
        description: "Bakery items: bread loaves, rolls, and muffins",
        kind: "Bakery",
        quantity: "~15 items",
        donor: "Allegro Hearth Bakery",
        phone: "412-555-0404",
        address: "5719 Bartlett St, Pittsburgh, PA 15217",
        lat: 40.4385,
        lng: -79.9245,
        expires: "2026-02-12T17:00:00Z",
    },
    SampleDonation {
        id: "DON-005",
        description: "Dairy products: milk, yogurt, cheese (refrigerated)",
        kind: "Dairy",
        quantity: "~10 lbs",
        donor: "Trader Joe's - East Liberty",
        phone: "412-555-0505",
        address: "6343 Penn Ave, Pittsburgh, PA 15206",
        lat: 40.4615,
        lng: -79.9246,
        expires: "2026-02-14T12:00:00Z",
    },
];

pub struct MemoryStore {
    state: Mutex<StoreState>,
    hold_duration: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            state: Mutex::new(StoreState {
                next_hold_id: 1,
                next_record_id: 1,
                ..StoreState::default()
            }),
            hold_duration: Duration::hours(HOLD_DURATION_HOURS),
        }
    }

    pub fn with_donations(donations: Vec<Donation>) -> Self {
        let store = Self::new();
        store.lock().donations = donations;
        store
    }

    /// A small Pittsburgh inventory for local runs.
    pub fn seeded() -> Self {
        Self::with_donations(SAMPLE_DONATIONS.iter().map(SampleDonation::to_donation).collect())
    }

    pub fn with_hold_duration(mut self, duration: Duration) -> Self {
        self.hold_duration = duration;
        self
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_donation(&self, donation: Donation) {
        self.lock().donations.push(donation);
    }

    /// Drops a donation from the inventory, as a donor-side withdrawal would.
    pub fn remove_donation(&self, id: &RecordId) {
        self.lock().donations.retain(|d| d.id.as_ref() != Some(id));
    }

    /// Stores a hold as given, assigning an id when it has none.
    pub fn insert_hold(&self, mut hold: Hold) -> RecordId {
        let mut state = self.lock();
        let id = match hold.id.clone() {
            Some(id) => id,
            None => {
                let id = RecordId::from(state.next_hold_id);
                state.next_hold_id += 1;
                id
            }
        };
        hold.id = Some(id.clone());
        state.holds.push(hold);
        id
    }

    pub fn insert_pickup_record(&self, record: PickupRecord) {
        self.lock().history.push(record);
    }

    /// Makes every request to `path` answer with `status`, with `message`
    /// under `error` when given.
    pub fn inject_failure(&self, path: &str, status: u16, message: Option<&str>) {
        self.lock()
            .failures
            .insert(path.to_string(), (status, message.map(str::to_string)));
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn holds(&self) -> Vec<Hold> {
        self.lock().holds.clone()
    }

    /// `"<METHOD> <path>"` for every request served so far.
    pub fn request_log(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn begin(&self, method: &str, path: &str) -> (MutexGuard<'_, StoreState>, Option<StoreResponse>) {
        let mut state = self.lock();
        state.requests.push(format!("{} {}", method, path));
        state.expire_stale(Utc::now());

        let injected = state.failures.get(path).map(|(status, message)| match message {
            Some(m) => StoreResponse::new(*status, json!({ "error": m })),
            None => StoreResponse { status: *status, body: None },
        });
        (state, injected)
    }

    fn list_donations(state: &StoreState, query: &[(&str, String)]) -> StoreResponse {
        let show_all = query_value(query, "showAll").is_some_and(|v| v.eq_ignore_ascii_case("true"));
        let held = state.unavailable_ids();

        let donations: Vec<Donation> = state
            .donations
            .iter()
            .map(|d| {
                let mut d = d.clone();
                d.is_held = Some(d.id.as_ref().is_some_and(|id| held.contains(id)));
                d
            })
            .filter(|d| show_all || d.is_held != Some(true))
            .collect();
        StoreResponse::new(200, json!(donations))
    }

    fn list_holds(state: &StoreState, query: &[(&str, String)]) -> StoreResponse {
        let Some(user_id) = query_user(query) else {
            return missing_user();
        };
        let active_only = query_value(query, "active").is_some_and(|v| v.eq_ignore_ascii_case("true"));

        let mut holds: Vec<&Hold> = state
            .holds
            .iter()
            .filter(|h| h.user_id.as_ref() == Some(&user_id))
            .filter(|h| !active_only || h.status == Some(HoldStatus::Active))
            .collect();
        holds.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| numeric_id(b).cmp(&numeric_id(a)))
        });
        StoreResponse::new(200, json!(holds))
    }

    fn list_history(state: &StoreState, query: &[(&str, String)]) -> StoreResponse {
        let Some(user_id) = query_user(query) else {
            return missing_user();
        };
        let mut records: Vec<&PickupRecord> = state
            .history
            .iter()
            .filter(|r| r.user_id.as_ref() == Some(&user_id))
            .collect();
        records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        StoreResponse::new(200, json!(records))
    }

    fn create_hold(&self, state: &mut StoreState, body: Option<Value>) -> StoreResponse {
        let field = |key: &str| body.as_ref().and_then(|b| b.get(key)).and_then(lenient::id_of);
        let (Some(user_id), Some(donation_id)) = (field("userId"), field("donationId")) else {
            return StoreResponse::new(400, json!({ "error": "userId and donationId are required" }));
        };

        let Some(donation) = state.donation(&donation_id).cloned() else {
            return StoreResponse::new(409, json!({ "error": "Donation not found" }));
        };
        let already_held = state.holds.iter().any(|h| {
            h.donation_id.as_ref() == Some(&donation_id) && h.status == Some(HoldStatus::Active)
        });
        if already_held {
            return StoreResponse::new(409, json!({ "error": "Donation is already reserved" }));
        }

        let now = Utc::now();
        let hold = Hold {
            id: Some(RecordId::from(state.next_hold_id)),
            donation_id: Some(donation_id),
            user_id: Some(user_id),
            status: Some(HoldStatus::Active),
            created_at: Some(now),
            expires_at: Some(now + self.hold_duration),
            completed_at: None,
            cancelled_at: None,
        };
        state.next_hold_id += 1;
        state.holds.push(hold.clone());

        let mut donation = donation;
        donation.is_held = Some(true);
        StoreResponse::new(201, json!({ "success": true, "hold": hold, "donation": donation }))
    }

    fn confirm_pickup(state: &mut StoreState, hold_id: &str) -> StoreResponse {
        let now = Utc::now();
        let Some(hold) = state.active_hold_mut(hold_id) else {
            return StoreResponse::new(404, json!({ "error": "No active hold found" }));
        };
        hold.status = Some(HoldStatus::Completed);
        hold.completed_at = Some(now);
        let (user_id, donation_id) = (hold.user_id.clone(), hold.donation_id.clone());

        let donation = donation_id.as_ref().and_then(|id| state.donation(id)).cloned();
        let record = PickupRecord {
            id: Some(RecordId::from(state.next_record_id)),
            user_id,
            donation_id,
            donation_description: donation.as_ref().and_then(|d| d.description.clone()),
            donor_contact: donation.as_ref().and_then(|d| d.donor_contact.clone()),
            pickup_location: donation.as_ref().and_then(|d| d.address.clone()),
            completed_at: Some(now),
        };
        state.next_record_id += 1;
        state.history.push(record.clone());
        StoreResponse::new(200, json!({ "success": true, "record": record }))
    }

    fn cancel_hold(state: &mut StoreState, hold_id: &str) -> StoreResponse {
        let Some(hold) = state.active_hold_mut(hold_id) else {
            return StoreResponse::new(404, json!({ "error": "No active hold found to cancel" }));
        };
        hold.status = Some(HoldStatus::Cancelled);
        hold.cancelled_at = Some(Utc::now());
        StoreResponse::new(200, json!({ "success": true, "hold": hold.clone() }))
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<StoreResponse> {
        let (state, injected) = self.begin("GET", path);
        if let Some(resp) = injected {
            return Ok(resp);
        }
        Ok(match path {
            super::DONATIONS_PATH => Self::list_donations(&state, query),
            super::HOLDS_PATH => Self::list_holds(&state, query),
            super::HISTORY_PATH => Self::list_history(&state, query),
            _ => not_found(),
        })
    }

    async fn post(&self, path: &str, body: Option<Value>) -> Result<StoreResponse> {
        let (mut state, injected) = self.begin("POST", path);
        if let Some(resp) = injected {
            return Ok(resp);
        }
        Ok(match segments(path).as_slice() {
            ["holds"] => self.create_hold(&mut state, body),
            ["holds", id, "pickup"] => Self::confirm_pickup(&mut state, id),
            _ => not_found(),
        })
    }

    async fn delete(&self, path: &str) -> Result<StoreResponse> {
        let (mut state, injected) = self.begin("DELETE", path);
        if let Some(resp) = injected {
            return Ok(resp);
        }
        Ok(match segments(path).as_slice() {
            ["holds", id] => Self::cancel_hold(&mut state, id),
            _ => not_found(),
        })
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn query_value<'a>(query: &'a [(&str, String)], key: &str) -> Option<&'a str> {
    query.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
}

fn query_user(query: &[(&str, String)]) -> Option<RecordId> {
    query_value(query, "userId")
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(RecordId::from)
}

fn numeric_id(hold: &Hold) -> i64 {
    hold.id.as_ref().and_then(|id| id.as_str().parse().ok()).unwrap_or(0)
}

fn missing_user() -> StoreResponse {
    StoreResponse::new(400, json!({ "error": "userId query param is required" }))
}

fn not_found() -> StoreResponse {
    StoreResponse::new(404, json!({ "error": "Not found" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_query(user: &str) -> Vec<(&'static str, String)> {
        vec![("userId", user.to_string())]
    }

    #[test]
    fn seeded_inventory_is_fully_described() {
        let store = MemoryStore::seeded();
        let donations = store.lock().donations.clone();
        assert_eq!(donations.len(), SAMPLE_DONATIONS.len());
        for d in &donations {
            assert!(d.description.is_some() && d.donor_contact.is_some() && d.address.is_some());
            assert!(d.expires_at.is_some(), "unparsed expiry on {:?}", d.id);
        }
        assert_eq!(donations[4].donation_type.as_deref(), Some("Dairy"));
    }

    #[tokio::test]
    async fn second_active_hold_on_a_donation_is_rejected() {
        let store = MemoryStore::seeded();
        let body = json!({ "donationId": "DON-001", "userId": 1 });

        let first = store.post("/holds", Some(body.clone())).await.unwrap();
        assert_eq!(first.status, 201);

        let second = store.post("/holds", Some(json!({ "donationId": "DON-001", "userId": 2 }))).await.unwrap();
        assert_eq!(second.status, 409);
        assert_eq!(second.body.unwrap()["error"], "Donation is already reserved");
    }

    #[tokio::test]
    async fn held_donations_leave_the_available_listing() {
        let store = MemoryStore::seeded();
        store
            .post("/holds", Some(json!({ "donationId": "DON-002", "userId": 1 })))
            .await
            .unwrap();

        let available = store.get("/donations", &[]).await.unwrap().body.unwrap();
        assert_eq!(available.as_array().unwrap().len(), 4);

        let all = store
            .get("/donations", &[("showAll", "true".to_string())])
            .await
            .unwrap()
            .body
            .unwrap();
        let held: Vec<&Value> = all.as_array().unwrap().iter().filter(|d| d["isHeld"] == true).collect();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0]["id"], "DON-002");
    }

    #[tokio::test]
    async fn pickup_writes_a_history_snapshot() {
        let store = MemoryStore::seeded();
        let created = store
            .post("/holds", Some(json!({ "donationId": "DON-005", "userId": 1 })))
            .await
            .unwrap();
        let hold_id = created.body.unwrap()["hold"]["id"].to_string();

        let done = store.post(&format!("/holds/{}/pickup", hold_id), None).await.unwrap();
        assert_eq!(done.status, 200);

        let again = store.post(&format!("/holds/{}/pickup", hold_id), None).await.unwrap();
        assert_eq!(again.status, 404);

        let history = store.get("/history", &user_query("1")).await.unwrap().body.unwrap();
        assert_eq!(
            history[0]["donationDescription"],
            "Dairy products: milk, yogurt, cheese (refrigerated)"
        );
    }

    #[tokio::test]
    async fn lapsed_holds_expire_and_free_the_donation() {
        let store = MemoryStore::seeded().with_hold_duration(Duration::zero());
        store
            .post("/holds", Some(json!({ "donationId": "DON-003", "userId": 1 })))
            .await
            .unwrap();

        let active = store
            .get("/holds", &[("userId", "1".to_string()), ("active", "true".to_string())])
            .await
            .unwrap();
        assert_eq!(active.body.unwrap(), json!([]));
        assert_eq!(store.holds()[0].status, Some(HoldStatus::Expired));

        let retry = store
            .post("/holds", Some(json!({ "donationId": "DON-003", "userId": 2 })))
            .await
            .unwrap();
        assert_eq!(retry.status, 201);
    }

    #[tokio::test]
    async fn listing_requires_a_user() {
        let store = MemoryStore::new();
        let resp = store.get("/holds", &[]).await.unwrap();
        assert_eq!(resp.status, 400);
        let resp = store.get("/history", &user_query(" ")).await.unwrap();
        assert_eq!(resp.status, 400);
    }

    #[tokio::test]
    async fn injected_failures_short_circuit() {
        let store = MemoryStore::seeded();
        store.inject_failure("/donations", 503, None);
        let resp = store.get("/donations", &[]).await.unwrap();
        assert_eq!(resp, StoreResponse { status: 503, body: None });

        store.clear_failures();
        assert_eq!(store.get("/donations", &[]).await.unwrap().status, 200);
        assert_eq!(store.request_count(), 2);
    }
}
