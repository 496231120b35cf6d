//! Access to the donation store.
//!
//! Every component talks to the store through [`StoreClient`]; [`HttpStore`]
//! is the production implementation and [`MemoryStore`] emulates the store
//! in-process.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{PantryError, Result};

pub mod http;
pub(crate) mod lenient;
pub mod memory;
pub mod models;

pub use http::HttpStore;
pub use memory::MemoryStore;

pub const DONATIONS_PATH: &str = "/donations";
pub const HOLDS_PATH: &str = "/holds";
pub const HISTORY_PATH: &str = "/history";

pub fn hold_path(hold_id: &str) -> String {
    format!("{}/{}", HOLDS_PATH, hold_id)
}

pub fn pickup_path(hold_id: &str) -> String {
    format!("{}/{}/pickup", HOLDS_PATH, hold_id)
}

/// Status and decoded JSON body of a store answer. `body` is `None` when the
/// answer was empty or not JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl StoreResponse {
    pub fn new(status: u16, body: Value) -> Self {
        StoreResponse { status, body: Some(body) }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Passes a success answer through and turns anything else into a
    /// [`PantryError::Store`] with the best message available.
    pub fn into_success(self, fallback: &str) -> Result<StoreResponse> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(PantryError::from_status(self.status, self.body.as_ref(), fallback))
        }
    }
}

/// Minimal verb set the reservation flows need from the store.
///
/// `Err` is reserved for transport failures; a non-success status is still an
/// `Ok` answer.
#[async_trait]
pub trait StoreClient: Send + Sync {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<StoreResponse>;

    async fn post(&self, path: &str, body: Option<Value>) -> Result<StoreResponse>;

    async fn delete(&self, path: &str) -> Result<StoreResponse>;
}
