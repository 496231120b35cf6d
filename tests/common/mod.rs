use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use food_rescue::{ClientConfig, Donation, Hold, HoldStatus, MemoryStore, PantryClient, RecordId, StoreClient};
use serde_json::Value;
use tokio::sync::oneshot;

pub const API_PREFIX: &str = "/api/v1";

/// A `MemoryStore` served over HTTP on an ephemeral port, with a client
/// pointed at it.
pub struct StoreServer {
    pub store: Arc<MemoryStore>,
    pub client: PantryClient,
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl Drop for StoreServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn serve(store: MemoryStore, max_orders: u32) -> StoreServer {
    let store = Arc::new(store);
    let app = Router::new().fallback(dispatch).with_state(store.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        let _ = server.await;
    });

    let mut config = ClientConfig::default();
    config.base_url = format!("http://{}{}", addr, API_PREFIX).parse().expect("base url");
    config.max_orders = max_orders;
    let client = PantryClient::connect(config).expect("client");

    StoreServer {
        store,
        client,
        addr,
        shutdown_tx: Some(shutdown_tx),
    }
}

async fn dispatch(State(store): State<Arc<MemoryStore>>, method: Method, uri: Uri, body: Bytes) -> Response {
    let path = uri.path().strip_prefix(API_PREFIX).unwrap_or(uri.path()).to_string();
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
        .into_owned()
        .collect();
    let query: Vec<(&str, String)> = pairs.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
    let body = serde_json::from_slice::<Value>(&body).ok();

    let result = match method {
        Method::GET => store.get(&path, &query).await,
        Method::POST => store.post(&path, body).await,
        Method::DELETE => store.delete(&path).await,
        _ => return StatusCode::METHOD_NOT_ALLOWED.into_response(),
    };

    match result {
        Ok(resp) => {
            let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            match resp.body {
                Some(body) => (status, Json(body)).into_response(),
                None => status.into_response(),
            }
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub fn donation(id: i64, description: &str) -> Donation {
    Donation {
        id: Some(RecordId::from(id)),
        description: Some(description.to_string()),
        donation_type: Some("Pantry".to_string()),
        quantity: Some("1 box".to_string()),
        donor_name: Some("Test Donor".to_string()),
        donor_contact: Some("412-555-0000".to_string()),
        address: Some("1 Test St, Pittsburgh, PA".to_string()),
        lat: Some(40.4406),
        lng: Some(-79.9959),
        ..Donation::default()
    }
}

pub fn active_hold(user: i64, donation: i64) -> Hold {
    let now = chrono::Utc::now();
    Hold {
        donation_id: Some(RecordId::from(donation)),
        user_id: Some(RecordId::from(user)),
        status: Some(HoldStatus::Active),
        created_at: Some(now),
        expires_at: Some(now + chrono::Duration::hours(2)),
        ..Hold::default()
    }
}
