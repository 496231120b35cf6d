use std::env;
use std::time::Duration;

use url::Url;

use crate::error::{PantryError, Result};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/api/v1";
pub const DEFAULT_MAX_ORDERS: u32 = 4;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: Url,
    /// Maximum number of concurrent active holds per user.
    pub max_orders: u32,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            max_orders: DEFAULT_MAX_ORDERS,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Reads `PANTRY_API_BASE_URL`, `PANTRY_MAX_ORDERS` and
    /// `PANTRY_REQUEST_TIMEOUT_SECS`, falling back to defaults for unset or
    /// unparseable numbers. An unparseable base url is an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup("PANTRY_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(raw_url.trim())
            .map_err(|e| PantryError::validation(format!("invalid PANTRY_API_BASE_URL {:?}: {}", raw_url, e)))?;

        let max_orders = parse_or("PANTRY_MAX_ORDERS", lookup("PANTRY_MAX_ORDERS"), DEFAULT_MAX_ORDERS);
        let timeout_secs = parse_or(
            "PANTRY_REQUEST_TIMEOUT_SECS",
            lookup("PANTRY_REQUEST_TIMEOUT_SECS"),
            DEFAULT_TIMEOUT_SECS,
        );

        Ok(ClientConfig {
            base_url,
            max_orders,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(v) => match v.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!("Ignoring invalid {} value: {}", key, v);
                default
            }
        },
    }
}
