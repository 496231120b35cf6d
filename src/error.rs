use serde_json::Value;

/// Failure of a catalog, hold or history operation.
///
/// Store-enforced conflicts (a donation that already carries an active hold)
/// arrive as ordinary [`PantryError::Store`] values; callers refresh their view
/// of availability instead of retrying blindly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PantryError {
    /// Rejected locally, before any request was sent.
    #[error("{0}")]
    Validation(String),
    /// The store answered with a non-success status.
    #[error("{message}")]
    Store { status: u16, message: String },
    /// The request never produced a response.
    #[error("{0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, PantryError>;

impl PantryError {
    pub fn validation(message: impl Into<String>) -> Self {
        PantryError::Validation(message.into())
    }

    /// Builds a store failure from a non-success response.
    ///
    /// Uses the body's `error` field when it is a non-empty string, otherwise
    /// synthesizes `"<fallback> (<status>)"`.
    pub fn from_status(status: u16, body: Option<&Value>, fallback: &str) -> Self {
        let message = body
            .and_then(|b| b.get("error"))
            .and_then(|e| e.as_str())
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} ({})", fallback, status));
        PantryError::Store { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            PantryError::Store { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Transport failures and 5xx answers may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            PantryError::Transport(_) => true,
            PantryError::Store { status, .. } => *status >= 500,
            PantryError::Validation(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn store_error_prefers_body_message() {
        let body = json!({ "error": "Donation is already reserved" });
        let err = PantryError::from_status(409, Some(&body), "Failed to request donation");
        assert_eq!(err.to_string(), "Donation is already reserved");
        assert_eq!(err.status(), Some(409));
        assert!(!err.is_retryable());
    }

    #[test]
    fn store_error_synthesizes_message_without_body() {
        let err = PantryError::from_status(502, None, "Failed to fetch donations");
        assert_eq!(err.to_string(), "Failed to fetch donations (502)");
        assert!(err.is_retryable());

        let blank = json!({ "error": "" });
        let err = PantryError::from_status(404, Some(&blank), "Failed to cancel hold");
        assert_eq!(err.to_string(), "Failed to cancel hold (404)");
    }
}
