//! Failure classification and user-facing messages
//!
//! Raw failure detail stays in the error log. End users only ever see one of
//! the canned texts below, or the failure's own message as a last resort.

use serde::{Deserialize, Serialize};

use crate::Failure;

/// Coarse class of a failure, from its message and HTTP status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Connectivity problem reaching the API
    Network,
    /// Credentials missing or expired
    SessionExpired,
    /// Authenticated but not allowed
    Forbidden,
    NotFound,
    /// Server-side fault
    Server,
    /// Nothing recognised
    Other,
}

/// Classify a failure.
///
/// Substrings are checked in a fixed order, so a message mentioning both a
/// network problem and a status code is reported as a network problem.
pub fn classify(failure: &Failure) -> FailureClass {
    let message = failure.message();
    let status = failure.status();
    let mentions = |needles: &[&str]| needles.iter().any(|n| message.contains(n));

    if mentions(&["Network Error", "fetch"]) {
        FailureClass::Network
    } else if mentions(&["401", "Unauthorized"]) || status == Some(401) {
        FailureClass::SessionExpired
    } else if mentions(&["403", "Forbidden"]) || status == Some(403) {
        FailureClass::Forbidden
    } else if mentions(&["404", "Not Found"]) || status == Some(404) {
        FailureClass::NotFound
    } else if mentions(&["500", "Internal Server Error"]) || status.is_some_and(|s| s >= 500) {
        FailureClass::Server
    } else {
        FailureClass::Other
    }
}

/// Check whether a failure looks like a connectivity problem
pub fn is_network_error(failure: &Failure) -> bool {
    let message = failure.message().to_lowercase();
    ["network", "fetch", "connection", "timeout"]
        .iter()
        .any(|needle| message.contains(needle))
}

/// Check whether a failure is an authentication/authorization rejection
pub fn is_auth_error(failure: &Failure) -> bool {
    matches!(failure.status(), Some(401 | 403))
}

/// Canned user-facing texts, one per failure class
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserMessages {
    pub network: String,
    pub session_expired: String,
    pub forbidden: String,
    pub not_found: String,
    pub server: String,
    /// Used when an unrecognised failure has no message of its own
    pub unexpected: String,
}

impl Default for UserMessages {
    fn default() -> Self {
        UserMessages {
            network: "Connection error. Check your internet connection.".into(),
            session_expired: "Your session has expired. Please sign in again.".into(),
            forbidden: "You do not have permission to do this.".into(),
            not_found: "The requested resource could not be found.".into(),
            server: "Server error. Please try again later.".into(),
            unexpected: "An unexpected error occurred.".into(),
        }
    }
}

impl UserMessages {
    /// Pick the text to show for a failure
    pub fn for_failure(&self, failure: &Failure) -> String {
        match classify(failure) {
            FailureClass::Network => self.network.clone(),
            FailureClass::SessionExpired => self.session_expired.clone(),
            FailureClass::Forbidden => self.forbidden.clone(),
            FailureClass::NotFound => self.not_found.clone(),
            FailureClass::Server => self.server.clone(),
            FailureClass::Other if failure.has_message() => failure.message(),
            FailureClass::Other => self.unexpected.clone(),
        }
    }
}
