use std::collections::BTreeMap;

use crate::api::session::SessionError;

/// Errors surfaced by [`crate::api::ApiClient`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection, TLS or other transport failure.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    /// Still rejected after one token refresh, or the refresh itself failed.
    #[error("session expired, please log in again")]
    Unauthorized,

    #[error("not logged in, run `tdk login` first")]
    NotLoggedIn,

    /// HTTP 400 with the server's message and field-level errors.
    #[error("{message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("session storage: {0}")]
    Session(#[from] SessionError),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err)
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

impl ApiError {
    /// Text for the store's `error` slot. Validation messages pass through
    /// verbatim and auth failures explain themselves; everything else shows
    /// the operation's `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Validation { message, fields } => {
                if !message.trim().is_empty() {
                    message.clone()
                } else {
                    fields
                        .values()
                        .flatten()
                        .next()
                        .cloned()
                        .unwrap_or_else(|| fallback.to_string())
                }
            }
            ApiError::Unauthorized | ApiError::NotLoggedIn => self.to_string(),
            _ => fallback.to_string(),
        }
    }

    /// Field errors as "field: message" lines
    pub fn field_errors(&self) -> Vec<String> {
        match self {
            ApiError::Validation { fields, .. } => fields
                .iter()
                .flat_map(|(field, msgs)| msgs.iter().map(move |m| format!("{}: {}", field, m)))
                .collect(),
            _ => Vec::new(),
        }
    }
}
