//! Firebase REST implementations of the identity provider and profile store.

mod auth;
mod database;
mod storage;

pub use auth::{FirebaseAuth, SESSION_STORAGE_KEY};
pub use database::RealtimeDatabase;
pub use storage::{KeyValueStore, MemoryStorage};

use serde::Deserialize;

use crate::transport::ApiResponse;

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Structured { message: String },
    Plain(String),
}

/// Pulls the error message out of a Firebase error body. Identity Toolkit
/// nests it (`{"error":{"message":..}}`), the database does not
/// (`{"error":".."}`).
fn error_message(response: &ApiResponse) -> String {
    match response.json::<ErrorEnvelope>() {
        Ok(ErrorEnvelope {
            error: ErrorDetail::Structured { message },
        })
        | Ok(ErrorEnvelope {
            error: ErrorDetail::Plain(message),
        }) => message,
        Err(_) if response.body.trim().is_empty() => format!("HTTP {}", response.status),
        Err(_) => response.body.clone(),
    }
}
