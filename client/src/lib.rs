//! Session, routing and data-fetch orchestration for the retinopathy
//! screening client. Platform independent: the browser build supplies an
//! `HttpTransport` and a `KeyValueStore`.

pub mod config;
pub mod firebase;
pub mod guard;
pub mod history;
pub mod identity;
pub mod listeners;
pub mod prediction;
pub mod report;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::ClientConfig;
pub use guard::{GuardDecision, Route, RouteKind, decide, guard};
pub use history::{FetchState, HistoryClient, HistoryFetchError, HistoryRecord, HistorySnapshot, HistoryStore};
pub use identity::{AuthError, Credential, CredentialSource, Identity, IdentityProvider, ProfileStore};
pub use listeners::Subscription;
pub use prediction::{PredictionClient, PredictionError, PredictionResult, encode_image};
pub use report::Report;
pub use session::{
    LoginError, LogoutError, Registration, RegistrationError, Session, SessionResolutionError,
    SessionSnapshot, SessionStore,
};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, TransportError};
