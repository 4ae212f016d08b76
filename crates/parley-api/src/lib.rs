//! HTTP surface of the parley messaging backend: registration, JWT
//! issuance, direct threads, messages and unread counts.

pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod pagination;
pub mod routes;
pub mod serializers;
pub mod threads;
pub mod tokens;
pub mod validation;

pub use auth::{AppState, AppStateInner};
pub use routes::app;
