//! Optimistic mutation engine.
//!
//! A [`MutationController`] applies create/update/delete operations to a
//! caller-owned [`Collection`] immediately, then reconciles with, or rolls
//! back to, what the [`RemoteAdapter`] reports.

use async_trait::async_trait;
use serde_json::Value;
use shared::domain::Record;

pub mod collection;
pub mod controller;
pub mod error;
pub mod normalize;
pub mod notify;
pub mod state;
pub mod temp_id;
pub mod transport;

pub use collection::Collection;
pub use controller::{CreateOutcome, MutationController, MutationOptions};
pub use error::{MutationError, RemoteFailure};
pub use normalize::{normalize, FALLBACK_MESSAGE};
pub use notify::{BroadcastNotifier, NoopNotifier, Notification, Notifier, TracingNotifier};
pub use shared::domain::EntityKey;
pub use state::MutationState;
pub use transport::HttpRemote;

/// System of record behind a [`Collection`].
///
/// `create` receives the caller's draft exactly as given; temporary ids never
/// reach the remote. Results are loosely typed: the controller extracts an
/// identifier and fields from them when present.
#[async_trait]
pub trait RemoteAdapter: Send + Sync {
    async fn create(&self, draft: &Record) -> Result<Value, RemoteFailure>;
    async fn update(&self, id: &str, patch: &Record) -> Result<Value, RemoteFailure>;
    async fn delete(&self, id: &str) -> Result<(), RemoteFailure>;
}
