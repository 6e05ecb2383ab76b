//! Database layer (Firestore, plus an in-memory store for tests and demos).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::{AppError, SchemaError};
use crate::models::{AttendanceDoc, ClientDoc, EvidenceDoc, InboxDoc, User};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const CLIENTS: &str = "clients";
    pub const ATTENDANCE: &str = "attendance";
    pub const EVIDENCE: &str = "evidence";
    pub const INBOX: &str = "inbox";
}

/// Buffered evidence snapshots per live feed.
pub(crate) const FEED_BUFFER: usize = 16;

/// How a signed-in identity is matched to a `users` document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLookup<'a> {
    Phone(&'a str),
    Email(&'a str),
}

impl UserLookup<'_> {
    pub fn field(&self) -> &'static str {
        match self {
            UserLookup::Phone(_) => "phone",
            UserLookup::Email(_) => "email",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            UserLookup::Phone(v) | UserLookup::Email(v) => v,
        }
    }
}

/// Documents read from one collection.
///
/// Documents that failed to decode are left out of `docs` and reported in
/// `rejected`; they never fail the read as a whole.
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub docs: Vec<T>,
    pub rejected: Vec<SchemaError>,
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self {
            docs: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> From<Vec<T>> for Listing<T> {
    fn from(docs: Vec<T>) -> Self {
        Self {
            docs,
            rejected: Vec::new(),
        }
    }
}

/// Live subscription to the `evidence` collection.
///
/// Each item is the full collection contents after a change. Dropping the
/// feed cancels the underlying listener.
pub struct EvidenceFeed {
    updates: mpsc::Receiver<Result<Vec<EvidenceDoc>, AppError>>,
    _cancel: oneshot::Sender<()>,
}

impl EvidenceFeed {
    /// Create a feed and the pair of channel ends its producer task needs.
    ///
    /// The producer must stop once the returned `oneshot::Receiver` resolves
    /// (the feed was dropped).
    pub fn channel() -> (
        Self,
        mpsc::Sender<Result<Vec<EvidenceDoc>, AppError>>,
        oneshot::Receiver<()>,
    ) {
        let (tx, rx) = mpsc::channel(FEED_BUFFER);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        (
            Self {
                updates: rx,
                _cancel: cancel_tx,
            },
            tx,
            cancel_rx,
        )
    }

    /// Wait for the next snapshot. `None` once the producer has stopped.
    pub async fn next(&mut self) -> Option<Result<Vec<EvidenceDoc>, AppError>> {
        self.updates.recv().await
    }
}

/// Document store backing the dashboard.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    // ─── Aggregation reads ───────────────────────────────────────

    async fn list_users(&self) -> Result<Listing<User>, AppError>;
    async fn list_clients(&self) -> Result<Listing<ClientDoc>, AppError>;
    async fn list_attendance(&self) -> Result<Listing<AttendanceDoc>, AppError>;
    async fn list_inbox(&self) -> Result<Listing<InboxDoc>, AppError>;
    async fn subscribe_evidence(&self) -> Result<EvidenceFeed, AppError>;

    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn find_user(&self, lookup: UserLookup<'_>) -> Result<Option<User>, AppError>;
    /// Insert with a generated ID; returns the new document ID.
    async fn insert_user(&self, user: &User) -> Result<String, AppError>;
    async fn update_user(&self, user: &User) -> Result<(), AppError>;
    async fn delete_user(&self, id: &str) -> Result<(), AppError>;

    // ─── Client Operations ───────────────────────────────────────

    async fn clients_for_user(&self, user_id: &str) -> Result<Vec<ClientDoc>, AppError>;
    async fn insert_client(&self, client: &ClientDoc) -> Result<String, AppError>;
    async fn update_client(&self, client: &ClientDoc) -> Result<(), AppError>;
    async fn delete_client(&self, id: &str) -> Result<(), AppError>;

    // ─── Inbox Operations ────────────────────────────────────────

    async fn insert_inbox(&self, message: &InboxDoc) -> Result<String, AppError>;
}
