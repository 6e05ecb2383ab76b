// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory document store.
//!
//! Used by tests and local demos in place of Firestore. Counts every read so
//! callers can assert how many store operations a flow issued, and can be
//! told to fail reads of a given collection.

use crate::db::{collections, DocumentStore, EvidenceFeed, Listing, UserLookup};
use crate::error::{AppError, SchemaError};
use crate::models::{AttendanceDoc, ClientDoc, EvidenceDoc, InboxDoc, User};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    clients: Vec<ClientDoc>,
    attendance: Vec<AttendanceDoc>,
    inbox: Vec<InboxDoc>,
    /// Stored documents that do not decode, by collection
    malformed: Vec<(&'static str, String)>,
}

/// Per-operation call counters.
#[derive(Debug, Default)]
pub struct StoreCalls {
    pub list_users: AtomicUsize,
    pub list_clients: AtomicUsize,
    pub list_attendance: AtomicUsize,
    pub list_inbox: AtomicUsize,
    pub subscribe_evidence: AtomicUsize,
    pub writes: AtomicUsize,
}

impl StoreCalls {
    /// Reads and subscriptions issued so far.
    pub fn total_reads(&self) -> usize {
        [
            &self.list_users,
            &self.list_clients,
            &self.list_attendance,
            &self.list_inbox,
            &self.subscribe_evidence,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

pub struct MemoryStore {
    data: Mutex<Collections>,
    evidence: watch::Sender<Vec<EvidenceDoc>>,
    failing: Mutex<HashSet<&'static str>>,
    next_id: AtomicUsize,
    live_feeds: Arc<AtomicUsize>,
    pub calls: StoreCalls,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            data: Mutex::new(Collections::default()),
            evidence: watch::Sender::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            next_id: AtomicUsize::new(1),
            live_feeds: Arc::new(AtomicUsize::new(0)),
            calls: StoreCalls::default(),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MutexGuard<'_, Collections> {
        self.data.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn generate_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn listing<T>(&self, collection: &'static str, docs: Vec<T>) -> Listing<T> {
        let rejected = self
            .data()
            .malformed
            .iter()
            .filter(|(c, _)| *c == collection)
            .map(|(_, id)| SchemaError::Malformed {
                collection,
                id: id.clone(),
                reason: "invalid type: integer, expected a string".to_string(),
            })
            .collect();
        Listing { docs, rejected }
    }

    fn check(&self, collection: &'static str) -> Result<(), AppError> {
        let failing = self.failing.lock().unwrap_or_else(|p| p.into_inner());
        if failing.contains(collection) {
            return Err(AppError::Database(format!(
                "Failed to read {}: simulated outage",
                collection
            )));
        }
        Ok(())
    }

    /// Make every read of `collection` fail until `heal` is called.
    pub fn fail_reads(&self, collection: &'static str) {
        self.failing
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(collection);
    }

    pub fn heal(&self, collection: &'static str) {
        self.failing
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(collection);
    }

    // ─── Seeding ─────────────────────────────────────────────────

    pub fn seed_users(&self, users: Vec<User>) {
        self.data().users = users;
    }

    pub fn seed_clients(&self, clients: Vec<ClientDoc>) {
        self.data().clients = clients;
    }

    pub fn seed_attendance(&self, records: Vec<AttendanceDoc>) {
        self.data().attendance = records;
    }

    pub fn seed_inbox(&self, messages: Vec<InboxDoc>) {
        self.data().inbox = messages;
    }

    /// Store a document in `collection` that every read rejects.
    pub fn seed_malformed(&self, collection: &'static str, id: &str) {
        self.data().malformed.push((collection, id.to_string()));
    }

    /// Replace the evidence collection; live feeds see the change.
    pub fn set_evidence(&self, records: Vec<EvidenceDoc>) {
        self.evidence.send_replace(records);
    }

    /// Number of evidence feeds whose producer is still running.
    pub fn live_feeds(&self) -> usize {
        self.live_feeds.load(Ordering::SeqCst)
    }

    pub fn users(&self) -> Vec<User> {
        self.data().users.clone()
    }

    pub fn clients(&self) -> Vec<ClientDoc> {
        self.data().clients.clone()
    }

    pub fn inbox(&self) -> Vec<InboxDoc> {
        self.data().inbox.clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn list_users(&self) -> Result<Listing<User>, AppError> {
        self.calls.list_users.fetch_add(1, Ordering::SeqCst);
        self.check(collections::USERS)?;
        let users = self.data().users.clone();
        Ok(self.listing(collections::USERS, users))
    }

    async fn list_clients(&self) -> Result<Listing<ClientDoc>, AppError> {
        self.calls.list_clients.fetch_add(1, Ordering::SeqCst);
        self.check(collections::CLIENTS)?;
        let clients = self.data().clients.clone();
        Ok(self.listing(collections::CLIENTS, clients))
    }

    async fn list_attendance(&self) -> Result<Listing<AttendanceDoc>, AppError> {
        self.calls.list_attendance.fetch_add(1, Ordering::SeqCst);
        self.check(collections::ATTENDANCE)?;
        let records = self.data().attendance.clone();
        Ok(self.listing(collections::ATTENDANCE, records))
    }

    async fn list_inbox(&self) -> Result<Listing<InboxDoc>, AppError> {
        self.calls.list_inbox.fetch_add(1, Ordering::SeqCst);
        self.check(collections::INBOX)?;
        let messages = self.data().inbox.clone();
        Ok(self.listing(collections::INBOX, messages))
    }

    async fn subscribe_evidence(&self) -> Result<EvidenceFeed, AppError> {
        self.calls.subscribe_evidence.fetch_add(1, Ordering::SeqCst);
        self.check(collections::EVIDENCE)?;

        let (feed, tx, mut cancel) = EvidenceFeed::channel();
        let mut changes = self.evidence.subscribe();
        let live_feeds = self.live_feeds.clone();
        live_feeds.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            loop {
                let snapshot = changes.borrow_and_update().clone();
                if tx.send(Ok(snapshot)).await.is_err() {
                    break;
                }
                tokio::select! {
                    _ = &mut cancel => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            live_feeds.fetch_sub(1, Ordering::SeqCst);
        });

        Ok(feed)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.data().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user(&self, lookup: UserLookup<'_>) -> Result<Option<User>, AppError> {
        let data = self.data();
        let found = data.users.iter().find(|u| match lookup {
            UserLookup::Phone(phone) => u.phone == phone,
            UserLookup::Email(email) => u.email == email,
        });
        Ok(found.cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<String, AppError> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        let id = self.generate_id(collections::USERS);
        let mut stored = user.clone();
        stored.id = id.clone();
        self.data().users.push(stored);
        Ok(id)
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        let mut data = self.data();
        match data.users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user.clone(),
            None => data.users.push(user.clone()),
        }
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        self.data().users.retain(|u| u.id != id);
        Ok(())
    }

    async fn clients_for_user(&self, user_id: &str) -> Result<Vec<ClientDoc>, AppError> {
        self.check(collections::CLIENTS)?;
        Ok(self
            .data()
            .clients
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_client(&self, client: &ClientDoc) -> Result<String, AppError> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        self.check(collections::CLIENTS)?;
        let id = self.generate_id(collections::CLIENTS);
        let mut stored = client.clone();
        stored.id = id.clone();
        self.data().clients.push(stored);
        Ok(id)
    }

    async fn update_client(&self, client: &ClientDoc) -> Result<(), AppError> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        let mut data = self.data();
        match data.clients.iter_mut().find(|c| c.id == client.id) {
            Some(existing) => *existing = client.clone(),
            None => data.clients.push(client.clone()),
        }
        Ok(())
    }

    async fn delete_client(&self, id: &str) -> Result<(), AppError> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        self.data().clients.retain(|c| c.id != id);
        Ok(())
    }

    async fn insert_inbox(&self, message: &InboxDoc) -> Result<String, AppError> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        let id = self.generate_id(collections::INBOX);
        let mut stored = message.clone();
        stored.id = id.clone();
        self.data().inbox.push(stored);
        Ok(id)
    }
}
