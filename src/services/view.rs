// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The dashboard view model.
//!
//! A single [`ViewStore`] owns the derived state. Readers get cheap
//! `Arc`-backed snapshots over a `watch` channel; writers replace one slice
//! at a time. Every write carries the session generation it was started
//! under and is dropped if the session has since changed.

use crate::error::SchemaError;
use crate::models::{
    AttendanceView, ClientDoc, EvidenceView, InboxView, User, UserProfile, UserRow,
};
use crate::services::geocode::LOCATION_ERROR;
use crate::services::join::{employees, join_users_with_clients};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;

/// One independently loaded part of the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slice {
    Users,
    Clients,
    Attendance,
    Evidence,
    Inbox,
}

impl Slice {
    pub const ALL: [Slice; 5] = [
        Slice::Users,
        Slice::Clients,
        Slice::Attendance,
        Slice::Evidence,
        Slice::Inbox,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slice::Users => "users",
            Slice::Clients => "clients",
            Slice::Attendance => "attendance",
            Slice::Evidence => "evidence",
            Slice::Inbox => "inbox",
        }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Slice::ALL
            .into_iter()
            .find(|slice| slice.as_str() == s)
            .ok_or_else(|| format!("unknown slice: {}", s))
    }
}

/// Load progress of a slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready {
        updated_at: DateTime<Utc>,
    },
    /// Last load failed; the slice still holds the previous data.
    Failed {
        error: String,
    },
}

/// Point-in-time copy of the whole view.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewSnapshot {
    /// Session generation, bumped on every sign-in and sign-out.
    pub generation: u64,
    /// `users` document ID of the signed-in admin
    pub signed_in: Option<String>,
    #[serde(skip)]
    raw_users: Arc<Vec<User>>,
    #[serde(skip)]
    raw_clients: Arc<Vec<ClientDoc>>,
    /// User × client join, one row per user
    pub users: Arc<Vec<UserRow>>,
    pub employees: Arc<Vec<UserProfile>>,
    pub attendance: Arc<Vec<AttendanceView>>,
    pub evidence: Arc<Vec<EvidenceView>>,
    pub inbox: Arc<Vec<InboxView>>,
    /// Every place name resolved this session, keyed by "lat,lng"
    pub locations: Arc<HashMap<String, String>>,
    /// Documents left out of the view because they failed validation
    pub schema_errors: Arc<Vec<String>>,
    pub status: BTreeMap<Slice, LoadState>,
    #[serde(skip)]
    join_errors: Vec<String>,
    /// Undecodable documents seen on each slice's last read
    #[serde(skip)]
    rejected: BTreeMap<Slice, Vec<String>>,
}

impl ViewSnapshot {
    pub fn state(&self, slice: Slice) -> LoadState {
        self.status.get(&slice).cloned().unwrap_or_default()
    }

    fn set_state(&mut self, slice: Slice, state: LoadState) {
        self.status.insert(slice, state);
    }

    fn ready(&mut self, slice: Slice) {
        self.set_state(
            slice,
            LoadState::Ready {
                updated_at: Utc::now(),
            },
        );
    }

    fn rejoin(&mut self) {
        let out = join_users_with_clients(&self.raw_users, &self.raw_clients);
        self.users = Arc::new(out.rows);
        self.join_errors = out.schema_errors.iter().map(|e| e.to_string()).collect();
        self.collect_schema_errors();
    }

    fn collect_schema_errors(&mut self) {
        let mut all = self.join_errors.clone();
        all.extend(self.rejected.values().flatten().cloned());
        self.schema_errors = Arc::new(all);
    }

    /// Add a batch's place names to the session map.
    ///
    /// Batches can publish out of order, so keys are never dropped and an
    /// error sentinel never replaces a name already shown.
    fn merge_locations(&mut self, locations: HashMap<String, String>) {
        let mut merged = (*self.locations).clone();
        for (key, place) in locations {
            if place == LOCATION_ERROR && merged.contains_key(&key) {
                continue;
            }
            merged.insert(key, place);
        }
        self.locations = Arc::new(merged);
    }
}

/// Owner of the dashboard view model.
pub struct ViewStore {
    tx: watch::Sender<ViewSnapshot>,
}

impl Default for ViewStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewStore {
    pub fn new() -> Self {
        Self {
            tx: watch::Sender::new(ViewSnapshot::default()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.tx.borrow().clone()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.tx.borrow().generation == generation
    }

    /// Clear the view for a newly signed-in user. Returns the new generation.
    pub fn begin_session(&self, user_id: &str) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|snap| {
            generation = snap.generation + 1;
            *snap = ViewSnapshot {
                generation,
                signed_in: Some(user_id.to_string()),
                status: Slice::ALL
                    .into_iter()
                    .map(|s| (s, LoadState::Loading))
                    .collect(),
                ..Default::default()
            };
        });
        generation
    }

    /// Clear the view after sign-out.
    pub fn end_session(&self) {
        self.tx.send_modify(|snap| {
            *snap = ViewSnapshot {
                generation: snap.generation + 1,
                ..Default::default()
            };
        });
    }

    /// Apply `f` if `generation` is still current. Returns whether it ran.
    fn update(&self, generation: u64, f: impl FnOnce(&mut ViewSnapshot)) -> bool {
        let applied = self.tx.send_if_modified(|snap| {
            if snap.generation != generation {
                return false;
            }
            f(snap);
            true
        });
        if !applied {
            tracing::debug!(generation, "Dropping update from a closed session");
        }
        applied
    }

    pub fn mark_loading(&self, generation: u64, slice: Slice) -> bool {
        self.update(generation, |snap| snap.set_state(slice, LoadState::Loading))
    }

    pub fn publish_users(&self, generation: u64, users: Vec<User>) -> bool {
        self.update(generation, |snap| {
            snap.employees = Arc::new(employees(&users));
            snap.raw_users = Arc::new(users);
            snap.rejoin();
            snap.ready(Slice::Users);
        })
    }

    pub fn publish_clients(&self, generation: u64, clients: Vec<ClientDoc>) -> bool {
        self.update(generation, |snap| {
            snap.raw_clients = Arc::new(clients);
            snap.rejoin();
            snap.ready(Slice::Clients);
        })
    }

    pub fn publish_attendance(
        &self,
        generation: u64,
        attendance: Vec<AttendanceView>,
        locations: HashMap<String, String>,
    ) -> bool {
        self.update(generation, |snap| {
            snap.attendance = Arc::new(attendance);
            snap.merge_locations(locations);
            snap.ready(Slice::Attendance);
        })
    }

    pub fn publish_evidence(
        &self,
        generation: u64,
        evidence: Vec<EvidenceView>,
        locations: HashMap<String, String>,
    ) -> bool {
        self.update(generation, |snap| {
            snap.evidence = Arc::new(evidence);
            snap.merge_locations(locations);
            snap.ready(Slice::Evidence);
        })
    }

    pub fn publish_inbox(&self, generation: u64, inbox: Vec<InboxView>) -> bool {
        self.update(generation, |snap| {
            snap.inbox = Arc::new(inbox);
            snap.ready(Slice::Inbox);
        })
    }

    /// Record the documents of `slice` that failed to decode on its last read.
    pub fn publish_rejected(
        &self,
        generation: u64,
        slice: Slice,
        rejected: &[SchemaError],
    ) -> bool {
        self.update(generation, |snap| {
            snap.rejected
                .insert(slice, rejected.iter().map(|e| e.to_string()).collect());
            snap.collect_schema_errors();
        })
    }

    /// Record a failed load. The slice keeps its previous contents.
    pub fn publish_failure(&self, generation: u64, slice: Slice, error: String) -> bool {
        self.update(generation, |snap| {
            snap.set_state(slice, LoadState::Failed { error })
        })
    }
}
