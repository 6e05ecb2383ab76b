// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription manager: ties the view's data loads to the signed-in user.
//!
//! Nothing is read from the store until an admin signs in. Each sign-in opens
//! one live evidence feed and four one-shot reads, all as tasks owned by the
//! session. Sign-out or a different user aborts them.

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::services::attendance::enrich_attendance;
use crate::services::evidence::enrich_evidence;
use crate::services::geocode::{GeocodeMemoizer, ReverseGeocoder};
use crate::services::identity::SignedInUser;
use crate::services::inbox::sort_inbox;
use crate::services::view::{Slice, ViewStore};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::{AbortHandle, JoinSet};

/// Everything a load task needs, tagged with its session generation.
#[derive(Clone)]
struct SessionCtx {
    store: Arc<dyn DocumentStore>,
    view: Arc<ViewStore>,
    memoizer: Arc<GeocodeMemoizer>,
    generation: u64,
}

impl SessionCtx {
    fn finish(&self, slice: Slice, result: Result<(), AppError>) -> Result<(), AppError> {
        if let Err(e) = &result {
            tracing::error!(
                slice = %slice,
                generation = self.generation,
                error = %e,
                "Failed to load slice"
            );
            self.view
                .publish_failure(self.generation, slice, e.to_string());
        }
        result
    }

    async fn load_users(&self) -> Result<(), AppError> {
        let listing = self.store.list_users().await?;
        tracing::debug!(
            count = listing.docs.len(),
            rejected = listing.rejected.len(),
            "Loaded users"
        );
        self.view
            .publish_rejected(self.generation, Slice::Users, &listing.rejected);
        self.view.publish_users(self.generation, listing.docs);
        Ok(())
    }

    async fn load_clients(&self) -> Result<(), AppError> {
        let listing = self.store.list_clients().await?;
        tracing::debug!(
            count = listing.docs.len(),
            rejected = listing.rejected.len(),
            "Loaded clients"
        );
        self.view
            .publish_rejected(self.generation, Slice::Clients, &listing.rejected);
        self.view.publish_clients(self.generation, listing.docs);
        Ok(())
    }

    async fn load_attendance(&self) -> Result<(), AppError> {
        let listing = self.store.list_attendance().await?;
        let views = enrich_attendance(&listing.docs, &self.memoizer).await;
        tracing::debug!(
            count = views.len(),
            rejected = listing.rejected.len(),
            "Loaded attendance"
        );
        self.view
            .publish_rejected(self.generation, Slice::Attendance, &listing.rejected);
        self.view
            .publish_attendance(self.generation, views, self.memoizer.snapshot());
        Ok(())
    }

    async fn load_inbox(&self) -> Result<(), AppError> {
        let listing = self.store.list_inbox().await?;
        tracing::debug!(
            count = listing.docs.len(),
            rejected = listing.rejected.len(),
            "Loaded inbox"
        );
        self.view
            .publish_rejected(self.generation, Slice::Inbox, &listing.rejected);
        self.view
            .publish_inbox(self.generation, sort_inbox(listing.docs, Utc::now()));
        Ok(())
    }

    async fn load(&self, slice: Slice) -> Result<(), AppError> {
        let result = match slice {
            Slice::Users => self.load_users().await,
            Slice::Clients => self.load_clients().await,
            Slice::Attendance => self.load_attendance().await,
            Slice::Inbox => self.load_inbox().await,
            Slice::Evidence => Err(AppError::BadRequest(
                "evidence is a live feed; resubscribe instead".to_string(),
            )),
        };
        self.finish(slice, result)
    }

    /// Follow the live evidence feed until it ends or the task is aborted.
    async fn follow_evidence(self) {
        let mut feed = match self.store.subscribe_evidence().await {
            Ok(feed) => feed,
            Err(e) => {
                let _ = self.finish(Slice::Evidence, Err(e));
                return;
            }
        };

        while let Some(update) = feed.next().await {
            match update {
                Ok(records) => {
                    let views = enrich_evidence(&records, &self.memoizer).await;
                    tracing::debug!(count = views.len(), "Evidence snapshot");
                    let current = self.view.publish_evidence(
                        self.generation,
                        views,
                        self.memoizer.snapshot(),
                    );
                    if !current {
                        break;
                    }
                }
                Err(e) => {
                    let _ = self.finish(Slice::Evidence, Err(e));
                }
            }
        }

        tracing::debug!(generation = self.generation, "Evidence feed closed");
    }
}

struct ActiveSession {
    user: SignedInUser,
    ctx: SessionCtx,
    tasks: JoinSet<()>,
    evidence: AbortHandle,
}

/// Starts and stops the per-user data loads.
pub struct SubscriptionManager {
    store: Arc<dyn DocumentStore>,
    geocoder: Arc<dyn ReverseGeocoder>,
    view: Arc<ViewStore>,
    active: Mutex<Option<ActiveSession>>,
}

impl SubscriptionManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        geocoder: Arc<dyn ReverseGeocoder>,
        view: Arc<ViewStore>,
    ) -> Self {
        Self {
            store,
            geocoder,
            view,
            active: Mutex::new(None),
        }
    }

    pub fn view(&self) -> &Arc<ViewStore> {
        &self.view
    }

    /// Follow the identity channel until its sender is dropped.
    pub async fn run(self: Arc<Self>, mut identity: watch::Receiver<Option<SignedInUser>>) {
        loop {
            let current = identity.borrow_and_update().clone();
            self.apply_identity(current).await;
            if identity.changed().await.is_err() {
                break;
            }
        }
        self.shutdown().await;
    }

    /// React to a sign-in, sign-out or user change.
    ///
    /// The same user signing in again is a no-op.
    pub async fn apply_identity(&self, user: Option<SignedInUser>) {
        let mut active = self.active.lock().await;

        match (active.as_ref(), user.as_ref()) {
            (Some(session), Some(user)) if session.user.uid == user.uid => return,
            (None, None) => return,
            _ => {}
        }

        if let Some(session) = active.take() {
            Self::close(session);
        }

        match user {
            Some(user) => *active = Some(self.open(user)),
            None => self.view.end_session(),
        }
    }

    /// Cancel the current session, if any, and clear the view.
    pub async fn shutdown(&self) {
        if let Some(session) = self.active.lock().await.take() {
            Self::close(session);
            self.view.end_session();
        }
    }

    fn open(&self, user: SignedInUser) -> ActiveSession {
        let generation = self.view.begin_session(&user.user_id);
        let ctx = SessionCtx {
            store: self.store.clone(),
            view: self.view.clone(),
            memoizer: Arc::new(GeocodeMemoizer::new(self.geocoder.clone())),
            generation,
        };

        tracing::info!(
            user_id = %user.user_id,
            generation,
            backend = self.store.backend_tag(),
            "Opening dashboard session"
        );

        let mut tasks = JoinSet::new();
        let evidence = tasks.spawn(ctx.clone().follow_evidence());
        for slice in [Slice::Users, Slice::Clients, Slice::Attendance, Slice::Inbox] {
            let ctx = ctx.clone();
            tasks.spawn(async move {
                let _ = ctx.load(slice).await;
            });
        }

        ActiveSession {
            user,
            ctx,
            tasks,
            evidence,
        }
    }

    fn close(mut session: ActiveSession) {
        tracing::info!(
            user_id = %session.user.user_id,
            generation = session.ctx.generation,
            "Closing dashboard session"
        );
        session.tasks.abort_all();
    }

    /// Reload one slice for the current session.
    ///
    /// For evidence this reopens the live feed. The previous slice stays in
    /// place if the reload fails.
    pub async fn refresh(&self, slice: Slice) -> Result<(), AppError> {
        let ctx = {
            let mut active = self.active.lock().await;
            let session = active.as_mut().ok_or(AppError::Unauthorized)?;

            if slice == Slice::Evidence {
                session.evidence.abort();
                // Reap finished loads and earlier feeds before adding a task.
                while session.tasks.try_join_next().is_some() {}
                session.ctx.view.mark_loading(session.ctx.generation, slice);
                session.evidence = session.tasks.spawn(session.ctx.clone().follow_evidence());
                return Ok(());
            }
            session.ctx.clone()
        };

        ctx.view.mark_loading(ctx.generation, slice);
        ctx.load(slice).await
    }

    /// Tasks the current session still tracks, finished or not.
    pub async fn session_tasks(&self) -> usize {
        self.active
            .lock()
            .await
            .as_ref()
            .map_or(0, |session| session.tasks.len())
    }

    /// Reload several slices, stopping at the first failure.
    pub async fn refresh_all(&self, slices: &[Slice]) -> Result<(), AppError> {
        for slice in slices {
            self.refresh(*slice).await?;
        }
        Ok(())
    }
}
