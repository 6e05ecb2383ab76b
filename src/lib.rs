// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Vaid dashboard: admin backend for a guard-tour business.
//!
//! This crate aggregates users, client sites, attendance, evidence photos
//! and inbox broadcasts from Firestore into one view model for the admin
//! dashboard, resolving GPS points to place names along the way.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::DocumentStore;
use services::{
    AdminService, FirebaseTokenVerifier, IdentityWatch, ObjectStore, ReverseGeocoder,
    SubscriptionManager, ViewStore,
};
use std::sync::Arc;
use tokio::sync::watch;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub view: Arc<ViewStore>,
    pub subscriptions: Arc<SubscriptionManager>,
    pub admin: AdminService,
    /// Signed-in admin; the subscription manager follows this channel.
    pub identity: IdentityWatch,
    pub token_verifier: Arc<FirebaseTokenVerifier>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn DocumentStore>,
        geocoder: Arc<dyn ReverseGeocoder>,
        objects: Arc<dyn ObjectStore>,
        token_verifier: Arc<FirebaseTokenVerifier>,
    ) -> Self {
        let view = Arc::new(ViewStore::new());
        let subscriptions = Arc::new(SubscriptionManager::new(
            store.clone(),
            geocoder,
            view.clone(),
        ));
        let admin = AdminService::new(store.clone(), objects, subscriptions.clone());

        Self {
            config,
            store,
            view,
            subscriptions,
            admin,
            identity: watch::Sender::new(None),
            token_verifier,
        }
    }

    /// Start following sign-ins and sign-outs.
    pub fn spawn_subscriptions(&self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(
            self.subscriptions
                .clone()
                .run(self.identity.subscribe()),
        )
    }
}
