// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - aggregation, enrichment and write logic.

pub mod admin;
pub mod attendance;
pub mod evidence;
pub mod geocode;
pub mod identity;
pub mod inbox;
pub mod join;
pub mod session;
pub mod storage;
pub mod view;

pub use admin::AdminService;
pub use geocode::{GeocodeMemoizer, GoogleGeocoder, ReverseGeocoder};
pub use identity::{FirebaseTokenVerifier, IdentityWatch, SignedInUser};
pub use session::SubscriptionManager;
pub use storage::{FirebaseStorage, MemoryObjectStore, ObjectStore};
pub use view::{LoadState, Slice, ViewSnapshot, ViewStore};
