// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Inbox broadcast model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Broadcast message stored in Firestore (`inbox` collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboxDoc {
    #[serde(rename = "_firestore_id", default, skip_serializing)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(
        rename = "createdAt",
        default,
        serialize_with = "firestore::serialize_as_optional_timestamp::serialize",
        deserialize_with = "crate::models::lenient::instant",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "imageUrls", default)]
    pub image_urls: Vec<String>,
}

/// Inbox message ready for the list view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct InboxView {
    pub id: String,
    pub title: String,
    /// Instant used for ordering (the stored one, or the sort time if absent)
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    /// Whether `created_at` was missing and replaced by the sort time
    pub created_at_fallback: bool,
    /// "M/D/YYYY"
    pub display_date: String,
    pub image_urls: Vec<String>,
}
