// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Client site model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::collections;
use crate::error::SchemaError;
use crate::time_utils::format_display_date;

/// Client site document stored in Firestore (`clients` collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientDoc {
    /// Firestore document ID (never written back as a field)
    #[serde(rename = "_firestore_id", default, skip_serializing)]
    pub id: String,
    /// Owning user (a `users` document tagged `client`)
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(default)]
    pub sitename: String,
    #[serde(default)]
    pub sitelocation: String,
    #[serde(default)]
    pub siteaddress: String,
    /// Point of contact at the site
    #[serde(default)]
    pub poc: String,
    /// Employee user IDs assigned to the site
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(
        default,
        serialize_with = "firestore::serialize_as_optional_timestamp::serialize",
        deserialize_with = "crate::models::lenient::instant",
        skip_serializing_if = "Option::is_none"
    )]
    pub createdat: Option<DateTime<Utc>>,
}

/// A validated client site, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSite {
    pub id: String,
    pub user_id: String,
    pub site_name: String,
    pub site_location: String,
    pub site_address: String,
    pub poc: String,
    pub employees: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// `created_at` rendered as "M/D/YYYY"
    pub created_date: String,
}

impl TryFrom<&ClientDoc> for ClientSite {
    type Error = SchemaError;

    fn try_from(doc: &ClientDoc) -> Result<Self, Self::Error> {
        let created_at = doc.createdat.ok_or_else(|| SchemaError::MissingField {
            collection: collections::CLIENTS,
            id: doc.id.clone(),
            field: "createdat",
        })?;

        Ok(Self {
            id: doc.id.clone(),
            user_id: doc.user_id.clone(),
            site_name: doc.sitename.clone(),
            site_location: doc.sitelocation.clone(),
            site_address: doc.siteaddress.clone(),
            poc: doc.poc.clone(),
            employees: doc.users.clone(),
            created_at,
            created_date: format_display_date(created_at),
        })
    }
}
