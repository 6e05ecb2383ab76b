// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User × client join.
//!
//! Both collections are fetched once and clients are grouped by owning
//! `userId`, so the cost is linear in the number of documents.

use crate::error::SchemaError;
use crate::models::{ClientDoc, ClientSite, Role, User, UserProfile, UserRow};
use std::collections::HashMap;

/// Result of joining users with their client sites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinOutput {
    /// One row per user, in store order.
    pub rows: Vec<UserRow>,
    /// Client documents left out of their row because they failed validation.
    pub schema_errors: Vec<SchemaError>,
}

/// Join every user with the clients whose `userId` matches.
///
/// Each user gets exactly one row, even with no clients. Within a row the
/// clients keep their store order.
pub fn join_users_with_clients(users: &[User], clients: &[ClientDoc]) -> JoinOutput {
    let mut by_owner: HashMap<&str, Vec<ClientSite>> = HashMap::new();
    let mut schema_errors = Vec::new();

    for doc in clients {
        match ClientSite::try_from(doc) {
            Ok(site) => by_owner.entry(doc.user_id.as_str()).or_default().push(site),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping client document");
                schema_errors.push(e);
            }
        }
    }

    let rows = users
        .iter()
        .map(|user| UserRow {
            profile: UserProfile::from(user),
            clients: by_owner.get(user.id.as_str()).cloned().unwrap_or_default(),
        })
        .collect();

    JoinOutput {
        rows,
        schema_errors,
    }
}

/// Users tagged `employee`, ordered by name (case-insensitive, stable).
pub fn employees(users: &[User]) -> Vec<UserProfile> {
    let mut list: Vec<UserProfile> = users
        .iter()
        .filter(|u| u.has_role(Role::Employee))
        .map(UserProfile::from)
        .collect();
    list.sort_by_cached_key(|u| u.name.to_lowercase());
    list
}
