// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (employees, clients and admins)
//! - Clients (site metadata, joined to users by `userId`)
//! - Attendance and inbox (one-shot reads)
//! - Evidence (live listener)

use crate::db::{collections, DocumentStore, EvidenceFeed, Listing, UserLookup};
use crate::error::{AppError, SchemaError};
use crate::models::{AttendanceDoc, ClientDoc, EvidenceDoc, InboxDoc, User};
use async_trait::async_trait;
use firestore::{FirestoreListenEvent, FirestoreListenerTarget, FirestoreMemListenStateStorage};
use gcloud_sdk::google::firestore::v1::Document;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

const EVIDENCE_TARGET: FirestoreListenerTarget = FirestoreListenerTarget::new(17_u32);

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    /// Read a whole collection, decoding each document on its own.
    async fn list<T>(&self, collection: &'static str) -> Result<Listing<T>, AppError>
    where
        T: for<'de> serde::Deserialize<'de> + Send,
    {
        let docs = self
            .client
            .fluent()
            .select()
            .from(collection)
            .query()
            .await
            .map_err(|e| AppError::Database(format!("Failed to read {}: {}", collection, e)))?;

        Ok(decode_documents(collection, &docs))
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Decode documents one at a time. Failures are logged and reported, and the
/// rest of the collection is kept.
fn decode_documents<T>(collection: &'static str, docs: &[Document]) -> Listing<T>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let mut listing = Listing::default();
    for doc in docs {
        match firestore::FirestoreDb::deserialize_doc_to::<T>(doc) {
            Ok(decoded) => listing.docs.push(decoded),
            Err(e) => {
                let err = SchemaError::Malformed {
                    collection,
                    id: document_id(&doc.name).to_string(),
                    reason: e.to_string(),
                };
                tracing::warn!(error = %err, "Skipping malformed document");
                listing.rejected.push(err);
            }
        }
    }
    listing
}

/// Fold one listener event into the local copy of the collection.
///
/// Returns the new full snapshot when the event changed anything. The copy
/// is seeded from a one-shot read, so the listener's initial replay of
/// unchanged documents publishes nothing. Target changes are not needed:
/// the listener consumes the ones carrying resume tokens itself.
fn apply_listen_event(
    docs: &Mutex<BTreeMap<String, EvidenceDoc>>,
    event: FirestoreListenEvent,
) -> Option<Vec<EvidenceDoc>> {
    let mut docs = docs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let changed = match event {
        FirestoreListenEvent::DocumentChange(change) => {
            let doc = change.document?;
            let id = document_id(&doc.name).to_string();
            match firestore::FirestoreDb::deserialize_doc_to::<EvidenceDoc>(&doc) {
                Ok(mut evidence) => {
                    evidence.id = id.clone();
                    docs.insert(id, evidence.clone()).as_ref() != Some(&evidence)
                }
                Err(e) => {
                    tracing::warn!(doc = %doc.name, error = %e, "Dropping malformed evidence document");
                    docs.remove(&id).is_some()
                }
            }
        }
        FirestoreListenEvent::DocumentDelete(delete) => {
            docs.remove(document_id(&delete.document)).is_some()
        }
        FirestoreListenEvent::DocumentRemove(remove) => {
            docs.remove(document_id(&remove.document)).is_some()
        }
        _ => false,
    };

    changed.then(|| docs.values().cloned().collect())
}

/// Last path segment of a full Firestore document name.
fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    fn backend_tag(&self) -> &'static str {
        "firestore"
    }

    // ─── Aggregation reads ───────────────────────────────────────

    async fn list_users(&self) -> Result<Listing<User>, AppError> {
        self.list(collections::USERS).await
    }

    async fn list_clients(&self) -> Result<Listing<ClientDoc>, AppError> {
        self.list(collections::CLIENTS).await
    }

    async fn list_attendance(&self) -> Result<Listing<AttendanceDoc>, AppError> {
        self.list(collections::ATTENDANCE).await
    }

    async fn list_inbox(&self) -> Result<Listing<InboxDoc>, AppError> {
        self.list(collections::INBOX).await
    }

    /// Open a Firestore listener on `evidence`.
    ///
    /// The first snapshot comes from a one-shot read, sent before the
    /// listener starts, so an empty collection is still reported. The
    /// listener runs until the returned feed is dropped, then it is shut
    /// down by a companion task.
    async fn subscribe_evidence(&self) -> Result<EvidenceFeed, AppError> {
        let (feed, tx, cancel) = EvidenceFeed::channel();

        let initial: Listing<EvidenceDoc> = self.list(collections::EVIDENCE).await?;
        let seeded: BTreeMap<String, EvidenceDoc> = initial
            .docs
            .into_iter()
            .map(|doc| (doc.id.clone(), doc))
            .collect();
        let _ = tx.send(Ok(seeded.values().cloned().collect())).await;
        let docs = Arc::new(Mutex::new(seeded));

        let mut listener = self
            .client
            .create_listener(FirestoreMemListenStateStorage::new())
            .await
            .map_err(|e| AppError::Database(format!("Failed to create listener: {}", e)))?;

        self.client
            .fluent()
            .select()
            .from(collections::EVIDENCE)
            .listen()
            .add_target(EVIDENCE_TARGET, &mut listener)
            .map_err(|e| AppError::Database(format!("Failed to add listen target: {}", e)))?;

        listener
            .start(move |event| {
                let tx = tx.clone();
                let docs = docs.clone();
                async move {
                    if let Some(snapshot) = apply_listen_event(&docs, event) {
                        // A closed channel means the feed was dropped; the
                        // companion task is already shutting the listener down.
                        let _ = tx.send(Ok(snapshot)).await;
                    }
                    Ok(())
                }
            })
            .await
            .map_err(|e| AppError::Database(format!("Failed to start listener: {}", e)))?;

        tracing::info!(collection = collections::EVIDENCE, "Live listener started");

        tokio::spawn(async move {
            let _ = cancel.await;
            if let Err(e) = listener.shutdown().await {
                tracing::warn!(error = %e, "Evidence listener shutdown failed");
            }
            tracing::debug!(collection = collections::EVIDENCE, "Live listener stopped");
        });

        Ok(feed)
    }

    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_user(&self, lookup: UserLookup<'_>) -> Result<Option<User>, AppError> {
        let field = lookup.field();
        let value = lookup.value().to_string();

        let users: Vec<User> = self
            .client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.for_all([q.field(field).eq(value.as_str())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    async fn insert_user(&self, user: &User) -> Result<String, AppError> {
        let created: User = self
            .client
            .fluent()
            .insert()
            .into(collections::USERS)
            .generate_document_id()
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(created.id)
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::USERS, id).await
    }

    // ─── Client Operations ───────────────────────────────────────

    async fn clients_for_user(&self, user_id: &str) -> Result<Vec<ClientDoc>, AppError> {
        let docs = self
            .client
            .fluent()
            .select()
            .from(collections::CLIENTS)
            .filter(|q| q.for_all([q.field("userId").eq(user_id)]))
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(decode_documents(collections::CLIENTS, &docs).docs)
    }

    async fn insert_client(&self, client: &ClientDoc) -> Result<String, AppError> {
        let created: ClientDoc = self
            .client
            .fluent()
            .insert()
            .into(collections::CLIENTS)
            .generate_document_id()
            .object(client)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(created.id)
    }

    async fn update_client(&self, client: &ClientDoc) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::CLIENTS)
            .document_id(&client.id)
            .object(client)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_client(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::CLIENTS, id).await
    }

    // ─── Inbox Operations ────────────────────────────────────────

    async fn insert_inbox(&self, message: &InboxDoc) -> Result<String, AppError> {
        let created: InboxDoc = self
            .client
            .fluent()
            .insert()
            .into(collections::INBOX)
            .generate_document_id()
            .object(message)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(created.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gcloud_sdk::google::firestore::v1::target_change::TargetChangeType;
    use gcloud_sdk::google::firestore::v1::value::ValueType;
    use gcloud_sdk::google::firestore::v1::{
        ArrayValue, DocumentChange, DocumentDelete, MapValue, TargetChange, Value,
    };
    use std::collections::HashMap;

    fn value(v: ValueType) -> Value {
        Value {
            value_type: Some(v),
        }
    }

    fn text(s: &str) -> Value {
        value(ValueType::StringValue(s.to_string()))
    }

    fn document(collection: &str, id: &str, fields: Vec<(&str, Value)>) -> Document {
        Document {
            name: format!("projects/p/databases/(default)/documents/{}/{}", collection, id),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<HashMap<_, _>>(),
            ..Default::default()
        }
    }

    fn evidence_doc(id: &str, lat: f64, lng: f64) -> Document {
        let photo = value(ValueType::MapValue(MapValue {
            fields: [
                ("url".to_string(), text("https://img.example.com/p.jpg")),
                ("lat".to_string(), value(ValueType::DoubleValue(lat))),
                ("lng".to_string(), value(ValueType::DoubleValue(lng))),
            ]
            .into_iter()
            .collect(),
        }));
        document(
            collections::EVIDENCE,
            id,
            vec![
                ("userId", text("c1")),
                ("evidence", value(ValueType::ArrayValue(ArrayValue { values: vec![photo] }))),
            ],
        )
    }

    fn changed(doc: Document) -> FirestoreListenEvent {
        FirestoreListenEvent::DocumentChange(DocumentChange {
            document: Some(doc),
            target_ids: vec![17],
            ..Default::default()
        })
    }

    fn seeded(ids: &[&str]) -> Mutex<BTreeMap<String, EvidenceDoc>> {
        let state = Mutex::new(BTreeMap::new());
        for (n, id) in ids.iter().enumerate() {
            apply_listen_event(&state, changed(evidence_doc(id, n as f64, 1.0)));
        }
        state
    }

    #[test]
    fn document_id_takes_last_segment() {
        assert_eq!(
            document_id("projects/p/databases/(default)/documents/evidence/abc123"),
            "abc123"
        );
        assert_eq!(document_id("abc123"), "abc123");
    }

    #[test]
    fn timestamps_in_any_stored_shape_decode() {
        let docs = vec![
            document(
                collections::INBOX,
                "t1",
                vec![("title", text("Gate notice")), ("createdAt", text("not-a-date"))],
            ),
            document(
                collections::INBOX,
                "t2",
                vec![
                    ("title", text("Fence notice")),
                    ("createdAt", value(ValueType::IntegerValue(1704067200000))),
                ],
            ),
        ];

        let listing: Listing<InboxDoc> = decode_documents(collections::INBOX, &docs);

        assert!(listing.rejected.is_empty());
        assert_eq!(listing.docs.len(), 2);
        assert_eq!(listing.docs[0].id, "t1");
        assert_eq!(listing.docs[0].created_at, None);
        assert_eq!(
            listing.docs[1].created_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn numeric_shift_times_are_kept_as_millis() {
        let docs = vec![document(
            collections::ATTENDANCE,
            "att1",
            vec![
                ("userId", text("e1")),
                ("startTime", value(ValueType::IntegerValue(1704099600000))),
                ("endTime", text("2024-01-01T17:00:00Z")),
            ],
        )];

        let listing: Listing<AttendanceDoc> = decode_documents(collections::ATTENDANCE, &docs);

        assert_eq!(listing.docs.len(), 1);
        assert_eq!(listing.docs[0].start_time.as_deref(), Some("1704099600000"));
        assert_eq!(
            listing.docs[0].end_time.as_deref(),
            Some("2024-01-01T17:00:00Z")
        );
    }

    #[test]
    fn undecodable_document_is_rejected_alone() {
        let docs = vec![
            document(collections::INBOX, "good", vec![("title", text("Ok"))]),
            document(
                collections::INBOX,
                "bad",
                vec![
                    ("title", text("Broken")),
                    ("imageUrls", value(ValueType::IntegerValue(3))),
                ],
            ),
        ];

        let listing: Listing<InboxDoc> = decode_documents(collections::INBOX, &docs);

        assert_eq!(listing.docs.len(), 1);
        assert_eq!(listing.docs[0].id, "good");
        assert_eq!(listing.rejected.len(), 1);
        assert!(matches!(
            &listing.rejected[0],
            SchemaError::Malformed { collection: "inbox", id, .. } if id == "bad"
        ));
    }

    #[test]
    fn replayed_documents_publish_nothing() {
        let state = seeded(&["r1", "r2"]);

        assert!(apply_listen_event(&state, changed(evidence_doc("r1", 0.0, 1.0))).is_none());
        assert!(apply_listen_event(&state, changed(evidence_doc("r2", 1.0, 1.0))).is_none());

        let snapshot = apply_listen_event(&state, changed(evidence_doc("r2", 9.0, 9.0))).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].attachments[0].lat, 9.0);

        let snapshot = apply_listen_event(&state, changed(evidence_doc("r3", 5.0, 6.0))).unwrap();
        let ids: Vec<_> = snapshot.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn malformed_change_drops_the_stale_copy() {
        let state = seeded(&["r1"]);

        let broken = document(collections::EVIDENCE, "r1", vec![("evidence", text("oops"))]);
        let snapshot = apply_listen_event(&state, changed(broken)).unwrap();

        assert!(snapshot.is_empty());
    }

    #[test]
    fn deletes_publish_and_target_changes_do_not() {
        let state = seeded(&["r1", "r2"]);

        let current = FirestoreListenEvent::TargetChange(TargetChange {
            target_change_type: TargetChangeType::Current as i32,
            ..Default::default()
        });
        assert!(apply_listen_event(&state, current).is_none());

        let delete = FirestoreListenEvent::DocumentDelete(DocumentDelete {
            document: "projects/p/databases/(default)/documents/evidence/r1".to_string(),
            ..Default::default()
        });
        let snapshot = apply_listen_event(&state, delete).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "r2");

        let again = FirestoreListenEvent::DocumentDelete(DocumentDelete {
            document: "projects/p/databases/(default)/documents/evidence/r1".to_string(),
            ..Default::default()
        });
        assert!(apply_listen_event(&state, again).is_none());
    }
}
