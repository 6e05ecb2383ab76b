// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use vaid_dashboard::config::Config;
use vaid_dashboard::db::{FirestoreDb, MemoryStore};
use vaid_dashboard::models::{ClientDoc, EvidenceAttachment, EvidenceDoc, User};
use vaid_dashboard::routes::create_router;
use vaid_dashboard::services::geocode::{Coordinate, GeocodeError, ReverseGeocoder};
use vaid_dashboard::services::identity::SignedInUser;
use vaid_dashboard::services::{
    FirebaseTokenVerifier, LoadState, MemoryObjectStore, Slice, ViewSnapshot, ViewStore,
};
use vaid_dashboard::AppState;

/// Shared secret for test ID tokens (HS256 stand-in for Google's RS256 keys).
#[allow(dead_code)]
pub const ID_TOKEN_SECRET: &[u8] = b"firebase-test-secret";
#[allow(dead_code)]
pub const ID_TOKEN_KID: &str = "test-kid";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

// ─── Geocoder ────────────────────────────────────────────────

/// Geocoder that names every point after its key and counts calls per key.
#[derive(Default)]
pub struct CountingGeocoder {
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    failing: Mutex<HashSet<String>>,
    delay: Duration,
}

#[allow(dead_code)]
impl CountingGeocoder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Default::default()
        })
    }

    pub fn fail_for(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    pub fn calls_for(&self, key: &str) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReverseGeocoder for CountingGeocoder {
    async fn reverse_geocode(&self, point: Coordinate) -> Result<String, GeocodeError> {
        let key = point.key();
        *self.calls.lock().unwrap().entry(key.clone()).or_default() += 1;
        self.total.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.failing.lock().unwrap().contains(&key) {
            return Err(GeocodeError::Http("simulated outage".to_string()));
        }
        Ok(format!("Place {}", key))
    }
}

// ─── App ─────────────────────────────────────────────────────

#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub geocoder: Arc<CountingGeocoder>,
    pub objects: Arc<MemoryObjectStore>,
}

/// Create a test app on in-memory backends, with the subscription manager
/// already following the identity channel.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Arc::new(MemoryStore::new()), CountingGeocoder::new())
}

#[allow(dead_code)]
pub fn create_test_app_with(store: Arc<MemoryStore>, geocoder: Arc<CountingGeocoder>) -> TestApp {
    let config = Config::test_default();
    let objects = Arc::new(MemoryObjectStore::new());
    let verifier = FirebaseTokenVerifier::new_with_static_key(
        &config,
        ID_TOKEN_KID,
        Algorithm::HS256,
        DecodingKey::from_secret(ID_TOKEN_SECRET),
    )
    .expect("verifier");

    let state = Arc::new(AppState::new(
        config,
        store.clone(),
        geocoder.clone(),
        objects.clone(),
        Arc::new(verifier),
    ));
    state.spawn_subscriptions();

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        geocoder,
        objects,
    }
}

/// Mint a Firebase-style ID token for a phone sign-in.
#[allow(dead_code)]
pub fn phone_id_token(uid: &str, phone: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = serde_json::json!({
        "iss": "https://securetoken.google.com/test-project",
        "aud": "test-project",
        "sub": uid,
        "iat": now,
        "exp": now + 3600,
        "phone_number": phone,
        "firebase": { "sign_in_provider": "phone" }
    });

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(ID_TOKEN_KID.to_string());
    encode(&header, &claims, &EncodingKey::from_secret(ID_TOKEN_SECRET)).unwrap()
}

// ─── Fixtures ────────────────────────────────────────────────

#[allow(dead_code)]
pub fn user(id: &str, name: &str, phone: &str, roles: &[&str]) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", id),
        phone: phone.to_string(),
        address: "1 Main St".to_string(),
        active: true,
        role: roles.iter().map(|r| r.to_string()).collect(),
        fcmtoken: vec![],
        group: vec![],
    }
}

#[allow(dead_code)]
pub fn admin(id: &str, phone: &str) -> User {
    user(id, "Admin", phone, &["admin"])
}

#[allow(dead_code)]
pub fn signed_in(uid: &str, user: &User) -> SignedInUser {
    SignedInUser {
        uid: uid.to_string(),
        user_id: user.id.clone(),
        name: user.name.clone(),
        phone: Some(user.phone.clone()),
        email: None,
    }
}

#[allow(dead_code)]
pub fn client_doc(id: &str, owner: &str) -> ClientDoc {
    ClientDoc {
        id: id.to_string(),
        user_id: owner.to_string(),
        sitename: format!("Site {}", id),
        sitelocation: "North gate".to_string(),
        siteaddress: "9 Harbour Rd".to_string(),
        poc: "Meera".to_string(),
        users: vec![],
        createdat: Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()),
    }
}

#[allow(dead_code)]
pub fn evidence(id: &str, owner: &str, points: &[(f64, f64)]) -> EvidenceDoc {
    EvidenceDoc {
        id: id.to_string(),
        user_id: owner.to_string(),
        message: format!("Patrol report {}", id),
        attachments: points
            .iter()
            .enumerate()
            .map(|(i, (lat, lng))| EvidenceAttachment {
                url: format!("https://img.example.com/{}/{}.jpg", id, i),
                lat: *lat,
                lng: *lng,
            })
            .collect(),
    }
}

// ─── Waiting ─────────────────────────────────────────────────

/// Wait until the view satisfies `pred`, or panic after a few seconds.
#[allow(dead_code)]
pub async fn wait_for_view(
    view: &ViewStore,
    pred: impl Fn(&ViewSnapshot) -> bool,
) -> ViewSnapshot {
    let mut rx = view.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let snap = rx.borrow_and_update();
                if pred(&snap) {
                    return snap.clone();
                }
            }
            rx.changed().await.expect("view store dropped");
        }
    })
    .await
    .expect("timed out waiting for view")
}

#[allow(dead_code)]
pub fn all_ready(snap: &ViewSnapshot) -> bool {
    Slice::ALL
        .iter()
        .all(|s| matches!(snap.state(*s), LoadState::Ready { .. }))
}

/// Poll `check` until it holds, or panic after a few seconds.
#[allow(dead_code)]
pub async fn eventually(check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition never became true")
}
