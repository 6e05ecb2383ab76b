// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase ID token verification and the admin sign-in gate.

use crate::config::Config;
use crate::db::{DocumentStore, UserLookup};
use crate::error::AppError;
use crate::models::{Role, User};
use anyhow::Context;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{watch, Mutex, RwLock};

const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

pub const USER_NOT_FOUND: &str = "User not found in our records.";
pub const NOT_AN_ADMIN: &str = "This user is not an admin.";

/// Identity asserted by a verified Firebase ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// An admin who passed the sign-in gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedInUser {
    /// Firebase Auth UID
    pub uid: String,
    /// `users` document ID
    pub user_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl SignedInUser {
    fn new(identity: &VerifiedIdentity, user: &User) -> Self {
        Self {
            uid: identity.uid.clone(),
            user_id: user.id.clone(),
            name: user.name.clone(),
            phone: identity.phone.clone(),
            email: identity.email.clone(),
        }
    }
}

/// Current signed-in admin, `None` while signed out.
pub type IdentityWatch = watch::Sender<Option<SignedInUser>>;

/// Token verification error categories.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// The token is missing/invalid or claims do not match expectations.
    Rejected(String),
    /// Fetching signing keys failed.
    Transient(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Rejected(msg) => {
                tracing::warn!(reason = %msg, "Rejected ID token");
                AppError::Unauthorized
            }
            AuthError::Transient(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

#[derive(Clone)]
enum VerifierMode {
    Google,
    StaticKey {
        kid: String,
        algorithm: Algorithm,
        decoding_key: Arc<DecodingKey>,
    },
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for Firebase Auth ID tokens.
pub struct FirebaseTokenVerifier {
    http_client: reqwest::Client,
    project_id: String,
    mode: VerifierMode,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl FirebaseTokenVerifier {
    /// Create a production verifier that fetches and caches Google's keys.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_mode(config, VerifierMode::Google)
    }

    /// Create a verifier with a fixed key.
    ///
    /// This is intended for deterministic local/integration tests.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        algorithm: Algorithm,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static key kid must not be empty");
        }
        Self::with_mode(
            config,
            VerifierMode::StaticKey {
                kid,
                algorithm,
                decoding_key: Arc::new(decoding_key),
            },
        )
    }

    fn with_mode(config: &Config, mode: VerifierMode) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building token verifier HTTP client")?;

        tracing::info!(
            project = %config.firebase_project_id,
            "Initialized Firebase ID token verifier"
        );

        Ok(Self {
            http_client,
            project_id: config.firebase_project_id.clone(),
            mode,
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    fn expected_algorithm(&self) -> Algorithm {
        match &self.mode {
            VerifierMode::Google => Algorithm::RS256,
            VerifierMode::StaticKey { algorithm, .. } => *algorithm,
        }
    }

    /// Verify an ID token and extract the signed-in identity.
    pub async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Rejected("ID token is empty".to_string()));
        }

        let header = decode_header(token)
            .map_err(|e| AuthError::Rejected(format!("invalid JWT header: {e}")))?;

        let algorithm = self.expected_algorithm();
        if header.alg != algorithm {
            return Err(AuthError::Rejected(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| AuthError::Rejected("missing JWT kid".to_string()))?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let issuer = format!("https://securetoken.google.com/{}", self.project_id);
        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<FirebaseClaims>(token, decoding_key.as_ref(), &validation)
            .map_err(|e| AuthError::Rejected(format!("JWT validation failed: {e}")))?
            .claims;

        validate_iat(claims.iat)?;

        if claims.sub.is_empty() {
            return Err(AuthError::Rejected("empty subject".to_string()));
        }

        tracing::debug!(
            uid = %claims.sub,
            provider = claims.firebase.as_ref().map(|f| f.sign_in_provider.as_str()).unwrap_or("<unknown>"),
            "Verified Firebase ID token"
        );

        Ok(VerifiedIdentity {
            uid: claims.sub,
            phone: claims.phone_number.filter(|p| !p.is_empty()),
            email: claims.email.filter(|e| !e.is_empty()),
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, AuthError> {
        if let VerifierMode::StaticKey {
            kid: static_kid,
            decoding_key,
            ..
        } = &self.mode
        {
            if kid == static_kid {
                return Ok(decoding_key.clone());
            }
            return Err(AuthError::Rejected(format!(
                "unknown JWT kid for static verifier: {kid}"
            )));
        }

        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(AuthError::Rejected(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), AuthError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        tracing::debug!(jwks_uri = JWKS_URL, "Refreshing Firebase JWKS cache");

        let response = self
            .http_client
            .get(JWKS_URL)
            .send()
            .await
            .map_err(|e| AuthError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| AuthError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let keys_by_kid = usable_keys(jwks);
        if keys_by_kid.is_empty() {
            return Err(AuthError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });

        tracing::debug!(ttl_secs = ttl.as_secs(), "Firebase JWKS cache refreshed");
        Ok(())
    }
}

/// Admit only identities that map to a `users` document tagged `admin`.
///
/// Phone sign-ins are matched by phone, Google sign-ins by email.
pub async fn authorize_admin(
    store: &dyn DocumentStore,
    identity: &VerifiedIdentity,
) -> Result<SignedInUser, AppError> {
    let lookup = match (&identity.phone, &identity.email) {
        (Some(phone), _) => UserLookup::Phone(phone),
        (None, Some(email)) => UserLookup::Email(email),
        (None, None) => return Err(AppError::Forbidden(USER_NOT_FOUND.to_string())),
    };

    let user = store
        .find_user(lookup)
        .await?
        .ok_or_else(|| AppError::Forbidden(USER_NOT_FOUND.to_string()))?;

    if !user.has_role(Role::Admin) {
        tracing::warn!(user_id = %user.id, "Sign-in refused: not an admin");
        return Err(AppError::Forbidden(NOT_AN_ADMIN.to_string()));
    }

    tracing::info!(user_id = %user.id, via = lookup.field(), "Admin signed in");
    Ok(SignedInUser::new(identity, &user))
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    iat: Option<usize>,
    phone_number: Option<String>,
    email: Option<String>,
    firebase: Option<FirebaseClaim>,
}

#[derive(Debug, Deserialize)]
struct FirebaseClaim {
    #[serde(default)]
    sign_in_provider: String,
}

fn usable_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    let mut keys_by_kid = HashMap::new();

    for jwk in jwks.keys {
        if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
            continue;
        }
        if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            continue;
        }
        if jwk.use_.as_deref().is_some_and(|use_| use_ != "sig") {
            continue;
        }

        match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => {
                keys_by_kid.insert(jwk.kid, Arc::new(key));
            }
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
            }
        }
    }

    keys_by_kid
}

fn validate_iat(iat: Option<usize>) -> Result<(), AuthError> {
    let Some(iat) = iat else {
        return Err(AuthError::Rejected("missing iat claim".to_string()));
    };

    if iat as u64 > now_unix_secs() + CLOCK_SKEW_SECS {
        return Err(AuthError::Rejected("iat claim is in the future".to_string()));
    }

    Ok(())
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value.split(',').find_map(|directive| {
        directive
            .trim()
            .strip_prefix("max-age=")
            .and_then(|raw| raw.trim_matches('"').parse::<u64>().ok())
    })
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
