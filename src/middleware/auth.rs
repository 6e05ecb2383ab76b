// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT session middleware.
//!
//! A session token is only honoured while the admin it names is still the
//! signed-in identity; signing out (or another admin signing in) invalidates
//! every outstanding token.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "vaid_session";

/// Session lifetime in seconds.
pub const SESSION_TTL_SECS: usize = 12 * 60 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (`users` document ID)
    pub sub: String,
    /// Firebase Auth UID
    pub uid: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated admin extracted from the session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub uid: String,
}

/// Middleware that requires a valid session for the current admin.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(SESSION_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => return Err(StatusCode::UNAUTHORIZED),
        }
    };

    let key = DecodingKey::from_secret(&state.config.jwt_signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let claims = decode::<Claims>(&token, &key, &validation)
        .map_err(|_| StatusCode::UNAUTHORIZED)?
        .claims;

    let current = state.identity.borrow().clone();
    match current {
        Some(user) if user.uid == claims.uid && user.user_id == claims.sub => {}
        _ => {
            tracing::debug!(user_id = %claims.sub, "Session token for inactive identity");
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        uid: claims.uid,
    });

    Ok(next.run(request).await)
}

/// Create a JWT for an admin session.
pub fn create_jwt(user_id: &str, uid: &str, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        uid: uid.to_string(),
        iat: now,
        exp: now + SESSION_TTL_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}
