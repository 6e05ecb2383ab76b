// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin sign-in and sign-out.
//!
//! The browser signs in with Firebase Auth (phone OTP or Google) and posts
//! the resulting ID token here. Only users tagged `admin` get a session.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::services::identity::{authorize_admin, SignedInUser};
use crate::AppState;

/// Public routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/session", post(create_session))
}

/// Routes that need an existing session.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
pub struct SessionRequest {
    id_token: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub user: SignedInUser,
    /// Same value as the session cookie, for non-browser clients
    pub token: String,
}

/// Exchange a Firebase ID token for a dashboard session.
async fn create_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SessionRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let identity = state.token_verifier.verify(&body.id_token).await?;
    let user = authorize_admin(state.store.as_ref(), &identity).await?;

    let token = create_jwt(&user.user_id, &user.uid, &state.config.jwt_signing_key)?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax);

    // Starts (or keeps) the data subscriptions for this admin.
    state.identity.send_replace(Some(user.clone()));

    Ok((jar.add(cookie), Json(SessionResponse { user, token })))
}

/// Sign out: clear the cookie and stop the data subscriptions.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    state.identity.send_replace(None);
    tracing::info!("Admin signed out");
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    )
}
