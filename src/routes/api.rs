// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-side API routes for the signed-in admin.
//!
//! Reads are served from the current view snapshot. Writes go through
//! `AdminService` (handlers in `routes/admin.rs`).

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    AttendanceView, EvidenceView, InboxView, Role, UserProfile, UserRow,
};
use crate::routes::admin;
use crate::services::inbox::search_by_title;
use crate::services::view::{Slice, ViewSnapshot};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/view", get(get_view))
        .route(
            "/api/employees",
            get(list_employees).post(admin::create_employee),
        )
        .route(
            "/api/employees/{id}",
            get(get_employee)
                .put(admin::update_employee)
                .delete(admin::delete_employee),
        )
        .route("/api/clients", get(list_clients).post(admin::create_client))
        .route(
            "/api/clients/{id}",
            get(get_client)
                .put(admin::update_client)
                .delete(admin::delete_client),
        )
        .route("/api/attendance", get(list_attendance))
        .route("/api/evidence", get(list_evidence))
        .route("/api/inbox", get(list_inbox).post(admin::post_inbox_message))
        .route("/api/inbox/{id}", get(get_inbox_message))
        .route("/api/locations", get(get_locations))
        .route("/api/refresh/{slice}", post(refresh_slice))
}

// ─── Session ─────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MeResponse {
    pub user_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    let current = state
        .identity
        .borrow()
        .clone()
        .filter(|u| u.uid == user.uid)
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(MeResponse {
        user_id: current.user_id,
        name: current.name,
        phone: current.phone,
        email: current.email,
    }))
}

async fn get_view(State(state): State<Arc<AppState>>) -> Json<ViewSnapshot> {
    Json(state.view.snapshot())
}

// ─── Employees ───────────────────────────────────────────────

async fn list_employees(State(state): State<Arc<AppState>>) -> Json<Arc<Vec<UserProfile>>> {
    Json(state.view.snapshot().employees)
}

#[derive(Serialize)]
pub struct EmployeeDetail {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub attendance: Vec<AttendanceView>,
}

async fn get_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EmployeeDetail>> {
    let snapshot = state.view.snapshot();
    let profile = snapshot
        .employees
        .iter()
        .find(|e| e.id == id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", id)))?;

    let attendance = snapshot
        .attendance
        .iter()
        .filter(|a| a.user_id == id)
        .cloned()
        .collect();

    Ok(Json(EmployeeDetail {
        profile,
        attendance,
    }))
}

// ─── Clients ─────────────────────────────────────────────────

fn is_client(row: &UserRow) -> bool {
    row.profile.role.iter().any(|r| r == Role::Client.as_str())
}

async fn list_clients(State(state): State<Arc<AppState>>) -> Json<Vec<UserRow>> {
    let snapshot = state.view.snapshot();
    Json(snapshot.users.iter().filter(|r| is_client(r)).cloned().collect())
}

#[derive(Serialize)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub row: UserRow,
    /// Evidence reports filed against this client
    pub evidence: Vec<EvidenceView>,
}

async fn get_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ClientDetail>> {
    let snapshot = state.view.snapshot();
    let row = snapshot
        .users
        .iter()
        .find(|r| r.profile.id == id && is_client(r))
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Client {} not found", id)))?;

    let evidence = snapshot
        .evidence
        .iter()
        .filter(|e| e.user_id == id)
        .cloned()
        .collect();

    Ok(Json(ClientDetail { row, evidence }))
}

// ─── Attendance & Evidence ───────────────────────────────────

async fn list_attendance(State(state): State<Arc<AppState>>) -> Json<Arc<Vec<AttendanceView>>> {
    Json(state.view.snapshot().attendance)
}

async fn list_evidence(State(state): State<Arc<AppState>>) -> Json<Arc<Vec<EvidenceView>>> {
    Json(state.view.snapshot().evidence)
}

async fn get_locations(
    State(state): State<Arc<AppState>>,
) -> Json<Arc<HashMap<String, String>>> {
    Json(state.view.snapshot().locations)
}

// ─── Inbox ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    q: String,
}

async fn list_inbox(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InboxQuery>,
) -> Json<Vec<InboxView>> {
    let snapshot = state.view.snapshot();
    Json(
        search_by_title(&snapshot.inbox, &query.q)
            .into_iter()
            .cloned()
            .collect(),
    )
}

async fn get_inbox_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<InboxView>> {
    state
        .view
        .snapshot()
        .inbox
        .iter()
        .find(|m| m.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Message {} not found", id)))
}

// ─── Refresh ─────────────────────────────────────────────────

async fn refresh_slice(
    State(state): State<Arc<AppState>>,
    Path(slice): Path<String>,
) -> Result<StatusCode> {
    let slice: Slice = slice.parse().map_err(AppError::BadRequest)?;
    state.subscriptions.refresh(slice).await?;
    Ok(StatusCode::ACCEPTED)
}
