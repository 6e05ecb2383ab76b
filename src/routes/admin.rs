// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Write handlers for clients, employees and inbox broadcasts.
//!
//! Mounted next to the read routes in `routes/api.rs`.

use crate::error::{AppError, Result};
use crate::services::admin::{ClientForm, InboxUpload, ProfileForm};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// ID of a newly written document.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreatedResponse {
    pub id: String,
}

// ─── Clients ─────────────────────────────────────────────────

pub(super) async fn create_client(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ClientForm>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let id = state.admin.create_client(form).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub(super) async fn update_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(form): Json<ClientForm>,
) -> Result<StatusCode> {
    state.admin.update_client(&id, form).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn delete_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.admin.delete_client(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Employees ───────────────────────────────────────────────

pub(super) async fn create_employee(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ProfileForm>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let id = state.admin.create_employee(form).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub(super) async fn update_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(form): Json<ProfileForm>,
) -> Result<StatusCode> {
    state.admin.update_employee(&id, form).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn delete_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.admin.delete_employee(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Inbox ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ImagePayload {
    pub file_name: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// Standard base64 of the file contents
    pub data: String,
}

fn default_content_type() -> String {
    "application/octet-stream".to_string()
}

#[derive(Deserialize)]
pub struct InboxPostRequest {
    pub title: String,
    #[serde(default)]
    pub images: Vec<ImagePayload>,
}

pub(super) async fn post_inbox_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InboxPostRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let uploads = body
        .images
        .into_iter()
        .map(|image| {
            let bytes = STANDARD.decode(image.data.as_bytes()).map_err(|e| {
                AppError::BadRequest(format!("{}: invalid base64: {}", image.file_name, e))
            })?;
            Ok(InboxUpload {
                file_name: image.file_name,
                content_type: image.content_type,
                bytes,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let id = state.admin.post_inbox_message(&body.title, uploads).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}
