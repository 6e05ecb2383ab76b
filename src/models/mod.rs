// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.
//!
//! `*Doc` types mirror the stored Firestore documents; `*View` types are the
//! read-side projections handed to the dashboard.

pub mod attendance;
pub mod client;
pub mod evidence;
pub mod inbox;
pub mod lenient;
pub mod user;

pub use attendance::{AttendanceDoc, AttendanceView, GeoPoint, ShiftDuration};
pub use client::{ClientDoc, ClientSite};
pub use evidence::{AttachmentView, EvidenceAttachment, EvidenceDoc, EvidenceView};
pub use inbox::{InboxDoc, InboxView};
pub use user::{Role, User, UserProfile, UserRow};
