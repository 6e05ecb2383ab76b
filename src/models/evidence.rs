// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Evidence (geotagged photo report) model.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::services::geocode::Coordinate;

/// One photo attached to an evidence report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceAttachment {
    #[serde(default)]
    pub url: String,
    pub lat: f64,
    pub lng: f64,
}

impl EvidenceAttachment {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Evidence report stored in Firestore (`evidence` collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceDoc {
    #[serde(rename = "_firestore_id", default, skip_serializing)]
    pub id: String,
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "evidence", default)]
    pub attachments: Vec<EvidenceAttachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AttachmentView {
    pub url: String,
    pub lat: f64,
    pub lng: f64,
    pub place: String,
}

/// Evidence report with a place name per attachment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EvidenceView {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub attachments: Vec<AttachmentView>,
}
