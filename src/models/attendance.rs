// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Attendance (shift) model.

use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::services::geocode::Coordinate;

/// GPS point recorded by the mobile app.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng")]
    pub longitude: f64,
}

impl From<GeoPoint> for Coordinate {
    fn from(point: GeoPoint) -> Self {
        Coordinate::new(point.latitude, point.longitude)
    }
}

/// Shift record stored in Firestore (`attendance` collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendanceDoc {
    #[serde(rename = "_firestore_id", default, skip_serializing)]
    pub id: String,
    #[serde(rename = "userId", default)]
    pub user_id: String,
    /// Check-in instant as written by the app (ISO 8601 or epoch millis)
    #[serde(
        rename = "startTime",
        default,
        deserialize_with = "crate::models::lenient::instant_text"
    )]
    pub start_time: Option<String>,
    #[serde(
        rename = "endTime",
        default,
        deserialize_with = "crate::models::lenient::instant_text"
    )]
    pub end_time: Option<String>,
    #[serde(rename = "startLocation", default)]
    pub start_location: Option<GeoPoint>,
    #[serde(rename = "endLocation", default)]
    pub end_location: Option<GeoPoint>,
    #[serde(rename = "submitLocation", default)]
    pub submit_location: Option<GeoPoint>,
}

/// Whole hours, minutes and seconds worked in a shift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ShiftDuration {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl ShiftDuration {
    /// Split a number of elapsed seconds. Negative input clamps to zero.
    pub fn from_seconds(total: i64) -> Self {
        let total = total.max(0);
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }
}

impl fmt::Display for ShiftDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m {}s", self.hours, self.minutes, self.seconds)
    }
}

/// Attendance record enriched with place names and duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AttendanceView {
    pub id: String,
    pub user_id: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub start_place: String,
    pub end_place: String,
    pub submit_place: String,
    pub duration: ShiftDuration,
    /// `duration` rendered as "8h 30m 15s"
    pub duration_label: String,
}
