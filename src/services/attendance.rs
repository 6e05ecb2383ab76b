// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance enrichment: place names and shift durations.

use crate::models::{AttendanceDoc, AttendanceView, GeoPoint, ShiftDuration};
use crate::services::geocode::{place_name, Coordinate, GeocodeMemoizer};
use crate::time_utils::parse_instant;

/// Time between check-in and check-out.
///
/// Missing or unparseable timestamps, and an end before the start, give a
/// zero duration.
pub fn shift_duration(start: Option<&str>, end: Option<&str>) -> ShiftDuration {
    let (Some(start), Some(end)) = (start.and_then(parse_instant), end.and_then(parse_instant))
    else {
        return ShiftDuration::default();
    };
    ShiftDuration::from_seconds((end - start).num_seconds())
}

/// Attach place names and durations to attendance records.
///
/// All coordinates go through the memoizer as a single batch. Output order
/// matches input order; a failed lookup never drops a record.
pub async fn enrich_attendance(
    records: &[AttendanceDoc],
    memoizer: &GeocodeMemoizer,
) -> Vec<AttendanceView> {
    let points: Vec<Coordinate> = records
        .iter()
        .flat_map(|r| [r.start_location, r.end_location, r.submit_location])
        .flatten()
        .map(Coordinate::from)
        .collect();

    let places = memoizer.resolve_batch(&points).await;
    let place = |point: Option<GeoPoint>| place_name(&places, point.map(Coordinate::from));

    records
        .iter()
        .map(|r| {
            let duration = shift_duration(r.start_time.as_deref(), r.end_time.as_deref());
            AttendanceView {
                id: r.id.clone(),
                user_id: r.user_id.clone(),
                start_time: r.start_time.clone(),
                end_time: r.end_time.clone(),
                start_place: place(r.start_location),
                end_place: place(r.end_location),
                submit_place: place(r.submit_location),
                duration,
                duration_label: duration.to_string(),
            }
        })
        .collect()
}
