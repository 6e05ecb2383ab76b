// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Evidence enrichment: a place name for every photo attachment.

use crate::models::{AttachmentView, EvidenceDoc, EvidenceView};
use crate::services::geocode::{place_name, Coordinate, GeocodeMemoizer};

/// Resolve every attachment of every record in one memoized batch.
pub async fn enrich_evidence(
    records: &[EvidenceDoc],
    memoizer: &GeocodeMemoizer,
) -> Vec<EvidenceView> {
    let points: Vec<Coordinate> = records
        .iter()
        .flat_map(|r| r.attachments.iter().map(|a| a.coordinate()))
        .collect();

    let places = memoizer.resolve_batch(&points).await;

    records
        .iter()
        .map(|r| EvidenceView {
            id: r.id.clone(),
            user_id: r.user_id.clone(),
            message: r.message.clone(),
            attachments: r
                .attachments
                .iter()
                .map(|a| AttachmentView {
                    url: a.url.clone(),
                    lat: a.lat,
                    lng: a.lng,
                    place: place_name(&places, Some(a.coordinate())),
                })
                .collect(),
        })
        .collect()
}
