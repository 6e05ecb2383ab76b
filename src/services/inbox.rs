// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Inbox ordering and search.

use crate::models::{InboxDoc, InboxView};
use crate::time_utils::format_display_date;
use chrono::{DateTime, Utc};

/// Newest first. Ties keep store order; a missing `createdAt` sorts as `now`.
pub fn sort_inbox(messages: Vec<InboxDoc>, now: DateTime<Utc>) -> Vec<InboxView> {
    let mut views: Vec<InboxView> = messages
        .into_iter()
        .map(|m| {
            let created_at = m.created_at.unwrap_or(now);
            InboxView {
                id: m.id,
                title: m.title,
                created_at,
                created_at_fallback: m.created_at.is_none(),
                display_date: format_display_date(created_at),
                image_urls: m.image_urls,
            }
        })
        .collect();

    // `sort_by` is stable.
    views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    views
}

/// Case-insensitive title filter. An empty query matches everything.
pub fn search_by_title<'a>(views: &'a [InboxView], query: &str) -> Vec<&'a InboxView> {
    let needle = query.trim().to_lowercase();
    views
        .iter()
        .filter(|v| needle.is_empty() || v.title.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn msg(id: &str, at: Option<DateTime<Utc>>) -> InboxDoc {
        InboxDoc {
            id: id.to_string(),
            title: format!("Notice {}", id),
            created_at: at,
            image_urls: vec![],
        }
    }

    fn ids(views: &[InboxView]) -> Vec<&str> {
        views.iter().map(|v| v.id.as_str()).collect()
    }

    #[test]
    fn newest_first() {
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t3 = t1 + Duration::days(1);
        let t2 = t1 + Duration::days(2);

        let sorted = sort_inbox(
            vec![msg("t2", Some(t2)), msg("t1", Some(t1)), msg("t3", Some(t3))],
            Utc::now(),
        );

        assert_eq!(ids(&sorted), vec!["t2", "t3", "t1"]);
        assert_eq!(sorted[2].display_date, "1/1/2024");
    }

    #[test]
    fn ties_keep_store_order() {
        let t = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let sorted = sort_inbox(
            vec![msg("a", Some(t)), msg("b", Some(t)), msg("c", Some(t))],
            Utc::now(),
        );
        assert_eq!(ids(&sorted), vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_timestamp_sorts_as_now() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let sorted = sort_inbox(
            vec![
                msg("old", Some(now - Duration::days(3))),
                msg("undated", None),
                msg("future", Some(now + Duration::hours(1))),
            ],
            now,
        );

        assert_eq!(ids(&sorted), vec!["future", "undated", "old"]);
        assert!(sorted[1].created_at_fallback);
        assert_eq!(sorted[1].created_at, now);
    }

    #[test]
    fn search_ignores_case() {
        let now = Utc::now();
        let mut docs = vec![msg("1", Some(now)), msg("2", Some(now))];
        docs[0].title = "Holiday Schedule".to_string();
        docs[1].title = "Uniform policy".to_string();
        let views = sort_inbox(docs, now);

        let hits = search_by_title(&views, "  HOLIDAY ");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1");
        assert_eq!(search_by_title(&views, "").len(), 2);
    }
}
