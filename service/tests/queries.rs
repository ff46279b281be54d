//! Filtered conference queries.

#![allow(clippy::unwrap_used)]

mod common;

use common::Harness;
use conference_core::error::ErrorKind;
use conference_core::filter::ConferenceFilter;
use conference_core::model::Conference;
use conference_service::forms::ConferenceForm;
use proptest::prelude::*;

const CATALOG: [(&str, &str, &str, u32); 5] = [
    ("Borrow Summit", "London", "2026-03-10", 40),
    ("Crab Days", "Paris", "2026-06-01", 12),
    ("Async Fest", "London", "2026-06-20", 12),
    ("Macro Meetup", "Berlin", "2026-11-05", 8),
    ("Zero Cost", "London", "2026-09-15", 55),
];

async fn seeded() -> Harness {
    let h = Harness::new();
    for (name, city, start, max) in CATALOG {
        h.service
            .create_conference(
                &h.organizer,
                &ConferenceForm {
                    name: Some(name.into()),
                    city: Some(city.into()),
                    topics: Some(vec![city.to_lowercase(), "rust".into()]),
                    start_date: Some(start.into()),
                    max_attendees: Some(max),
                    ..ConferenceForm::default()
                },
            )
            .await
            .unwrap();
    }
    h
}

fn names(conferences: &[Conference]) -> Vec<&str> {
    conferences.iter().map(|c| c.name.as_str()).collect()
}

#[tokio::test]
async fn no_filters_returns_everything_by_name() {
    let h = seeded().await;

    let all = h.service.query_conferences(&[]).await.unwrap();

    assert_eq!(
        names(&all),
        ["Async Fest", "Borrow Summit", "Crab Days", "Macro Meetup", "Zero Cost"]
    );
}

#[tokio::test]
async fn equality_and_inequality_filters_combine() {
    let h = seeded().await;

    let found = h
        .service
        .query_conferences(&[
            ConferenceFilter::new("CITY", "EQ", "London"),
            ConferenceFilter::new("MONTH", "GTEQ", "6"),
        ])
        .await
        .unwrap();

    // Ordered by month first, then name.
    assert_eq!(names(&found), ["Async Fest", "Zero Cost"]);
}

#[tokio::test]
async fn topic_filter_matches_list_membership() {
    let h = seeded().await;

    let found = h
        .service
        .query_conferences(&[ConferenceFilter::new("TOPIC", "EQ", "paris")])
        .await
        .unwrap();

    assert_eq!(names(&found), ["Crab Days"]);
}

#[tokio::test]
async fn two_inequality_fields_are_rejected() {
    let h = seeded().await;

    let err = h
        .service
        .query_conferences(&[
            ConferenceFilter::new("MONTH", "GT", "3"),
            ConferenceFilter::new("MAX_ATTENDEES", "LT", "50"),
        ])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert_eq!(err.code(), "MULTIPLE_INEQUALITY_FIELDS");
}

#[tokio::test]
async fn malformed_filters_are_rejected() {
    let h = seeded().await;
    let cases = [
        (ConferenceFilter::new("COUNTRY", "EQ", "UK"), "INVALID_FILTER_FIELD"),
        (ConferenceFilter::new("CITY", "LIKE", "Lon"), "INVALID_FILTER_OPERATOR"),
        (ConferenceFilter::new("MONTH", "EQ", "June"), "INVALID_FILTER_VALUE"),
    ];

    for (filter, code) in cases {
        let err = h.service.query_conferences(&[filter]).await.unwrap_err();
        assert_eq!(err.code(), code);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn capacity_range_returns_exactly_the_matching_conferences(low in 0u32..60, span in 0u32..60) {
        let high = low + span;
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let found = runtime.block_on(async {
            let h = seeded().await;
            h.service
                .query_conferences(&[
                    ConferenceFilter::new("MAX_ATTENDEES", "GTEQ", low.to_string()),
                    ConferenceFilter::new("MAX_ATTENDEES", "LTEQ", high.to_string()),
                ])
                .await
                .unwrap()
        });

        let mut expected: Vec<(u32, &str)> = CATALOG
            .iter()
            .filter(|(_, _, _, max)| (low..=high).contains(max))
            .map(|(name, _, _, max)| (*max, *name))
            .collect();
        expected.sort_unstable();
        let actual: Vec<(u32, &str)> = found.iter().map(|c| (c.max_attendees, c.name.as_str())).collect();
        prop_assert_eq!(actual, expected);
    }
}
