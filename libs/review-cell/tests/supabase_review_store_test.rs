use std::collections::BTreeMap;
use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{Appointment, AppointmentStatus};
use appointment_cell::store::{AppointmentStore, InMemoryAppointmentStore};
use review_cell::models::{CreateReviewRequest, RatingStatsFilter, ReviewError};
use review_cell::services::{RatingAggregator, ReviewGate};
use review_cell::store::SupabaseReviewStore;
use shared_config::{AppConfig, SchedulingConfig};
use shared_database::SupabaseClient;
use shared_utils::clock::FixedClock;
use shared_utils::test_utils::{date, fixture_now, init_test_tracing, time, TestUser};

fn store_for(server: &MockServer) -> Arc<SupabaseReviewStore> {
    init_test_tracing();

    let mut config = AppConfig::in_memory(SchedulingConfig::default());
    config.supabase_url = server.uri();
    config.supabase_anon_key = "test-anon-key".to_string();

    Arc::new(SupabaseReviewStore::new(Arc::new(SupabaseClient::new(&config)), None))
}

#[tokio::test]
async fn test_unique_violation_means_already_reviewed() {
    let server = MockServer::start().await;
    let client = TestUser::client("client@example.com");
    let provider_id = Uuid::new_v4();

    let appointments = Arc::new(InMemoryAppointmentStore::new());
    let appointment = appointments.insert(Appointment {
        id: Uuid::new_v4(),
        client_id: client.id,
        provider_id,
        service_id: Uuid::new_v4(),
        scheduled_date: date(2024, 11, 20),
        scheduled_time: time(10, 0),
        duration_minutes: 30,
        status: AppointmentStatus::Completed,
        location: None,
        notes: None,
        created_at: fixture_now(),
        updated_at: fixture_now(),
    }).await.unwrap();

    // The pre-check sees no review, the insert hits reviews_appointment_idx
    Mock::given(method("GET"))
        .and(path("/rest/v1/reviews"))
        .and(query_param("appointment_id", format!("eq.{}", appointment.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/reviews"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"reviews_appointment_idx\""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gate = ReviewGate::new(
        store_for(&server),
        appointments,
        Arc::new(FixedClock::new(fixture_now())),
        SchedulingConfig::default(),
    );

    let result = gate.create_review(&client.actor(), CreateReviewRequest {
        appointment_id: appointment.id,
        client_id: client.id,
        provider_id,
        rating: 5.0,
        comment: None,
    }).await;

    assert_matches!(result, Err(ReviewError::AlreadyReviewed));
}

#[tokio::test]
async fn test_stats_select_only_ratings() {
    let server = MockServer::start().await;
    let provider_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/reviews"))
        .and(query_param("select", "rating"))
        .and(query_param("provider_id", format!("eq.{}", provider_id)))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "rating": 5 }, { "rating": 5 }, { "rating": 4 }, { "rating": 3 }, { "rating": 1 }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/reviews"))
        .and(query_param("offset", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let aggregator = RatingAggregator::new(store_for(&server));
    let stats = aggregator.stats(&RatingStatsFilter::for_provider(provider_id)).await.unwrap();

    assert_eq!(stats.total, 5);
    assert_eq!(stats.average_rating, 3.6);
    assert_eq!(stats.rating_distribution, BTreeMap::from([(1, 1), (2, 0), (3, 1), (4, 1), (5, 2)]));
}

#[tokio::test]
async fn test_stats_read_past_the_server_row_cap() {
    let server = MockServer::start().await;
    let provider_id = Uuid::new_v4();

    // Server hands out at most three rows per response
    let pages = [
        ("0", json!([{ "rating": 5 }, { "rating": 5 }, { "rating": 5 }])),
        ("3", json!([{ "rating": 4 }, { "rating": 2 }, { "rating": 1 }])),
        ("6", json!([{ "rating": 3 }])),
        ("7", json!([])),
    ];
    for (offset, body) in pages {
        Mock::given(method("GET"))
            .and(path("/rest/v1/reviews"))
            .and(query_param("select", "rating"))
            .and(query_param("order", "id.asc"))
            .and(query_param("offset", offset))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let aggregator = RatingAggregator::new(store_for(&server));
    let stats = aggregator.stats(&RatingStatsFilter::for_provider(provider_id)).await.unwrap();

    assert_eq!(stats.total, 7);
    assert_eq!(stats.average_rating, 3.57);
    assert_eq!(stats.rating_distribution, BTreeMap::from([(1, 1), (2, 1), (3, 1), (4, 1), (5, 3)]));
}

#[tokio::test]
async fn test_out_of_range_rating_from_storage_is_a_decode_error() {
    let server = MockServer::start().await;
    let provider_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "rating": 9 }])))
        .mount(&server)
        .await;

    let aggregator = RatingAggregator::new(store_for(&server));
    let result = aggregator.stats(&RatingStatsFilter::for_provider(provider_id)).await;

    assert_matches!(result, Err(ReviewError::DatabaseError(_)));
}
