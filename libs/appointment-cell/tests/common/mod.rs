use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::BookingRules;
use appointment_cell::repository::InMemoryRepository;
use appointment_cell::services::collaborators::CollaboratorGateway;
use appointment_cell::services::lifecycle::AppointmentLifecycleService;
use shared_config::AppConfig;

/// Config pointing every collaborator at the given mock server.
pub fn test_config(base_url: &str) -> AppConfig {
    AppConfig {
        patient_service_url: base_url.to_string(),
        doctor_service_url: base_url.to_string(),
        billing_service_url: base_url.to_string(),
        notification_service_url: base_url.to_string(),
        port: 0,
    }
}

/// Happy-path collaborators: every patient exists, every doctor belongs to
/// `department`, billing and notifications accept everything.
pub async fn mount_happy_collaborators(server: &MockServer, department: &str) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/patients/\d+/exists$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"exists": true})))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/doctors/\d+/department$"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"department": department})),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/v1/bills$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"bill_id": 99})))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/v1/notifications$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"delivered": true})))
        .mount(server)
        .await;
}

pub fn engine(repository: Arc<InMemoryRepository>, base_url: &str) -> AppointmentLifecycleService {
    AppointmentLifecycleService::new(repository, CollaboratorGateway::new(test_config(base_url)))
}

pub fn engine_with_rules(
    repository: Arc<InMemoryRepository>,
    base_url: &str,
    rules: BookingRules,
) -> AppointmentLifecycleService {
    AppointmentLifecycleService::with_rules(
        repository,
        CollaboratorGateway::new(test_config(base_url)),
        rules,
    )
}

/// A valid 30-minute slot `days_ahead` days out, starting at the given
/// clinic-hours time. Always clears the 2 hour lead time.
pub fn slot_at(days_ahead: i64, hour: u32, minute: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = (Utc::now() + Duration::days(days_ahead))
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
        .and_utc();
    (start, start + Duration::minutes(30))
}
