use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, Utc};

use appointment_cell::models::{AppointmentError, AppointmentStatus};
use appointment_cell::repository::{
    AppointmentFilter, AppointmentRepository, InMemoryRepository, NewAppointment,
};

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn new_appt(patient_id: i64, doctor_id: i64, start: &str) -> NewAppointment {
    let slot_start = ts(start);
    NewAppointment {
        patient_id,
        doctor_id,
        department: "cardiology".to_string(),
        slot_start,
        slot_end: slot_start + chrono::Duration::minutes(30),
    }
}

#[tokio::test]
async fn create_assigns_id_and_scheduled_status() {
    let repo = InMemoryRepository::new();

    let a = repo.create(new_appt(1, 5, "2025-06-02T10:00:00Z")).await.unwrap();
    let b = repo.create(new_appt(1, 5, "2025-06-02T11:00:00Z")).await.unwrap();

    assert_eq!(a.status, AppointmentStatus::Scheduled);
    assert_eq!(a.reschedule_count, 0);
    assert_ne!(a.appointment_id, b.appointment_id);
}

#[tokio::test]
async fn create_rejects_scheduled_double_booking_of_a_slot() {
    let repo = InMemoryRepository::new();

    repo.create(new_appt(1, 5, "2025-06-02T10:00:00Z")).await.unwrap();
    let second = repo.create(new_appt(2, 5, "2025-06-02T10:00:00Z")).await;
    assert_matches!(second, Err(AppointmentError::DoctorConflict));

    // A cancelled row frees the slot for re-booking
    let (rows, _) = repo
        .find_by_filter(&AppointmentFilter::default(), 0, 10)
        .await
        .unwrap();
    let mut cancelled = rows[0].clone();
    cancelled.status = AppointmentStatus::Cancelled;
    repo.save(&cancelled).await.unwrap();

    assert!(repo.create(new_appt(2, 5, "2025-06-02T10:00:00Z")).await.is_ok());
}

#[tokio::test]
async fn concurrent_bookings_of_one_slot_admit_exactly_one() {
    let repo = Arc::new(InMemoryRepository::new());

    let (a, b) = tokio::join!(
        repo.create(new_appt(1, 5, "2025-06-02T10:00:00Z")),
        repo.create(new_appt(2, 5, "2025-06-02T10:00:00Z")),
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
}

#[tokio::test]
async fn listing_orders_by_slot_start_descending_and_paginates() {
    let repo = InMemoryRepository::new();

    repo.create(new_appt(1, 5, "2025-06-02T09:00:00Z")).await.unwrap();
    repo.create(new_appt(1, 5, "2025-06-02T11:00:00Z")).await.unwrap();
    repo.create(new_appt(2, 6, "2025-06-02T10:00:00Z")).await.unwrap();

    let (items, total) = repo
        .find_by_filter(&AppointmentFilter::default(), 0, 2)
        .await
        .unwrap();
    assert_eq!(total, 3);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].slot_start, ts("2025-06-02T11:00:00Z"));
    assert_eq!(items[1].slot_start, ts("2025-06-02T10:00:00Z"));

    let (rest, _) = repo
        .find_by_filter(&AppointmentFilter::default(), 2, 2)
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].slot_start, ts("2025-06-02T09:00:00Z"));
}

#[tokio::test]
async fn filters_compose() {
    let repo = InMemoryRepository::new();

    repo.create(new_appt(1, 5, "2025-06-02T09:00:00Z")).await.unwrap();
    let other = repo.create(new_appt(1, 6, "2025-06-02T10:00:00Z")).await.unwrap();
    repo.create(new_appt(2, 5, "2025-06-02T11:00:00Z")).await.unwrap();

    let mut completed = other.clone();
    completed.status = AppointmentStatus::Completed;
    repo.save(&completed).await.unwrap();

    let filter = AppointmentFilter {
        patient_id: Some(1),
        doctor_id: None,
        status: Some(AppointmentStatus::Completed),
    };
    let (items, total) = repo.find_by_filter(&filter, 0, 10).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(items[0].appointment_id, other.appointment_id);
}

#[tokio::test]
async fn save_requires_an_existing_row() {
    let repo = InMemoryRepository::new();
    let appt = repo.create(new_appt(1, 5, "2025-06-02T10:00:00Z")).await.unwrap();

    let mut ghost = appt.clone();
    ghost.appointment_id = 9999;
    assert_matches!(repo.save(&ghost).await, Err(AppointmentError::NotFound));
}

#[tokio::test]
async fn idempotent_lookup_matches_scheduled_rows_only() {
    let repo = InMemoryRepository::new();
    let appt = repo.create(new_appt(1, 5, "2025-06-02T10:00:00Z")).await.unwrap();

    let hit = repo
        .find_existing_scheduled(1, 5, ts("2025-06-02T10:00:00Z"))
        .await
        .unwrap();
    assert_eq!(hit.map(|a| a.appointment_id), Some(appt.appointment_id));

    let mut cancelled = appt.clone();
    cancelled.status = AppointmentStatus::Cancelled;
    repo.save(&cancelled).await.unwrap();

    let miss = repo
        .find_existing_scheduled(1, 5, ts("2025-06-02T10:00:00Z"))
        .await
        .unwrap();
    assert!(miss.is_none());
}
