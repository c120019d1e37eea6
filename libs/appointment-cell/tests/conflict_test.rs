use std::sync::Arc;

use chrono::{DateTime, Utc};

use appointment_cell::models::AppointmentStatus;
use appointment_cell::repository::{AppointmentRepository, InMemoryRepository, NewAppointment};
use appointment_cell::services::conflict::{intervals_overlap, ConflictDetectionService};

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn new_appt(patient_id: i64, doctor_id: i64, start: &str, end: &str) -> NewAppointment {
    NewAppointment {
        patient_id,
        doctor_id,
        department: "cardiology".to_string(),
        slot_start: ts(start),
        slot_end: ts(end),
    }
}

#[test]
fn overlap_is_half_open() {
    let a = ts("2025-06-02T10:00:00Z");
    let b = ts("2025-06-02T10:30:00Z");
    let c = ts("2025-06-02T10:15:00Z");
    let d = ts("2025-06-02T10:45:00Z");

    assert!(intervals_overlap(a, b, c, d));
    assert!(intervals_overlap(c, d, a, b));
    // Touching endpoints do not conflict
    assert!(!intervals_overlap(a, b, b, d));
    assert!(!intervals_overlap(b, d, a, b));
    // Containment
    assert!(intervals_overlap(a, d, b, c));
}

#[tokio::test]
async fn doctor_conflict_respects_status_filter() {
    let repo = Arc::new(InMemoryRepository::new());
    let detector = ConflictDetectionService::new(repo.clone());

    let appt = repo
        .create(new_appt(1, 5, "2025-06-02T10:00:00Z", "2025-06-02T10:30:00Z"))
        .await
        .unwrap();

    let overlapping = detector
        .has_doctor_conflict(
            5,
            ts("2025-06-02T10:15:00Z"),
            ts("2025-06-02T10:45:00Z"),
            None,
            &[AppointmentStatus::Scheduled, AppointmentStatus::Completed],
        )
        .await
        .unwrap();
    assert!(overlapping);

    // A cancelled appointment no longer blocks the slot
    let mut cancelled = appt.clone();
    cancelled.status = AppointmentStatus::Cancelled;
    repo.save(&cancelled).await.unwrap();

    let overlapping = detector
        .has_doctor_conflict(
            5,
            ts("2025-06-02T10:15:00Z"),
            ts("2025-06-02T10:45:00Z"),
            None,
            &[AppointmentStatus::Scheduled, AppointmentStatus::Completed],
        )
        .await
        .unwrap();
    assert!(!overlapping);
}

#[tokio::test]
async fn doctor_conflict_excludes_the_appointment_itself() {
    let repo = Arc::new(InMemoryRepository::new());
    let detector = ConflictDetectionService::new(repo.clone());

    let appt = repo
        .create(new_appt(1, 5, "2025-06-02T10:00:00Z", "2025-06-02T10:30:00Z"))
        .await
        .unwrap();

    let conflict = detector
        .has_doctor_conflict(
            5,
            ts("2025-06-02T10:00:00Z"),
            ts("2025-06-02T10:30:00Z"),
            Some(appt.appointment_id),
            &[AppointmentStatus::Scheduled],
        )
        .await
        .unwrap();
    assert!(!conflict);
}

#[tokio::test]
async fn patient_conflict_ignores_other_patients() {
    let repo = Arc::new(InMemoryRepository::new());
    let detector = ConflictDetectionService::new(repo.clone());

    repo.create(new_appt(1, 5, "2025-06-02T10:00:00Z", "2025-06-02T10:30:00Z"))
        .await
        .unwrap();

    let same_patient = detector
        .has_patient_conflict(
            1,
            ts("2025-06-02T10:15:00Z"),
            ts("2025-06-02T10:45:00Z"),
            None,
            &[AppointmentStatus::Scheduled],
        )
        .await
        .unwrap();
    assert!(same_patient);

    let other_patient = detector
        .has_patient_conflict(
            2,
            ts("2025-06-02T10:15:00Z"),
            ts("2025-06-02T10:45:00Z"),
            None,
            &[AppointmentStatus::Scheduled],
        )
        .await
        .unwrap();
    assert!(!other_patient);
}

#[tokio::test]
async fn daily_count_uses_calendar_day_of_slot_start() {
    let repo = Arc::new(InMemoryRepository::new());
    let detector = ConflictDetectionService::new(repo.clone());

    repo.create(new_appt(1, 7, "2025-06-02T09:00:00Z", "2025-06-02T09:30:00Z"))
        .await
        .unwrap();
    repo.create(new_appt(2, 7, "2025-06-02T17:30:00Z", "2025-06-02T18:00:00Z"))
        .await
        .unwrap();
    // Next day, must not count
    repo.create(new_appt(3, 7, "2025-06-03T09:00:00Z", "2025-06-03T09:30:00Z"))
        .await
        .unwrap();

    // Terminal statuses still count toward the cap
    let mut cancelled = repo
        .create(new_appt(4, 7, "2025-06-02T11:00:00Z", "2025-06-02T11:30:00Z"))
        .await
        .unwrap();
    cancelled.status = AppointmentStatus::Cancelled;
    repo.save(&cancelled).await.unwrap();

    let count = detector
        .count_daily_appointments(7, ts("2025-06-02T00:00:00Z").date_naive())
        .await
        .unwrap();
    assert_eq!(count, 3);
}
