// libs/appointment-cell/src/services/conflict.rs
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};
use crate::repository::AppointmentRepository;

pub struct ConflictDetectionService {
    repository: Arc<dyn AppointmentRepository>,
}

impl ConflictDetectionService {
    pub fn new(repository: Arc<dyn AppointmentRepository>) -> Self {
        Self { repository }
    }

    /// True if the doctor already holds an appointment in one of `statuses`
    /// overlapping `[start, end)`, other than `exclude_appointment_id`.
    pub async fn has_doctor_conflict(
        &self,
        doctor_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_appointment_id: Option<i64>,
        statuses: &[AppointmentStatus],
    ) -> Result<bool, AppointmentError> {
        debug!("Checking conflicts for doctor {} from {} to {}", doctor_id, start, end);

        let existing = self.repository.find_for_doctor(doctor_id).await?;
        let conflict = existing.iter().any(|a| {
            Some(a.appointment_id) != exclude_appointment_id
                && statuses.contains(&a.status)
                && intervals_overlap(a.slot_start, a.slot_end, start, end)
        });

        if conflict {
            warn!("Conflict detected for doctor {} at {}", doctor_id, start);
        }
        Ok(conflict)
    }

    /// Same overlap check keyed by patient.
    pub async fn has_patient_conflict(
        &self,
        patient_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_appointment_id: Option<i64>,
        statuses: &[AppointmentStatus],
    ) -> Result<bool, AppointmentError> {
        let existing = self.repository.find_for_patient(patient_id).await?;
        Ok(existing.iter().any(|a| {
            Some(a.appointment_id) != exclude_appointment_id
                && statuses.contains(&a.status)
                && intervals_overlap(a.slot_start, a.slot_end, start, end)
        }))
    }

    /// Count of the doctor's appointments, any status, whose `slot_start`
    /// falls on the given calendar day.
    pub async fn count_daily_appointments(
        &self,
        doctor_id: i64,
        date: NaiveDate,
    ) -> Result<usize, AppointmentError> {
        let existing = self.repository.find_for_doctor(doctor_id).await?;
        Ok(existing
            .iter()
            .filter(|a| a.slot_start.date_naive() == date)
            .count())
    }
}

/// Half-open interval overlap: `[a, b)` and `[c, d)` overlap iff
/// `a < d && c < b`. Touching endpoints do not conflict.
pub fn intervals_overlap(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && start2 < end1
}
