// libs/appointment-cell/src/repository.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

/// Fields supplied by the caller at booking time; the repository assigns
/// `appointment_id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub department: String,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub status: Option<AppointmentStatus>,
}

/// Persistence contract for appointment records. Rows are never deleted;
/// cancellation and no-show are terminal statuses, not removals.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Insert a new SCHEDULED appointment. Implementations must reject,
    /// within one atomic unit of work, an insert whose `(doctor_id,
    /// slot_start)` collides with an existing SCHEDULED row, so that two
    /// concurrent bookings of the same slot cannot both commit.
    async fn create(&self, new: NewAppointment) -> Result<Appointment, AppointmentError>;

    async fn find_by_id(&self, appointment_id: i64) -> Result<Appointment, AppointmentError>;

    /// Filtered listing ordered by `slot_start` descending. Returns the page
    /// and the total match count before pagination.
    async fn find_by_filter(
        &self,
        filter: &AppointmentFilter,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<Appointment>, usize), AppointmentError>;

    /// Persist an in-place mutation of an existing row.
    async fn save(&self, appointment: &Appointment) -> Result<(), AppointmentError>;

    /// Natural-key lookup backing idempotent booking.
    async fn find_existing_scheduled(
        &self,
        patient_id: i64,
        doctor_id: i64,
        slot_start: DateTime<Utc>,
    ) -> Result<Option<Appointment>, AppointmentError>;

    async fn find_for_doctor(&self, doctor_id: i64) -> Result<Vec<Appointment>, AppointmentError>;

    async fn find_for_patient(&self, patient_id: i64) -> Result<Vec<Appointment>, AppointmentError>;
}

// ==============================================================================
// IN-MEMORY REFERENCE IMPLEMENTATION
// ==============================================================================

#[derive(Default)]
struct Store {
    next_id: i64,
    rows: Vec<Appointment>,
}

/// In-memory store used by the service binary and the test suites. A single
/// write lock spans the uniqueness check and the insert in `create`.
#[derive(Default)]
pub struct InMemoryRepository {
    inner: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryRepository {
    async fn create(&self, new: NewAppointment) -> Result<Appointment, AppointmentError> {
        let mut store = self.inner.write().await;

        let taken = store.rows.iter().any(|a| {
            a.doctor_id == new.doctor_id
                && a.slot_start == new.slot_start
                && a.status == AppointmentStatus::Scheduled
        });
        if taken {
            return Err(AppointmentError::DoctorConflict);
        }

        store.next_id += 1;
        let appointment = Appointment {
            appointment_id: store.next_id,
            patient_id: new.patient_id,
            doctor_id: new.doctor_id,
            department: new.department,
            slot_start: new.slot_start,
            slot_end: new.slot_end,
            status: AppointmentStatus::Scheduled,
            reschedule_count: 0,
            created_at: Utc::now(),
        };
        store.rows.push(appointment.clone());
        Ok(appointment)
    }

    async fn find_by_id(&self, appointment_id: i64) -> Result<Appointment, AppointmentError> {
        let store = self.inner.read().await;
        store
            .rows
            .iter()
            .find(|a| a.appointment_id == appointment_id)
            .cloned()
            .ok_or(AppointmentError::NotFound)
    }

    async fn find_by_filter(
        &self,
        filter: &AppointmentFilter,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<Appointment>, usize), AppointmentError> {
        let store = self.inner.read().await;

        let mut matches: Vec<Appointment> = store
            .rows
            .iter()
            .filter(|a| filter.patient_id.map_or(true, |id| a.patient_id == id))
            .filter(|a| filter.doctor_id.map_or(true, |id| a.doctor_id == id))
            .filter(|a| filter.status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();

        matches.sort_by(|a, b| b.slot_start.cmp(&a.slot_start));

        let total = matches.len();
        let page = matches.into_iter().skip(skip).take(limit).collect();
        Ok((page, total))
    }

    async fn save(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        let mut store = self.inner.write().await;
        match store
            .rows
            .iter_mut()
            .find(|a| a.appointment_id == appointment.appointment_id)
        {
            Some(row) => {
                *row = appointment.clone();
                Ok(())
            }
            None => Err(AppointmentError::NotFound),
        }
    }

    async fn find_existing_scheduled(
        &self,
        patient_id: i64,
        doctor_id: i64,
        slot_start: DateTime<Utc>,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let store = self.inner.read().await;
        Ok(store
            .rows
            .iter()
            .find(|a| {
                a.patient_id == patient_id
                    && a.doctor_id == doctor_id
                    && a.slot_start == slot_start
                    && a.status == AppointmentStatus::Scheduled
            })
            .cloned())
    }

    async fn find_for_doctor(&self, doctor_id: i64) -> Result<Vec<Appointment>, AppointmentError> {
        let store = self.inner.read().await;
        Ok(store
            .rows
            .iter()
            .filter(|a| a.doctor_id == doctor_id)
            .cloned()
            .collect())
    }

    async fn find_for_patient(&self, patient_id: i64) -> Result<Vec<Appointment>, AppointmentError> {
        let store = self.inner.read().await;
        Ok(store
            .rows
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect())
    }
}
