// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub appointment_id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub department: String,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub reschedule_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "SCHEDULED"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
            AppointmentStatus::NoShow => write!(f, "NO_SHOW"),
        }
    }
}

/// Refund tier classified at cancellation time from hours-until-slot.
/// Classification only; charging is the billing service's job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefundPolicy {
    FullRefund,
    HalfFee,
    NoShowFee,
}

impl RefundPolicy {
    pub fn for_hours_until_slot(hours: f64) -> Self {
        if hours > 2.0 {
            RefundPolicy::FullRefund
        } else if hours > 0.0 {
            RefundPolicy::HalfFee
        } else {
            RefundPolicy::NoShowFee
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub department: String,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Invalid appointment slot: {0}")]
    InvalidSlot(String),

    #[error("Doctor does not belong to department {0}")]
    DepartmentMismatch(String),

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Doctor has a conflicting appointment")]
    DoctorConflict,

    #[error("Patient has a conflicting appointment")]
    PatientConflict,

    #[error("Doctor has reached maximum daily appointments")]
    DailyCapReached,

    #[error("Maximum {0} reschedules allowed")]
    MaxReschedulesReached(i32),

    #[error("Cannot reschedule within {0} hour(s) of appointment")]
    RescheduleCutoff(i64),

    #[error("Collaborator service unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

// ==============================================================================
// BUSINESS RULES
// ==============================================================================

#[derive(Debug, Clone)]
pub struct BookingRules {
    pub min_lead_time_hours: i64,
    pub clinic_open_hour: u32,
    pub clinic_close_hour: u32,
    pub slot_duration_minutes: i64,
    pub max_reschedules: i32,
    pub reschedule_cutoff_hours: i64,
    pub max_daily_appointments: usize,
    pub consultation_fee: i64,
    pub no_show_fee: i64,
    /// When true, only SCHEDULED appointments may be marked NO_SHOW.
    /// The permissive default re-marks any status, matching the original
    /// service this one replaced.
    pub strict_no_show: bool,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            min_lead_time_hours: 2,
            clinic_open_hour: 9,
            clinic_close_hour: 18,
            slot_duration_minutes: 30,
            max_reschedules: 2,
            reschedule_cutoff_hours: 1,
            max_daily_appointments: 8,
            consultation_fee: 500,
            no_show_fee: 250,
            strict_no_show: false,
        }
    }
}
