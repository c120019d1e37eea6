// libs/appointment-cell/src/services/validation.rs
use chrono::{DateTime, Duration, Timelike, Utc};

use crate::models::{AppointmentError, BookingRules};

/// Validate slot timing against the booking rules. Pure; callers inject `now`
/// so the checks are testable with a fixed clock.
pub fn validate_slot(
    slot_start: DateTime<Utc>,
    slot_end: DateTime<Utc>,
    now: DateTime<Utc>,
    rules: &BookingRules,
) -> Result<(), AppointmentError> {
    // Lead time
    if slot_start < now + Duration::hours(rules.min_lead_time_hours) {
        return Err(AppointmentError::InvalidSlot(format!(
            "Appointment must be at least {} hours from now",
            rules.min_lead_time_hours
        )));
    }

    // Clinic hours, judged on the slot's wall-clock hour
    let slot_hour = slot_start.hour();
    if slot_hour < rules.clinic_open_hour || slot_hour >= rules.clinic_close_hour {
        return Err(AppointmentError::InvalidSlot(format!(
            "Appointments must start between {}:00 and {}:00",
            rules.clinic_open_hour, rules.clinic_close_hour
        )));
    }

    // Exact slot duration
    if slot_end - slot_start != Duration::minutes(rules.slot_duration_minutes) {
        return Err(AppointmentError::InvalidSlot(format!(
            "Appointment must be exactly {} minutes",
            rules.slot_duration_minutes
        )));
    }

    Ok(())
}
