// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest, BookingRules,
    RefundPolicy,
};
use crate::repository::{AppointmentFilter, AppointmentRepository, NewAppointment};
use crate::services::collaborators::CollaboratorGateway;
use crate::services::conflict::ConflictDetectionService;
use crate::services::validation::validate_slot;

/// The lifecycle engine: owns the appointment state machine and orchestrates
/// validation, conflict detection, persistence and collaborator calls for
/// every transition. Billing and notification failures never roll back a
/// committed transition.
pub struct AppointmentLifecycleService {
    repository: Arc<dyn AppointmentRepository>,
    conflicts: ConflictDetectionService,
    gateway: CollaboratorGateway,
    rules: BookingRules,
}

impl AppointmentLifecycleService {
    pub fn new(repository: Arc<dyn AppointmentRepository>, gateway: CollaboratorGateway) -> Self {
        Self::with_rules(repository, gateway, BookingRules::default())
    }

    pub fn with_rules(
        repository: Arc<dyn AppointmentRepository>,
        gateway: CollaboratorGateway,
        rules: BookingRules,
    ) -> Self {
        let conflicts = ConflictDetectionService::new(Arc::clone(&repository));
        Self {
            repository,
            conflicts,
            gateway,
            rules,
        }
    }

    /// Book a new appointment. When an idempotency token accompanies the
    /// request, an existing SCHEDULED row for the same patient/doctor/slot
    /// short-circuits instead of creating a duplicate.
    pub async fn book(
        &self,
        request: BookAppointmentRequest,
        correlation_id: &str,
        idempotency_key: Option<&str>,
    ) -> Result<Appointment, AppointmentError> {
        if let Some(key) = idempotency_key {
            if let Some(existing) = self
                .repository
                .find_existing_scheduled(request.patient_id, request.doctor_id, request.slot_start)
                .await?
            {
                info!(
                    appointment_id = existing.appointment_id,
                    idempotency_key = %key,
                    correlation_id = %correlation_id,
                    "appointment_already_exists"
                );
                return Ok(existing);
            }
        }

        if !self.gateway.verify_patient(request.patient_id).await {
            return Err(AppointmentError::PatientNotFound);
        }

        self.gateway
            .verify_doctor(request.doctor_id, Some(&request.department))
            .await
            .map_err(|e| match e {
                AppointmentError::CollaboratorUnavailable(msg) => {
                    warn!("Doctor verification failed: {}", msg);
                    AppointmentError::DoctorNotFound
                }
                other => other,
            })?;

        validate_slot(request.slot_start, request.slot_end, Utc::now(), &self.rules)?;

        let doctor_blocking = [AppointmentStatus::Scheduled, AppointmentStatus::Completed];
        if self
            .conflicts
            .has_doctor_conflict(
                request.doctor_id,
                request.slot_start,
                request.slot_end,
                None,
                &doctor_blocking,
            )
            .await?
        {
            return Err(AppointmentError::DoctorConflict);
        }

        if self
            .conflicts
            .has_patient_conflict(
                request.patient_id,
                request.slot_start,
                request.slot_end,
                None,
                &[AppointmentStatus::Scheduled],
            )
            .await?
        {
            return Err(AppointmentError::PatientConflict);
        }

        let daily = self
            .conflicts
            .count_daily_appointments(request.doctor_id, request.slot_start.date_naive())
            .await?;
        if daily >= self.rules.max_daily_appointments {
            return Err(AppointmentError::DailyCapReached);
        }

        let appointment = self
            .repository
            .create(NewAppointment {
                patient_id: request.patient_id,
                doctor_id: request.doctor_id,
                department: request.department,
                slot_start: request.slot_start,
                slot_end: request.slot_end,
            })
            .await?;

        info!(
            appointment_id = appointment.appointment_id,
            patient_id = appointment.patient_id,
            doctor_id = appointment.doctor_id,
            correlation_id = %correlation_id,
            "appointment_created"
        );

        self.dispatch_notification(
            "APPOINTMENT_CONFIRMED",
            json!({
                "appointment_id": appointment.appointment_id,
                "patient_id": appointment.patient_id,
                "doctor_id": appointment.doctor_id,
                "slot_start": appointment.slot_start.to_rfc3339(),
            }),
        )
        .await;

        Ok(appointment)
    }

    /// Move a SCHEDULED appointment to a new slot, bounded by the reschedule
    /// cap and the cutoff window before the current slot.
    pub async fn reschedule(
        &self,
        appointment_id: i64,
        new_slot_start: DateTime<Utc>,
        new_slot_end: DateTime<Utc>,
        correlation_id: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.repository.find_by_id(appointment_id).await?;

        if appointment.status != AppointmentStatus::Scheduled {
            return Err(AppointmentError::InvalidStatusTransition(appointment.status));
        }
        if appointment.reschedule_count >= self.rules.max_reschedules {
            return Err(AppointmentError::MaxReschedulesReached(
                self.rules.max_reschedules,
            ));
        }

        let now = Utc::now();
        let hours_until_slot =
            (appointment.slot_start - now).num_seconds() as f64 / 3600.0;
        if hours_until_slot <= self.rules.reschedule_cutoff_hours as f64 {
            return Err(AppointmentError::RescheduleCutoff(
                self.rules.reschedule_cutoff_hours,
            ));
        }

        validate_slot(new_slot_start, new_slot_end, now, &self.rules)?;

        if self
            .conflicts
            .has_doctor_conflict(
                appointment.doctor_id,
                new_slot_start,
                new_slot_end,
                Some(appointment_id),
                &[AppointmentStatus::Scheduled],
            )
            .await?
        {
            return Err(AppointmentError::DoctorConflict);
        }

        appointment.slot_start = new_slot_start;
        appointment.slot_end = new_slot_end;
        appointment.reschedule_count += 1;
        self.repository.save(&appointment).await?;

        info!(
            appointment_id = appointment_id,
            reschedule_count = appointment.reschedule_count,
            correlation_id = %correlation_id,
            "appointment_rescheduled"
        );

        self.dispatch_notification(
            "APPOINTMENT_RESCHEDULED",
            json!({
                "appointment_id": appointment_id,
                "new_slot_start": new_slot_start.to_rfc3339(),
            }),
        )
        .await;

        Ok(appointment)
    }

    /// Cancel a SCHEDULED appointment and classify the refund tier from the
    /// hours remaining until the slot. The tier is reported to the billing
    /// collaborator's side of the world via the notification payload; no
    /// money moves here.
    pub async fn cancel(
        &self,
        appointment_id: i64,
        correlation_id: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.repository.find_by_id(appointment_id).await?;
        self.validate_status_transition(appointment.status, AppointmentStatus::Cancelled)?;

        let hours_until_slot =
            (appointment.slot_start - Utc::now()).num_seconds() as f64 / 3600.0;
        let refund_policy = RefundPolicy::for_hours_until_slot(hours_until_slot);

        appointment.status = AppointmentStatus::Cancelled;
        self.repository.save(&appointment).await?;

        info!(
            appointment_id = appointment_id,
            hours_until_slot = hours_until_slot,
            refund_policy = ?refund_policy,
            correlation_id = %correlation_id,
            "appointment_cancelled"
        );

        self.dispatch_notification(
            "APPOINTMENT_CANCELLED",
            json!({
                "appointment_id": appointment_id,
                "refund_policy": refund_policy,
            }),
        )
        .await;

        Ok(appointment)
    }

    /// Complete a SCHEDULED appointment and request the consultation-fee
    /// bill. A billing outage is logged and does not fail the completion.
    pub async fn complete(
        &self,
        appointment_id: i64,
        correlation_id: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.repository.find_by_id(appointment_id).await?;
        self.validate_status_transition(appointment.status, AppointmentStatus::Completed)?;

        appointment.status = AppointmentStatus::Completed;
        self.repository.save(&appointment).await?;

        info!(
            appointment_id = appointment_id,
            correlation_id = %correlation_id,
            "appointment_completed"
        );

        self.dispatch_billing(&appointment, self.rules.consultation_fee).await;

        self.dispatch_notification(
            "APPOINTMENT_COMPLETED",
            json!({
                "appointment_id": appointment_id,
                "bill_required": true,
            }),
        )
        .await;

        Ok(appointment)
    }

    /// Mark an appointment as NO_SHOW and request the no-show fee. With the
    /// default permissive rules any status may be re-marked; strict mode
    /// limits the transition to SCHEDULED rows.
    pub async fn mark_no_show(
        &self,
        appointment_id: i64,
        correlation_id: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.repository.find_by_id(appointment_id).await?;

        if self.rules.strict_no_show {
            self.validate_status_transition(appointment.status, AppointmentStatus::NoShow)?;
        }

        appointment.status = AppointmentStatus::NoShow;
        self.repository.save(&appointment).await?;

        info!(
            appointment_id = appointment_id,
            correlation_id = %correlation_id,
            "appointment_noshow"
        );

        self.dispatch_billing(&appointment, self.rules.no_show_fee).await;

        self.dispatch_notification(
            "NO_SHOW",
            json!({
                "appointment_id": appointment_id,
                "rebook_link": format!("/appointments/book?doctor_id={}", appointment.doctor_id),
            }),
        )
        .await;

        Ok(appointment)
    }

    pub async fn get(&self, appointment_id: i64) -> Result<Appointment, AppointmentError> {
        self.repository.find_by_id(appointment_id).await
    }

    pub async fn list(
        &self,
        filter: &AppointmentFilter,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<Appointment>, usize), AppointmentError> {
        let (items, total) = self.repository.find_by_filter(filter, skip, limit).await?;
        info!(total = total, returned = items.len(), "appointments_retrieved");
        Ok((items, total))
    }

    /// Validate that a status transition is allowed by the state machine.
    pub fn validate_status_transition(
        &self,
        current: AppointmentStatus,
        new: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition {} -> {}", current, new);
        if !valid_transitions(current).contains(&new) {
            warn!("Invalid status transition attempted: {} -> {}", current, new);
            return Err(AppointmentError::InvalidStatusTransition(current));
        }
        Ok(())
    }

    async fn dispatch_billing(&self, appointment: &Appointment, amount: i64) {
        match self
            .gateway
            .create_bill(appointment.patient_id, appointment.appointment_id, amount)
            .await
        {
            Ok(bill_id) => info!(
                appointment_id = appointment.appointment_id,
                bill_id = ?bill_id,
                "bill_created"
            ),
            Err(e) => warn!(
                appointment_id = appointment.appointment_id,
                "billing_service_unavailable: {}", e
            ),
        }
    }

    async fn dispatch_notification(&self, event_type: &str, data: Value) {
        if let Err(e) = self.gateway.notify(event_type, data).await {
            warn!(event_type = %event_type, "notification_service_unavailable: {}", e);
        }
    }
}

/// All valid next statuses for a given current status. SCHEDULED is the only
/// non-terminal state; no reverse transitions exist.
pub fn valid_transitions(current: AppointmentStatus) -> &'static [AppointmentStatus] {
    match current {
        AppointmentStatus::Scheduled => &[
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
        ],
        AppointmentStatus::Completed
        | AppointmentStatus::Cancelled
        | AppointmentStatus::NoShow => &[],
    }
}
