// libs/appointment-cell/src/services/collaborators.rs
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::AppointmentError;

/// Bounded timeout applied to every collaborator call. No retries anywhere;
/// a failed call is reported once and the caller decides what to do with it.
const COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(5);

/// Thin client over the four external services this core talks to: patient,
/// doctor, billing and notification. All methods return `Result` so the
/// lifecycle engine can choose between aborting (verification) and
/// log-and-discard (billing, notification).
pub struct CollaboratorGateway {
    client: Client,
    config: AppConfig,
}

impl CollaboratorGateway {
    pub fn new(config: AppConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// `GET /v1/patients/{id}/exists`. An unreachable patient service counts
    /// as "does not exist": verification failures reject the booking.
    pub async fn verify_patient(&self, patient_id: i64) -> bool {
        let url = format!(
            "{}/v1/patients/{}/exists",
            self.config.patient_service_url, patient_id
        );
        debug!("Verifying patient via {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(COLLABORATOR_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(resp) => match resp.json::<Value>().await {
                Ok(body) => body.get("exists").and_then(Value::as_bool).unwrap_or(false),
                Err(_) => false,
            },
            Err(e) => {
                warn!("Patient service unavailable: {}", e);
                false
            }
        }
    }

    /// Verify the doctor exists and, when a department is requested, that it
    /// matches the doctor's department.
    pub async fn verify_doctor(
        &self,
        doctor_id: i64,
        department: Option<&str>,
    ) -> Result<Value, AppointmentError> {
        let url = match department {
            Some(_) => format!(
                "{}/v1/doctors/{}/department",
                self.config.doctor_service_url, doctor_id
            ),
            None => format!("{}/v1/doctors/{}", self.config.doctor_service_url, doctor_id),
        };
        debug!("Verifying doctor via {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(COLLABORATOR_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppointmentError::CollaboratorUnavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppointmentError::DoctorNotFound);
        }
        if !response.status().is_success() {
            return Err(AppointmentError::CollaboratorUnavailable(format!(
                "doctor service returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppointmentError::CollaboratorUnavailable(e.to_string()))?;

        if let Some(expected) = department {
            let actual = body.get("department").and_then(Value::as_str);
            if actual != Some(expected) {
                return Err(AppointmentError::DepartmentMismatch(expected.to_string()));
            }
        }

        Ok(body)
    }

    /// `POST /v1/bills`. Returns the bill id when the billing service echoes
    /// one back. The engine logs failures and never rolls back the committed
    /// state transition.
    pub async fn create_bill(
        &self,
        patient_id: i64,
        appointment_id: i64,
        amount: i64,
    ) -> Result<Option<i64>, AppointmentError> {
        let url = format!("{}/v1/bills", self.config.billing_service_url);

        let response = self
            .client
            .post(&url)
            .timeout(COLLABORATOR_TIMEOUT)
            .json(&json!({
                "patient_id": patient_id,
                "appointment_id": appointment_id,
                "amount": amount,
            }))
            .send()
            .await
            .map_err(|e| AppointmentError::CollaboratorUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppointmentError::CollaboratorUnavailable(format!(
                "billing service returned {}",
                response.status()
            )));
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        Ok(body.get("bill_id").and_then(Value::as_i64))
    }

    /// `POST /v1/notifications`. Fire and forget; callers log the error and
    /// move on.
    pub async fn notify(&self, event_type: &str, data: Value) -> Result<(), AppointmentError> {
        let url = format!("{}/v1/notifications", self.config.notification_service_url);

        let response = self
            .client
            .post(&url)
            .timeout(COLLABORATOR_TIMEOUT)
            .json(&json!({
                "event_type": event_type,
                "data": data,
            }))
            .send()
            .await
            .map_err(|e| AppointmentError::CollaboratorUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppointmentError::CollaboratorUnavailable(format!(
                "notification service returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
