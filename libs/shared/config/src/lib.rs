use std::env;
use tracing::warn;

/// Base URLs of the collaborator services plus the listen port, each
/// overridable via environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub patient_service_url: String,
    pub doctor_service_url: String,
    pub billing_service_url: String,
    pub notification_service_url: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            patient_service_url: env_or("PATIENT_SERVICE_URL", "http://localhost:8001"),
            doctor_service_url: env_or("DOCTOR_SERVICE_URL", "http://localhost:8002"),
            billing_service_url: env_or("BILLING_SERVICE_URL", "http://localhost:8003"),
            notification_service_url: env_or("NOTIFICATION_SERVICE_URL", "http://localhost:8007"),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8004),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using default {}", key, default);
        default.to_string()
    })
}
