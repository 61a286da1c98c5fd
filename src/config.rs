use std::time::Duration;
use tracing::warn;

use crate::admission::{AdmissionConfig, Consistency};

/// Deployment environment, controls cookie hardening and diagnostic logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            _ => Environment::Production,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Unset means the in-memory store is used
    pub redis_url: Option<String>,
    pub environment: Environment,
    pub admission: AdmissionConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = AdmissionConfig::default();

        let capacity = lookup("ROOM_CAPACITY")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.capacity);

        let stale_threshold = lookup("STALE_THRESHOLD_SECS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.stale_threshold);

        let consistency = match lookup("ADMISSION_CONSISTENCY").as_deref() {
            None => defaults.consistency,
            Some(value) => value.parse().unwrap_or_else(|_| {
                warn!(value = %value, "Unknown ADMISSION_CONSISTENCY, using optimistic");
                Consistency::Optimistic
            }),
        };

        let max_conflict_retries = lookup("ADMISSION_MAX_RETRIES")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_conflict_retries);

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            redis_url: lookup("REDIS_URL").filter(|url| !url.is_empty()),
            environment: lookup("APP_ENV")
                .map(|v| Environment::parse(&v))
                .unwrap_or(Environment::Development),
            admission: AdmissionConfig {
                capacity,
                stale_threshold,
                consistency,
                max_conflict_retries,
            },
        }
    }
}
