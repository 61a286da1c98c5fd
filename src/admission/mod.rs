//! Admission control for two-participant rooms.
//!
//! A participant holds a slot while their token is listed in the room's
//! `connected` list *and* an unexpired activity record exists for it.
//! Abandoned slots are reclaimed lazily, on the next admission attempt.

use std::time::Duration;

// Public API - what other modules can use
pub use controller::{AdmissionController, Decision};
pub use heartbeat::HeartbeatRecorder;
pub use staleness::StalenessEvaluator;
pub use token::{RandomTokenIssuer, TokenIssuer};

// Internal modules
mod controller;
mod heartbeat;
mod staleness;
mod token;

/// Maximum simultaneous live participants per room
pub const CAPACITY: usize = 2;

/// Liveness window of an activity record, also its store TTL
pub const STALE_THRESHOLD: Duration = Duration::from_secs(120);

/// How writes to a room's `connected` list are guarded
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Consistency {
    /// Write only if the room version is unchanged, otherwise re-evaluate
    Optimistic,
    /// Unguarded writes; concurrent admissions may overshoot or lose updates
    LastWriterWins,
}

/// Tunables for the admission controller
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    pub capacity: usize,
    pub stale_threshold: Duration,
    pub consistency: Consistency,
    /// Re-evaluations allowed after a rejected guarded write
    pub max_conflict_retries: u32,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            capacity: CAPACITY,
            stale_threshold: STALE_THRESHOLD,
            consistency: Consistency::Optimistic,
            max_conflict_retries: 8,
        }
    }
}

/// Short, log-safe prefix of a token
pub(crate) fn token_hint(token: &str) -> &str {
    token.get(..4).unwrap_or(token)
}
