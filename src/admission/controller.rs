use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::{
    token_hint, AdmissionConfig, HeartbeatRecorder, RandomTokenIssuer, StalenessEvaluator,
    TokenIssuer,
};
use crate::room::RoomRepository;
use crate::shared::AppError;
use crate::store::KeyValueStore;

/// Pause added per consecutive conflict before re-evaluating
const CONFLICT_BACKOFF_STEP: Duration = Duration::from_millis(5);
/// Upper bound of the linear part of the backoff
const CONFLICT_BACKOFF_CAP: Duration = Duration::from_millis(100);

/// Linear backoff plus up to one step of jitter, so writers that collided
/// do not retry in lockstep
fn conflict_backoff(conflicts: u32) -> Duration {
    let base = CONFLICT_BACKOFF_STEP
        .saturating_mul(conflicts)
        .min(CONFLICT_BACKOFF_CAP);
    let jitter_ms = rand::rng().random_range(0..=CONFLICT_BACKOFF_STEP.as_millis() as u64);
    base + Duration::from_millis(jitter_ms)
}

/// Outcome of evaluating a request against a room
#[derive(Debug, Clone, PartialEq, Eq, strum_macros::Display)]
pub enum Decision {
    /// Room metadata is missing or malformed
    NotFound,
    /// The presented token already holds a slot
    AlreadyAdmitted,
    /// Every slot is held by a live participant
    RoomFull,
    /// A slot was granted to a freshly minted token
    Admitted(String),
}

/// Result of a single pass over the room state
enum Attempt {
    Decided(Decision),
    /// A guarded write lost against a concurrent writer
    Conflict,
}

/// Service deciding who may occupy a room's slots
pub struct AdmissionController {
    rooms: RoomRepository,
    evaluator: StalenessEvaluator,
    recorder: HeartbeatRecorder,
    issuer: Arc<dyn TokenIssuer>,
    config: AdmissionConfig,
}

impl AdmissionController {
    pub fn new(store: Arc<dyn KeyValueStore + Send + Sync>, config: AdmissionConfig) -> Self {
        Self::with_token_issuer(store, config, Arc::new(RandomTokenIssuer::new()))
    }

    pub fn with_token_issuer(
        store: Arc<dyn KeyValueStore + Send + Sync>,
        config: AdmissionConfig,
        issuer: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            rooms: RoomRepository::new(store.clone()),
            evaluator: StalenessEvaluator::new(store.clone(), config.stale_threshold),
            recorder: HeartbeatRecorder::new(store, config.stale_threshold),
            issuer,
            config,
        }
    }

    /// Evaluates a request for a slot in `room_id`.
    ///
    /// A presented token that is listed in the room is trusted without a
    /// staleness check. Otherwise stale claims are pruned (and the pruned
    /// list persisted, even if the room turns out full) before capacity is
    /// checked and a new token is admitted. The new token's activity record
    /// is written before its claim on the room.
    ///
    /// Under `Consistency::Optimistic` a write that loses against a
    /// concurrent writer restarts the evaluation from the metadata load.
    #[instrument(skip(self, existing_token), fields(has_token = existing_token.is_some()))]
    pub async fn evaluate_admission(
        &self,
        room_id: &str,
        existing_token: Option<&str>,
    ) -> Result<Decision, AppError> {
        let mut conflicts: u32 = 0;

        loop {
            match self.attempt(room_id, existing_token).await? {
                Attempt::Decided(decision) => {
                    info!(
                        room_id = %room_id,
                        decision = %decision,
                        conflicts,
                        "Admission decided"
                    );
                    return Ok(decision);
                }
                Attempt::Conflict => {
                    conflicts += 1;
                    if conflicts > self.config.max_conflict_retries {
                        warn!(room_id = %room_id, conflicts, "Giving up after repeated write conflicts");
                        return Err(AppError::Contention(format!(
                            "room {room_id} changed {conflicts} times during admission"
                        )));
                    }
                    let backoff = conflict_backoff(conflicts);
                    debug!(
                        room_id = %room_id,
                        conflicts,
                        backoff_ms = backoff.as_millis() as u64,
                        "Room changed concurrently, re-evaluating"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    async fn attempt(
        &self,
        room_id: &str,
        existing_token: Option<&str>,
    ) -> Result<Attempt, AppError> {
        let Some(room) = self.rooms.get_room(room_id).await? else {
            return Ok(Attempt::Decided(Decision::NotFound));
        };

        if let Some(token) = existing_token {
            if room.has_token(token) {
                debug!(token = %token_hint(token), "Presented token already holds a slot");
                return Ok(Attempt::Decided(Decision::AlreadyAdmitted));
            }
        }

        let now = Utc::now();
        let mut connected = self
            .evaluator
            .live_tokens(room_id, &room.connected, now)
            .await?;

        let mut snapshot = room;
        if connected.len() != snapshot.connected_count() {
            info!(
                room_id = %room_id,
                reclaimed = snapshot.connected_count() - connected.len(),
                "Reclaiming stale slots"
            );
            snapshot = match self
                .rooms
                .replace_connected(&snapshot, &connected, self.config.consistency)
                .await?
            {
                Some(written) => written,
                None => return Ok(Attempt::Conflict),
            };
        }

        if connected.len() >= self.config.capacity {
            debug!(live_count = connected.len(), "Room is at capacity");
            return Ok(Attempt::Decided(Decision::RoomFull));
        }

        let token = self.issuer.mint()?;

        // The lease goes in before the claim, otherwise a concurrent pass
        // could see the new token without a record and prune it. A lease
        // whose claim loses simply expires.
        self.recorder.record_activity(room_id, &token, now).await?;

        connected.push(token.clone());
        if self
            .rooms
            .replace_connected(&snapshot, &connected, self.config.consistency)
            .await?
            .is_none()
        {
            return Ok(Attempt::Conflict);
        }

        Ok(Attempt::Decided(Decision::Admitted(token)))
    }

    /// Refreshes the activity record of a participant holding a slot
    #[instrument(skip(self, token), fields(token_hint = %token_hint(token)))]
    pub async fn record_heartbeat(&self, room_id: &str, token: &str) -> Result<(), AppError> {
        let room = self
            .rooms
            .get_room(room_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Room {room_id} not found")))?;

        if !room.has_token(token) {
            warn!(room_id = %room_id, "Heartbeat from a token without a slot");
            return Err(AppError::Unauthorized(
                "Token does not hold a slot in this room".to_string(),
            ));
        }

        self.recorder
            .record_activity(room_id, token, Utc::now())
            .await
    }
}
