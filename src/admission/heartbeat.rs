use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use super::token_hint;
use crate::room::activity_key;
use crate::shared::AppError;
use crate::store::KeyValueStore;

/// Service for recording participant activity timestamps
///
/// Each record is a lease: it expires `ttl` after the last write unless the
/// participant heartbeats again.
pub struct HeartbeatRecorder {
    store: Arc<dyn KeyValueStore + Send + Sync>,
    ttl: Duration,
}

impl HeartbeatRecorder {
    /// Creates a new recorder writing records that expire after `ttl`
    pub fn new(store: Arc<dyn KeyValueStore + Send + Sync>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Records activity for a token, overwriting any previous record
    #[instrument(skip(self, token), fields(token_hint = %token_hint(token)))]
    pub async fn record_activity(
        &self,
        room_id: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        debug!(room_id = %room_id, "Recording participant activity");
        self.store
            .set_with_expiry(
                &activity_key(room_id, token),
                &now.timestamp_millis().to_string(),
                self.ttl,
            )
            .await
    }
}
