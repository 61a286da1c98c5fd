use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::token_hint;
use crate::room::activity_key;
use crate::shared::AppError;
use crate::store::KeyValueStore;

/// Decides which connected tokens still hold a live activity record
pub struct StalenessEvaluator {
    store: Arc<dyn KeyValueStore + Send + Sync>,
    stale_threshold: Duration,
}

impl StalenessEvaluator {
    pub fn new(store: Arc<dyn KeyValueStore + Send + Sync>, stale_threshold: Duration) -> Self {
        Self {
            store,
            stale_threshold,
        }
    }

    /// Filters `connected` down to its live tokens, preserving order.
    ///
    /// Records are fetched concurrently. An empty list never touches the store.
    #[instrument(skip(self, connected), fields(token_count = connected.len()))]
    pub async fn live_tokens(
        &self,
        room_id: &str,
        connected: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, AppError> {
        if connected.is_empty() {
            return Ok(Vec::new());
        }

        let checks = connected
            .iter()
            .map(|token| self.is_live(room_id, token, now));
        let liveness = try_join_all(checks).await?;

        let live: Vec<String> = connected
            .iter()
            .zip(liveness)
            .filter_map(|(token, live)| live.then(|| token.clone()))
            .collect();

        debug!(
            live_count = live.len(),
            stale_count = connected.len() - live.len(),
            "Staleness evaluated"
        );
        Ok(live)
    }

    /// A token is live iff its activity record exists and
    /// `now - lastSeen <= stale_threshold`
    pub async fn is_live(
        &self,
        room_id: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let record = self.store.get(&activity_key(room_id, token)).await?;

        let last_seen = match record.as_deref().map(str::parse::<i64>) {
            None => {
                debug!(token = %token_hint(token), "No activity record, token is stale");
                return Ok(false);
            }
            Some(Err(e)) => {
                warn!(token = %token_hint(token), error = %e, "Unreadable activity record, treating as stale");
                return Ok(false);
            }
            Some(Ok(last_seen)) => last_seen,
        };

        let idle_ms = now.timestamp_millis() - last_seen;
        let live = idle_ms <= self.stale_threshold.as_millis() as i64;
        if !live {
            debug!(token = %token_hint(token), idle_ms, "Activity record too old, token is stale");
        }
        Ok(live)
    }
}
