use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use roomgate::{
    room::activity_key, AdmissionConfig, AdmissionController, Consistency, KeyValueStore,
    RoomMeta, RoomRepository,
};

use super::mocks::ScriptedStore;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub store: Arc<ScriptedStore>,
    pub controller: Arc<AdmissionController>,
    pub room_id: String,
}

impl TestSetup {
    /// Connected list as currently persisted
    pub async fn connected(&self) -> Vec<String> {
        RoomRepository::new(self.store.clone())
            .get_room(&self.room_id)
            .await
            .unwrap()
            .expect("room should exist")
            .connected
    }

    /// Activity timestamp (epoch millis) recorded for a token
    pub async fn last_seen(&self, token: &str) -> Option<i64> {
        self.store
            .inner()
            .get(&activity_key(&self.room_id, token))
            .await
            .unwrap()
            .map(|value| value.parse().unwrap())
    }

    pub fn activity_ttl(&self, token: &str) -> Option<Duration> {
        self.store.inner().ttl(&activity_key(&self.room_id, token))
    }

    /// A controller sharing this setup's store
    pub fn controller_with(&self, config: AdmissionConfig) -> AdmissionController {
        AdmissionController::new(self.store.clone(), config)
    }
}

pub struct TestSetupBuilder {
    room_id: String,
    connected: Option<Vec<String>>,
    activity: Vec<(String, i64)>,
    config: AdmissionConfig,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            room_id: "room-123".to_string(),
            connected: Some(Vec::new()),
            activity: Vec::new(),
            config: AdmissionConfig::default(),
        }
    }

    pub fn with_connected(mut self, tokens: &[&str]) -> Self {
        self.connected = Some(tokens.iter().map(|t| t.to_string()).collect());
        self
    }

    /// No metadata is written for the room
    pub fn without_room(mut self) -> Self {
        self.connected = None;
        self
    }

    /// Records activity for `token` that happened `seconds_ago`
    pub fn with_activity(mut self, token: &str, seconds_ago: i64) -> Self {
        self.activity.push((token.to_string(), seconds_ago));
        self
    }

    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.config.consistency = consistency;
        self
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.config.max_conflict_retries = retries;
        self
    }

    pub async fn build(self) -> TestSetup {
        let store = Arc::new(ScriptedStore::new());

        // Seed through the inner store so counters start at zero
        if let Some(connected) = self.connected {
            let mut room = RoomMeta::new(self.room_id.clone(), Utc::now().timestamp_millis());
            room.connected = connected;
            RoomRepository::new(store.inner())
                .create_room(&room)
                .await
                .unwrap();
        }

        for (token, seconds_ago) in &self.activity {
            let at = Utc::now() - chrono::Duration::seconds(*seconds_ago);
            store
                .inner()
                .set_with_expiry(
                    &activity_key(&self.room_id, token),
                    &at.timestamp_millis().to_string(),
                    self.config.stale_threshold,
                )
                .await
                .unwrap();
        }

        let controller = Arc::new(AdmissionController::new(store.clone(), self.config));

        TestSetup {
            store,
            controller,
            room_id: self.room_id,
        }
    }
}
