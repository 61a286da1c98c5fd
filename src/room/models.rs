use std::collections::HashMap;

use crate::admission::token_hint;

/// Hash field holding the JSON array of connected tokens
pub const FIELD_CONNECTED: &str = "connected";
/// Hash field holding the creation time in epoch milliseconds
pub const FIELD_CREATED_AT: &str = "createdAt";
/// Hash field bumped on every guarded write of `connected`
pub const FIELD_VERSION: &str = "version";

/// Store key for a room's metadata hash
pub fn meta_key(room_id: &str) -> String {
    format!("meta:{room_id}")
}

/// Store key for a participant's activity record
pub fn activity_key(room_id: &str, token: &str) -> String {
    format!("activity:{room_id}:{token}")
}

/// Store key as it may appear in logs. Activity keys embed the participant's
/// token, which is cut down to its hint.
pub fn log_safe_key(key: &str) -> String {
    match key
        .strip_prefix("activity:")
        .and_then(|rest| rest.rsplit_once(':'))
    {
        Some((room_id, token)) => format!("activity:{room_id}:{}..", token_hint(token)),
        None => key.to_string(),
    }
}

/// Room metadata as persisted under `meta:{roomId}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMeta {
    pub id: String,
    /// Tokens claiming a slot, in join order
    pub connected: Vec<String>,
    pub created_at: i64,
    /// `None` until the first guarded write
    pub version: Option<String>,
}

impl RoomMeta {
    /// Creates metadata for an empty room
    pub fn new(id: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            connected: Vec::new(),
            created_at,
            version: None,
        }
    }

    /// Parses a metadata hash. `None` if `connected` is missing or is not a
    /// JSON array of strings.
    pub fn from_fields(id: &str, fields: &HashMap<String, String>) -> Option<Self> {
        let connected: Vec<String> =
            serde_json::from_str(fields.get(FIELD_CONNECTED)?).ok()?;

        let created_at = fields
            .get(FIELD_CREATED_AT)
            .and_then(|value| value.parse().ok())
            .unwrap_or(0);

        Some(Self {
            id: id.to_string(),
            connected,
            created_at,
            version: fields.get(FIELD_VERSION).cloned(),
        })
    }

    /// Check if a token currently claims a slot
    pub fn has_token(&self, token: &str) -> bool {
        self.connected.iter().any(|t| t == token)
    }

    pub fn connected_count(&self) -> usize {
        self.connected.len()
    }

    /// Version a guarded writer should store after this snapshot
    pub fn next_version(&self) -> String {
        let current: u64 = self
            .version
            .as_deref()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        (current + 1).to_string()
    }
}
