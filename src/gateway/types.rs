use serde::{Deserialize, Serialize};

/// How a request was let into a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    /// A new slot was granted and a token cookie issued
    Admitted,
    /// The request's token already holds a slot
    AlreadyAdmitted,
    /// Preview bot or crawler, not counted as a participant
    Bot,
}

/// Response body for requests allowed through to a room
#[derive(Debug, Serialize, Deserialize)]
pub struct RoomAccessResponse {
    pub room_id: String,
    pub status: AccessStatus,
}
