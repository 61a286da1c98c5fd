use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::models::{meta_key, RoomMeta, FIELD_CONNECTED, FIELD_CREATED_AT, FIELD_VERSION};
use crate::admission::Consistency;
use crate::shared::AppError;
use crate::store::KeyValueStore;

/// Typed access to room metadata stored in a KeyValueStore
#[derive(Clone)]
pub struct RoomRepository {
    store: Arc<dyn KeyValueStore + Send + Sync>,
}

impl RoomRepository {
    pub fn new(store: Arc<dyn KeyValueStore + Send + Sync>) -> Self {
        Self { store }
    }

    /// Writes a room's metadata hash. Rooms are normally provisioned by
    /// another service; this is used for seeding.
    #[instrument(skip(self, room), fields(room_id = %room.id))]
    pub async fn create_room(&self, room: &RoomMeta) -> Result<(), AppError> {
        let connected = encode_connected(&room.connected)?;
        let created_at = room.created_at.to_string();

        let mut fields = vec![
            (FIELD_CONNECTED, connected.as_str()),
            (FIELD_CREATED_AT, created_at.as_str()),
        ];
        if let Some(version) = room.version.as_deref() {
            fields.push((FIELD_VERSION, version));
        }

        self.store.hash_set(&meta_key(&room.id), &fields).await?;

        info!(connected_count = room.connected.len(), "Room metadata written");
        Ok(())
    }

    /// Loads room metadata, `None` if the room is missing or malformed
    #[instrument(skip(self))]
    pub async fn get_room(&self, room_id: &str) -> Result<Option<RoomMeta>, AppError> {
        let fields = match self.store.hash_get_all(&meta_key(room_id)).await? {
            Some(fields) => fields,
            None => {
                debug!("Room not found");
                return Ok(None);
            }
        };

        let room = RoomMeta::from_fields(room_id, &fields);
        match &room {
            Some(r) => debug!(
                connected_count = r.connected_count(),
                version = ?r.version,
                "Room metadata loaded"
            ),
            None => warn!("Room metadata is malformed"),
        }

        Ok(room)
    }

    /// Replaces the connected list observed in `snapshot`, returning the
    /// room as written.
    ///
    /// With `Consistency::Optimistic` the write only lands if the room's
    /// version is still the snapshot's, and returns `None` otherwise.
    /// `Consistency::LastWriterWins` always writes.
    #[instrument(skip(self, snapshot, connected), fields(room_id = %snapshot.id))]
    pub async fn replace_connected(
        &self,
        snapshot: &RoomMeta,
        connected: &[String],
        consistency: Consistency,
    ) -> Result<Option<RoomMeta>, AppError> {
        let key = meta_key(&snapshot.id);
        let encoded = encode_connected(connected)?;

        let written_version = match consistency {
            Consistency::Optimistic => {
                let next_version = snapshot.next_version();
                let applied = self
                    .store
                    .hash_set_if(
                        &key,
                        FIELD_VERSION,
                        snapshot.version.as_deref(),
                        &[
                            (FIELD_CONNECTED, encoded.as_str()),
                            (FIELD_VERSION, next_version.as_str()),
                        ],
                    )
                    .await?;
                if !applied {
                    debug!("Connected list changed concurrently, write rejected");
                    return Ok(None);
                }
                Some(next_version)
            }
            Consistency::LastWriterWins => {
                self.store
                    .hash_set(&key, &[(FIELD_CONNECTED, encoded.as_str())])
                    .await?;
                snapshot.version.clone()
            }
        };

        debug!(
            previous_count = snapshot.connected_count(),
            connected_count = connected.len(),
            "Connected list replaced"
        );

        Ok(Some(RoomMeta {
            id: snapshot.id.clone(),
            connected: connected.to_vec(),
            created_at: snapshot.created_at,
            version: written_version,
        }))
    }
}

fn encode_connected(connected: &[String]) -> Result<String, AppError> {
    serde_json::to_string(connected).map_err(|e| {
        warn!(error = %e, "Failed to encode connected list");
        AppError::Internal
    })
}
