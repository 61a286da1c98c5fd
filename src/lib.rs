// Library crate for the room admission gateway
// This file exposes the public API for integration tests

pub mod admission;
pub mod config;
pub mod gateway;
pub mod room;
pub mod shared;
pub mod store;

// Re-export commonly used types for easier access in tests
pub use admission::{AdmissionConfig, AdmissionController, Consistency, Decision};
pub use config::{Environment, ServerConfig};
pub use room::{RoomMeta, RoomRepository};
pub use shared::{AppError, AppState};
pub use store::{InMemoryStore, KeyValueStore, RedisStore};
