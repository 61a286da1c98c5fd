// Public API - what other modules can use
pub use models::{activity_key, log_safe_key, meta_key, RoomMeta};
pub use repository::RoomRepository;

// Internal modules
pub mod models;
pub mod repository;
