//! Key-value store abstraction that room state lives in.
//!
//! Records are either plain string values (optionally expiring) or
//! hash-shaped records of named string fields. Every operation is a single
//! atomic step against the store; multi-step sequences are not.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::shared::AppError;

pub use memory::InMemoryStore;
pub use redis_store::RedisStore;

mod lua_scripts;
mod memory;
mod redis_store;

/// Operations the admission core consumes from the backing store.
///
/// Implementations map transport or backend failures to
/// `AppError::StoreUnavailable`.
#[async_trait]
pub trait KeyValueStore {
    /// Returns every field of a hash record, `None` if the key is absent
    async fn hash_get_all(&self, key: &str) -> Result<Option<HashMap<String, String>>, AppError>;

    /// Sets the given fields on a hash record, leaving other fields untouched
    async fn hash_set(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), AppError>;

    /// Atomically sets `fields` only if the hash exists and `guard_field`
    /// currently equals `expected` (`None` requires the field to be absent).
    /// Returns whether the write was applied.
    async fn hash_set_if(
        &self,
        key: &str,
        guard_field: &str,
        expected: Option<&str>,
        fields: &[(&str, &str)],
    ) -> Result<bool, AppError>;

    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Writes a string value that the store deletes once `ttl` elapses
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration)
        -> Result<(), AppError>;
}
