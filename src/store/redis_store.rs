//! Redis-backed KeyValueStore.
//!
//! # Connection Pattern
//!
//! The redis-rs `MultiplexedConnection` is cheap to clone and safe to use
//! concurrently, so each operation clones it instead of locking.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, Script};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use super::{lua_scripts, KeyValueStore};
use crate::room::log_safe_key;
use crate::shared::AppError;

/// Redis client shared by all request handlers
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
    hash_set_if_script: Script,
}

impl RedisStore {
    /// Opens a multiplexed connection to `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::StoreUnavailable` if the URL is invalid or the
    /// server cannot be reached.
    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        // Do not log redis_url, it may carry credentials
        let client = Client::open(redis_url).map_err(|e| {
            error!(error = %e, "Failed to open Redis client");
            AppError::StoreUnavailable(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to connect to Redis");
                AppError::StoreUnavailable(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self {
            connection,
            hash_set_if_script: Script::new(lua_scripts::HASH_SET_IF),
        })
    }

    fn unavailable(operation: &str, key: &str, e: redis::RedisError) -> AppError {
        warn!(error = %e, key = %log_safe_key(key), operation = %operation, "Redis operation failed");
        AppError::StoreUnavailable(format!("{operation} failed: {e}"))
    }
}

/// `ARGV[2]` and `ARGV[3]` of `HASH_SET_IF` for an expected guard value
fn guard_args(expected: Option<&str>) -> [&str; 2] {
    match expected {
        Some(value) => ["1", value],
        None => ["0", ""],
    }
}

/// HGETALL answers an empty map for a missing key
fn present(fields: HashMap<String, String>) -> Option<HashMap<String, String>> {
    (!fields.is_empty()).then_some(fields)
}

/// SETEX takes whole seconds and rejects zero
fn expiry_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl KeyValueStore for RedisStore {
    #[instrument(skip_all, fields(key = %log_safe_key(key)))]
    async fn hash_get_all(&self, key: &str) -> Result<Option<HashMap<String, String>>, AppError> {
        let mut conn = self.connection.clone();

        let fields: HashMap<String, String> = conn
            .hgetall(key)
            .await
            .map_err(|e| Self::unavailable("HGETALL", key, e))?;

        Ok(present(fields))
    }

    #[instrument(skip_all, fields(key = %log_safe_key(key)))]
    async fn hash_set(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), AppError> {
        let mut conn = self.connection.clone();

        let _: () = conn
            .hset_multiple(key, fields)
            .await
            .map_err(|e| Self::unavailable("HSET", key, e))?;

        debug!(field_count = fields.len(), "Hash fields set");
        Ok(())
    }

    #[instrument(skip_all, fields(key = %log_safe_key(key), guard_field = %guard_field))]
    async fn hash_set_if(
        &self,
        key: &str,
        guard_field: &str,
        expected: Option<&str>,
        fields: &[(&str, &str)],
    ) -> Result<bool, AppError> {
        let mut conn = self.connection.clone();

        let [expected_present, expected_value] = guard_args(expected);
        let mut invocation = self.hash_set_if_script.key(key);
        invocation
            .arg(guard_field)
            .arg(expected_present)
            .arg(expected_value);
        for (field, value) in fields {
            invocation.arg(*field).arg(*value);
        }

        let applied: i64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| Self::unavailable("HASH_SET_IF", key, e))?;

        debug!(applied = applied == 1, "Guarded hash write finished");
        Ok(applied == 1)
    }

    #[instrument(skip_all, fields(key = %log_safe_key(key)))]
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.connection.clone();

        conn.get(key)
            .await
            .map_err(|e| Self::unavailable("GET", key, e))
    }

    #[instrument(skip_all, fields(key = %log_safe_key(key), ttl_secs = ttl.as_secs()))]
    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), AppError> {
        let mut conn = self.connection.clone();

        let _: () = conn
            .set_ex(key, value, expiry_seconds(ttl))
            .await
            .map_err(|e| Self::unavailable("SETEX", key, e))?;

        Ok(())
    }
}
