use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use super::KeyValueStore;
use crate::room::log_safe_key;
use crate::shared::AppError;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory implementation of KeyValueStore for development and testing
///
/// Expired keys are invisible to reads and are swept out of the map on every
/// write, so keys nobody reads again do not accumulate. Data is lost when the
/// process exits.
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    writes: AtomicUsize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates a new empty in-memory store
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of mutating operations applied so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Remaining time-to-live of a key, `None` if absent or persistent
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.lock().ok()?;
        let now = Instant::now();
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Number of keys held in the map, including expired ones not yet swept
    pub fn entry_count(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, AppError> {
        self.entries.lock().map_err(|_| {
            warn!("In-memory store lock poisoned");
            AppError::StoreUnavailable("in-memory store lock poisoned".to_string())
        })
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    /// Drops every expired key
    fn sweep(entries: &mut HashMap<String, Entry>) {
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));

        let swept = before - entries.len();
        if swept > 0 {
            debug!(swept, "Swept expired keys");
        }
    }

    /// Returns the live entry for a key, evicting it first if it has expired
    fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
        if entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(Instant::now()))
        {
            debug!("Evicting expired key");
            entries.remove(key);
        }
        entries.get_mut(key)
    }

    fn wrong_type(key: &str) -> AppError {
        AppError::StoreUnavailable(format!("wrong value type for key {}", log_safe_key(key)))
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    #[instrument(skip_all, fields(key = %log_safe_key(key)))]
    async fn hash_get_all(&self, key: &str) -> Result<Option<HashMap<String, String>>, AppError> {
        let mut entries = self.lock()?;
        match Self::live(&mut entries, key) {
            None => Ok(None),
            // An empty hash does not exist, as in Redis
            Some(Entry {
                value: Value::Hash(fields),
                ..
            }) => Ok((!fields.is_empty()).then(|| fields.clone())),
            Some(_) => Err(Self::wrong_type(key)),
        }
    }

    #[instrument(skip_all, fields(key = %log_safe_key(key)))]
    async fn hash_set(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), AppError> {
        let mut entries = self.lock()?;
        Self::sweep(&mut entries);
        match Self::live(&mut entries, key) {
            Some(Entry {
                value: Value::Hash(existing),
                ..
            }) => {
                for (field, value) in fields {
                    existing.insert(field.to_string(), value.to_string());
                }
            }
            Some(_) => return Err(Self::wrong_type(key)),
            None => {
                let hash = fields
                    .iter()
                    .map(|(f, v)| (f.to_string(), v.to_string()))
                    .collect();
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::Hash(hash),
                        expires_at: None,
                    },
                );
            }
        }

        self.record_write();
        debug!(field_count = fields.len(), "Hash fields set in memory");
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
        let mut entries = self.lock()?;
        Self::sweep(&mut entries);
        let existing = match Self::live(&mut entries, key) {
            None => {
                debug!("Guarded write skipped, hash missing");
                return Ok(false);
            }
            Some(Entry {
                value: Value::Hash(existing),
                ..
            }) => existing,
            Some(_) => return Err(Self::wrong_type(key)),
        };

        if existing.get(guard_field).map(String::as_str) != expected {
            debug!("Guarded write rejected, value changed");
            return Ok(false);
        }

        for (field, value) in fields {
            existing.insert(field.to_string(), value.to_string());
        }

        self.record_write();
        debug!(field_count = fields.len(), "Guarded write applied in memory");
        Ok(true)
    }

    #[instrument(skip_all, fields(key = %log_safe_key(key)))]
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut entries = self.lock()?;
        match Self::live(&mut entries, key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Str(value),
                ..
            }) => Ok(Some(value.clone())),
            Some(_) => Err(Self::wrong_type(key)),
        }
    }

    #[instrument(skip_all, fields(key = %log_safe_key(key), ttl_secs = ttl.as_secs()))]
    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), AppError> {
        let mut entries = self.lock()?;
        Self::sweep(&mut entries);
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );

        self.record_write();
        debug!("Expiring value set in memory");
        Ok(())
    }
}
