use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use roomgate::{AppError, InMemoryStore, KeyValueStore};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Store wrapper that counts operations, injects failures and can simulate a
/// concurrent writer. Every operation yields first so that tasks sharing the
/// store interleave.
pub struct ScriptedStore {
    inner: Arc<InMemoryStore>,
    hash_reads: AtomicUsize,
    value_reads: AtomicUsize,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_hash_writes: AtomicBool,
    fail_expiring_writes: AtomicBool,
    reject_guarded_writes: AtomicBool,
    interference: Mutex<Option<(String, Vec<(String, String)>)>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(InMemoryStore::new()),
            hash_reads: AtomicUsize::new(0),
            value_reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_hash_writes: AtomicBool::new(false),
            fail_expiring_writes: AtomicBool::new(false),
            reject_guarded_writes: AtomicBool::new(false),
            interference: Mutex::new(None),
        }
    }

    /// Direct access that bypasses counters and scripted behaviour
    pub fn inner(&self) -> Arc<InMemoryStore> {
        self.inner.clone()
    }

    pub fn hash_reads(&self) -> usize {
        self.hash_reads.load(Ordering::SeqCst)
    }

    pub fn value_reads(&self) -> usize {
        self.value_reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_hash_writes(&self, fail: bool) {
        self.fail_hash_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_expiring_writes(&self, fail: bool) {
        self.fail_expiring_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_reject_guarded_writes(&self, reject: bool) {
        self.reject_guarded_writes.store(reject, Ordering::SeqCst);
    }

    /// Before the next hash write to `key`, another writer sets `fields`
    pub fn interfere_once(&self, key: &str, fields: &[(&str, &str)]) {
        let fields = fields
            .iter()
            .map(|(f, v)| (f.to_string(), v.to_string()))
            .collect();
        *self.interference.lock().unwrap() = Some((key.to_string(), fields));
    }

    async fn apply_interference(&self, key: &str) {
        let pending = {
            let mut slot = self.interference.lock().unwrap();
            match slot.as_ref() {
                Some((target, _)) if target == key => slot.take(),
                _ => None,
            }
        };

        if let Some((target, fields)) = pending {
            let fields: Vec<(&str, &str)> = fields
                .iter()
                .map(|(f, v)| (f.as_str(), v.as_str()))
                .collect();
            self.inner.hash_set(&target, &fields).await.unwrap();
        }
    }

    fn unavailable() -> AppError {
        AppError::StoreUnavailable("scripted failure".to_string())
    }
}

#[async_trait]
impl KeyValueStore for ScriptedStore {
    async fn hash_get_all(&self, key: &str) -> Result<Option<HashMap<String, String>>, AppError> {
        tokio::task::yield_now().await;
        self.hash_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.hash_get_all(key).await
    }

    async fn hash_set(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), AppError> {
        tokio::task::yield_now().await;
        if self.fail_hash_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.apply_interference(key).await;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.hash_set(key, fields).await
    }

    async fn hash_set_if(
        &self,
        key: &str,
        guard_field: &str,
        expected: Option<&str>,
        fields: &[(&str, &str)],
    ) -> Result<bool, AppError> {
        tokio::task::yield_now().await;
        if self.fail_hash_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        if self.reject_guarded_writes.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.apply_interference(key).await;
        let applied = self
            .inner
            .hash_set_if(key, guard_field, expected, fields)
            .await?;
        if applied {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(applied)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        tokio::task::yield_now().await;
        self.value_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.get(key).await
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), AppError> {
        tokio::task::yield_now().await;
        if self.fail_expiring_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_with_expiry(key, value, ttl).await
    }
}
