use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use deepssh_db::Database;

/// Key-value storage the store mirrors its collections into.
///
/// Calls are blocking; the store issues them from `spawn_blocking`.
pub trait StorageBackend: Send + Sync + 'static {
    /// Short name for logs and health output.
    fn name(&self) -> &'static str;

    /// A non-durable backend is never read or written; the store keeps
    /// everything in memory and is initialized from the seed immediately.
    fn is_durable(&self) -> bool {
        true
    }

    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove every key in `keys`, or none of them if the call fails.
    fn remove_items(&self, keys: &[&str]) -> Result<()>;
}

/// Pure in-memory mode: nothing survives the process.
pub struct NullBackend;

impl StorageBackend for NullBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn get_item(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    fn remove_items(&self, _keys: &[&str]) -> Result<()> {
        Ok(())
    }
}

/// Durable-looking backend kept in a `HashMap`.
///
/// Outlives any number of [`crate::Store`] instances sharing it, which makes it
/// the way to simulate a process restart. Reads and writes can be made to
/// fail on demand, globally or for single keys.
#[derive(Default)]
pub struct MemoryBackend {
    items: Mutex<HashMap<String, String>>,
    refused: Mutex<HashSet<String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every write or removal that touches `key` fail.
    pub fn refuse_key(&self, key: &str) {
        self.refused_keys().insert(key.to_string());
    }

    /// Number of successful `set_item` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Store a value verbatim, bypassing the failure switches.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn refused_keys(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.refused.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) || self.refused_keys().contains(key) {
            bail!("write of {} refused", key);
        }
        Ok(())
    }
}

impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory-kv"
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("read of {} refused", key);
        }
        Ok(self.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.check_writable(key)?;
        self.lock().insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove_items(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.check_writable(key)?;
        }
        let mut items = self.lock();
        for key in keys {
            items.remove(*key);
        }
        Ok(())
    }
}

/// SQLite file on disk.
pub struct SqliteBackend {
    db: Arc<Database>,
}

impl SqliteBackend {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl StorageBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.db.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.db.set_item(key, value)
    }

    fn remove_items(&self, keys: &[&str]) -> Result<()> {
        self.db.remove_items(keys).map(|_| ())
    }
}
