//! Durable key-value slots behind the store
//!
//! The store only needs two things from persistence: a consistent read of
//! several keys, and an all-or-nothing write of several keys. [`Database`]
//! provides this on SQLite; [`MemorySlots`] keeps everything in memory.
//!
//! [`Database`]: crate::db::Database

use crate::error::Result;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Key-value persistence for collection snapshots.
pub trait SlotStore {
    /// Read the last bytes written under `key`
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Read several keys as of a single committed write, in `keys` order.
    ///
    /// Backends shared between processes must override this so no batch
    /// write lands between two of the reads.
    fn read_batch(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|key| self.read(key)).collect()
    }

    /// Write every entry or none of them
    fn write_batch(&self, writes: &[(&str, Vec<u8>)]) -> Result<()>;
}

impl<S: SlotStore + ?Sized> SlotStore for &S {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).read(key)
    }

    fn read_batch(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        (**self).read_batch(keys)
    }

    fn write_batch(&self, writes: &[(&str, Vec<u8>)]) -> Result<()> {
        (**self).write_batch(writes)
    }
}

/// In-memory slots.
///
/// Clones share the same map, so a store can be reopened over the slots a
/// previous store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySlots {
    slots: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently holding data
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SlotStore for MemorySlots {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock().get(key).cloned())
    }

    fn read_batch(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        let slots = self.lock();
        Ok(keys.iter().map(|key| slots.get(*key).cloned()).collect())
    }

    fn write_batch(&self, writes: &[(&str, Vec<u8>)]) -> Result<()> {
        let mut slots = self.lock();
        for (key, value) in writes {
            slots.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_slots_shared_between_clones() {
        let slots = MemorySlots::new();
        let other = slots.clone();

        slots
            .write_batch(&[("cases", b"[]".to_vec()), ("tasks", b"[1]".to_vec())])
            .unwrap();

        assert_eq!(other.read("tasks").unwrap(), Some(b"[1]".to_vec()));
        assert_eq!(other.read("goals").unwrap(), None);
        assert_eq!(other.keys(), vec!["cases".to_string(), "tasks".to_string()]);
    }

    #[test]
    fn test_read_batch_keeps_key_order() {
        let slots = MemorySlots::new();
        slots.write_batch(&[("tasks", b"[1]".to_vec())]).unwrap();

        let values = slots.read_batch(&["goals", "tasks"]).unwrap();
        assert_eq!(values, vec![None, Some(b"[1]".to_vec())]);
    }
}
