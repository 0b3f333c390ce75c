//! Per-device hierarchy cache.
//!
//! Dumping a device is slow, so the last normalized hierarchy for each
//! serial is kept alongside its raw source and reused by hit-testing,
//! element info and XPath queries until the next dump replaces it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::hierarchy::{Platform, UiTree};

/// One cached dump for a device
#[derive(Debug)]
pub struct CacheEntry {
    pub serial: String,
    pub raw_source: String,
    pub tree: UiTree,
    pub platform: Platform,
    pub cached_at: SystemTime,
}

/// Thread-safe serial-keyed store of the most recent dump per device
#[derive(Debug, Default)]
pub struct HierarchyCache {
    entries: Mutex<HashMap<String, Arc<CacheEntry>>>,
}

impl HierarchyCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<CacheEntry>>> {
        // a poisoned lock still holds a usable map
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a dump, replacing any previous entry for the serial
    pub fn put(&self, serial: &str, raw_source: String, tree: UiTree, platform: Platform) {
        let entry = Arc::new(CacheEntry {
            serial: serial.to_string(),
            raw_source,
            tree,
            platform,
            cached_at: SystemTime::now(),
        });
        log::info!(
            "cached hierarchy for {serial} ({} nodes)",
            entry.tree.total_nodes
        );
        self.entries().insert(serial.to_string(), entry);
    }

    pub fn get(&self, serial: &str) -> Option<Arc<CacheEntry>> {
        self.entries().get(serial).cloned()
    }

    pub fn has(&self, serial: &str) -> bool {
        self.entries().contains_key(serial)
    }

    /// Drop the entry for a serial, if any. Returns whether one existed.
    pub fn invalidate(&self, serial: &str) -> bool {
        let removed = self.entries().remove(serial).is_some();
        if removed {
            log::info!("invalidated cached hierarchy for {serial}");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
