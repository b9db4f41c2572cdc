//! Per-project cache of built listings
//!
//! Entries are replaced whole and evicted lazily: an expired entry is
//! removed by the first lookup that finds it. Nothing here fetches.

use artifact_common::JobData;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Fresh(Arc<JobData>),
    Expired,
    Missing,
}

struct SnapshotEntry {
    expires_at: Instant,
    data: Arc<JobData>,
}

#[derive(Default)]
pub struct SnapshotCache {
    entries: RwLock<HashMap<String, SnapshotEntry>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, project: &str) -> CacheLookup {
        {
            let entries = self.entries.read().await;
            match entries.get(project) {
                None => return CacheLookup::Missing,
                Some(entry) if entry.expires_at > Instant::now() => {
                    return CacheLookup::Fresh(Arc::clone(&entry.data));
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        // Replaced between dropping the read lock and taking the write lock
        if let Some(entry) = entries.get(project) {
            if entry.expires_at > Instant::now() {
                return CacheLookup::Fresh(Arc::clone(&entry.data));
            }
        }
        entries.remove(project);
        CacheLookup::Expired
    }

    pub async fn put(&self, project: &str, data: Arc<JobData>, ttl: Duration) {
        let entry = SnapshotEntry {
            expires_at: Instant::now() + ttl,
            data,
        };
        self.entries.write().await.insert(project.to_string(), entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
