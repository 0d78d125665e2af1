//! Caché consultiva del último estado observado por identificador.
//!
//! Nunca es fuente de verdad: se puede vaciar en cualquier momento y sólo se
//! lee cuando quien llama lo pide explícitamente.
use dashmap::DashMap;

use crate::status::StatusSnapshot;

#[derive(Default)]
pub struct StatusCache {
    entries: DashMap<String, StatusSnapshot>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, snapshot: &StatusSnapshot) {
        self.entries.insert(snapshot.id.clone(), snapshot.clone());
    }

    pub fn get(&self, id: &str) -> Option<StatusSnapshot> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    pub fn forget(&self, id: &str) {
        self.entries.remove(id);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chem_domain::JobStatus;

    #[test]
    fn records_latest_snapshot_and_forgets() {
        let cache = StatusCache::new();
        cache.record(&StatusSnapshot::new("a", JobStatus::Queued));
        cache.record(&StatusSnapshot::new("a", JobStatus::Running));
        assert_eq!(cache.get("a").map(|s| s.status), Some(JobStatus::Running));
        assert_eq!(cache.len(), 1);
        cache.forget("a");
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }
}
