//! Process-wide holder for the current assumption set
//!
//! Readers clone an `Arc` snapshot under a short read lock and project against it;
//! a reload swaps the whole `Arc`, so in-flight projections keep the version they
//! started with and never observe a partially updated table.

use std::sync::{Arc, RwLock};

use super::AssumptionSet;

/// Shared handle to the current assumption set
#[derive(Debug)]
pub struct AssumptionStore {
    current: RwLock<Arc<AssumptionSet>>,
}

impl AssumptionStore {
    pub fn new(assumptions: AssumptionSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(assumptions)),
        }
    }

    /// Consistent view of the current set
    pub fn snapshot(&self) -> Arc<AssumptionSet> {
        // The guarded value is only ever replaced whole, so a poisoned lock still holds a valid set
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&*guard)
    }

    /// Install a new set; returns the one it replaced
    pub fn replace(&self, assumptions: AssumptionSet) -> Arc<AssumptionSet> {
        let next = Arc::new(assumptions);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        log::info!("assumption set '{}' replaced by '{}'", guard.version, next.version);
        std::mem::replace(&mut *guard, next)
    }

    pub fn version(&self) -> String {
        self.snapshot().version.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ProductClass;

    fn set(version: &str, mortality: f64) -> AssumptionSet {
        AssumptionSet::flat(ProductClass::new("WL"), 20, 100, mortality, 0.0)
            .unwrap()
            .with_version(version)
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let store = AssumptionStore::new(set("v1", 0.01));
        let before = store.snapshot();

        let old = store.replace(set("v2", 0.02));
        assert_eq!(old.version, "v1");

        // The earlier snapshot still reads the old rates
        let class = ProductClass::new("WL");
        assert_eq!(before.decrements.rate(50, 0, &class).unwrap().mortality, 0.01);
        assert_eq!(store.snapshot().decrements.rate(50, 0, &class).unwrap().mortality, 0.02);
        assert_eq!(store.version(), "v2");
    }

    #[test]
    fn test_concurrent_readers() {
        let store = Arc::new(AssumptionStore::new(set("v1", 0.01)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.snapshot().version.clone())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "v1");
        }
    }
}
