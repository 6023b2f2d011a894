//! Process-wide name → heatmap directory.
//!
//! Read-mostly: lookups load the current `Arc<HashMap>` without locking.
//! Additions and removals build a new map and swap the pointer, so a reader
//! never waits on a writer and never sees a half-updated directory.

use crate::config::EngineConfig;
use crate::manager::HeatMapManager;
use arc_swap::ArcSwap;
use heatmap_common::HeatmapResult;
use renderer::RadiatorRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

type Directory = HashMap<String, Arc<HeatMapManager>>;

#[derive(Debug, Default)]
pub struct HeatMapRegistry {
    maps: ArcSwap<Directory>,
}

impl HeatMapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One manager per configured heatmap, all sharing `radiators`.
    pub fn from_config(
        config: &EngineConfig,
        radiators: &Arc<RadiatorRegistry>,
    ) -> HeatmapResult<Self> {
        let mut directory = Directory::new();
        for heatmap in &config.heatmaps {
            let manager = HeatMapManager::new(
                heatmap.name.as_str(),
                heatmap.description.clone(),
                config.index_zoom_for(heatmap),
                Arc::clone(radiators),
            )?;
            directory.insert(heatmap.name.clone(), Arc::new(manager));
        }

        info!(heatmaps = directory.len(), "Built heatmap registry");
        Ok(Self {
            maps: ArcSwap::from_pointee(directory),
        })
    }

    pub fn get_heat_map(&self, name: &str) -> Option<Arc<HeatMapManager>> {
        self.maps.load().get(name).cloned()
    }

    /// Current directory; later changes do not affect the returned map.
    pub fn snapshot(&self) -> Arc<HashMap<String, Arc<HeatMapManager>>> {
        self.maps.load_full()
    }

    /// Publish a manager under its name, replacing any previous one.
    ///
    /// Returns the published manager and the one it replaced. The new map is
    /// built off to the side; concurrent writers retry against each other.
    pub fn insert(
        &self,
        manager: HeatMapManager,
    ) -> (Arc<HeatMapManager>, Option<Arc<HeatMapManager>>) {
        let manager = Arc::new(manager);
        let name = manager.name().to_string();
        let previous = self.maps.rcu(|current| {
            let mut next = Directory::clone(current);
            next.insert(name.clone(), Arc::clone(&manager));
            next
        });
        let replaced = previous.get(&name).cloned();
        (manager, replaced)
    }

    pub fn remove(&self, name: &str) -> Option<Arc<HeatMapManager>> {
        if !self.maps.load().contains_key(name) {
            return None;
        }
        let previous = self.maps.rcu(|current| {
            let mut next = Directory::clone(current);
            next.remove(name);
            next
        });
        previous.get(name).cloned()
    }

    /// Heatmap names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.maps.load().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.maps.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use test_utils::{event_at, FIXED_NOW, SAMPLE_CONFIG_YAML};

    fn manager(name: &str) -> HeatMapManager {
        HeatMapManager::new(name, None, 6, Arc::new(RadiatorRegistry::new())).unwrap()
    }

    #[test]
    fn test_from_config() {
        let config = EngineConfig::from_yaml(SAMPLE_CONFIG_YAML).unwrap();
        let radiators = Arc::new(RadiatorRegistry::new());
        let registry = HeatMapRegistry::from_config(&config, &radiators).unwrap();
        assert_eq!(registry.names(), vec!["checkins", "photos"]);
        assert_eq!(
            registry.get_heat_map("checkins").unwrap().store().index_zoom(),
            10
        );
        assert!(registry.get_heat_map("missing").is_none());
    }

    #[test]
    fn test_snapshot_is_stable_across_updates() {
        let registry = HeatMapRegistry::new();
        registry.insert(manager("a"));
        let before = registry.snapshot();

        registry.insert(manager("b"));
        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());

        assert_eq!(before.len(), 1);
        assert!(before.contains_key("a"));
        assert_eq!(registry.names(), vec!["b"]);
    }

    #[test]
    fn test_replacing_keeps_old_manager_alive() {
        let registry = HeatMapRegistry::new();
        registry.insert(manager("a"));
        let old = registry.get_heat_map("a").unwrap();
        old.ingest(event_at(0.0, 0.0, FIXED_NOW));

        let (published, previous) = registry.insert(manager("a"));
        assert!(Arc::ptr_eq(&previous.unwrap(), &old));
        assert_eq!(old.store().len(), 1);
        assert!(Arc::ptr_eq(&registry.get_heat_map("a").unwrap(), &published));
        assert_eq!(published.store().len(), 0);
    }

    #[test]
    fn test_insert_returns_what_it_published() {
        let registry = HeatMapRegistry::new();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        let (published, _) = registry.insert(manager("shared"));
                        assert_eq!(published.name(), "shared");
                        published.ingest(event_at(0.0, 0.0, FIXED_NOW));
                        assert_eq!(published.store().len(), 1);
                    }
                });
            }
        });
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookups_progress_during_writes() {
        let registry = HeatMapRegistry::new();
        registry.insert(manager("stable"));
        let writing = AtomicBool::new(true);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..200 {
                    registry.insert(manager(&format!("churn-{}", i % 8)));
                    registry.remove(&format!("churn-{}", (i + 4) % 8));
                }
                writing.store(false, Ordering::Release);
            });
            for _ in 0..4 {
                scope.spawn(|| {
                    let mut lookups = 0u64;
                    while writing.load(Ordering::Acquire) || lookups < 1000 {
                        let stable = registry.get_heat_map("stable");
                        assert_eq!(stable.unwrap().name(), "stable");
                        lookups += 1;
                    }
                });
            }
        });
        assert!(registry.get_heat_map("stable").is_some());
        assert!(registry.len() <= 9);
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let registry = HeatMapRegistry::new();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..100 {
                    registry.insert(manager(&format!("map-{}", i)));
                }
            });
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let snapshot = registry.snapshot();
                        for (name, manager) in snapshot.iter() {
                            assert_eq!(name, manager.name());
                        }
                    }
                });
            }
        });
        assert_eq!(registry.len(), 100);
    }
}
