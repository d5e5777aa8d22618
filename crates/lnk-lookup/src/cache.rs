//! Local cache of advertised instance addresses.

use dashmap::DashMap;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::config::CacheConfig;

/// Change notification emitted by [`AddressCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheChange {
    /// A cold fill stored the provider's server list.
    Filled { path: String, size: usize },
    /// A merge added addresses that were not cached before.
    Merged { path: String, added: Vec<String> },
}

/// Mapping from service path to the set of known `host:port` strings.
///
/// Entries only ever grow: fills and merges add addresses, nothing removes
/// them. Callers get snapshot copies, never a reference into the cache.
///
/// Cold fills are single-flight per path: concurrent first-time readers of
/// the same path wait on that path's fill lock and at most one of them runs
/// the fetch. Fills of different paths do not contend.
#[derive(Debug)]
pub struct AddressCache {
    entries: DashMap<String, HashSet<String>>,
    fill_locks: DashMap<String, Arc<Mutex<()>>>,
    requery_empty: bool,
    change_sender: broadcast::Sender<CacheChange>,
}

impl AddressCache {
    /// Creates an empty cache that stores empty fill results.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&CacheConfig::default())
    }

    /// Creates an empty cache from configuration.
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        let (change_sender, _) = broadcast::channel(1024);
        Self {
            entries: DashMap::new(),
            fill_locks: DashMap::new(),
            requery_empty: config.requery_empty,
            change_sender,
        }
    }

    /// Snapshot of the addresses cached for `path`.
    pub fn get(&self, path: &str) -> Option<HashSet<String>> {
        self.entries.get(path).map(|entry| entry.value().clone())
    }

    /// Returns the cached set for `path`, fetching it on a cold path.
    ///
    /// On a miss the path's fill lock is taken and the cache re-checked, so
    /// a reader that lost the race sees the winner's result instead of
    /// fetching again. A failed fetch leaves the entry absent.
    pub async fn fill_if_absent<F, Fut, E>(&self, path: &str, fetch: F) -> Result<HashSet<String>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>, E>>,
    {
        if let Some(servers) = self.get(path) {
            return Ok(servers);
        }

        let lock = self.fill_lock(path);
        let _guard = lock.lock().await;

        if let Some(servers) = self.get(path) {
            return Ok(servers);
        }

        warn!(path, "Address cache miss, fetching server list");
        let fetched = fetch().await?;

        if fetched.is_empty() {
            info!(path, "Server list is empty");
            if self.requery_empty {
                return Ok(HashSet::new());
            }
        } else {
            info!(path, servers = ?fetched, "Fetched server list");
        }

        // A concurrent merge may have created the entry while we fetched.
        let snapshot = {
            let mut entry = self.entries.entry(path.to_owned()).or_default();
            entry.extend(fetched);
            entry.value().clone()
        };

        info!(path, servers = ?snapshot, "Merged server list");
        let _ = self.change_sender.send(CacheChange::Filled {
            path: path.to_owned(),
            size: snapshot.len(),
        });

        Ok(snapshot)
    }

    /// Adds `addresses` to the entry for `path`, creating it if absent.
    ///
    /// Returns the number of addresses that were not cached before.
    pub fn merge<I>(&self, path: &str, addresses: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let (added, snapshot) = {
            let mut entry = self.entries.entry(path.to_owned()).or_default();
            let mut added = Vec::new();
            for address in addresses {
                if !entry.contains(&address) {
                    entry.insert(address.clone());
                    added.push(address);
                }
            }
            (added, entry.len())
        };

        if added.is_empty() {
            return 0;
        }

        info!(path, added = ?added, size = snapshot, "Merged server list");
        let count = added.len();
        let _ = self.change_sender.send(CacheChange::Merged {
            path: path.to_owned(),
            added,
        });
        count
    }

    /// Subscribes to cache changes.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheChange> {
        self.change_sender.subscribe()
    }

    /// Paths that currently have an entry.
    pub fn paths(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of cached paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no path is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn fill_lock(&self, path: &str) -> Arc<Mutex<()>> {
        self.fill_locks
            .entry(path.to_owned())
            .or_default()
            .value()
            .clone()
    }
}

impl Default for AddressCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const PATH: &str = "/lnk/g/s/1.0/1/servers";

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn get_missing_is_none() {
        let cache = AddressCache::new();
        assert!(cache.get(PATH).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn merge_only_adds() {
        let cache = AddressCache::new();
        cache.merge(PATH, strings(&["a:1", "b:1"]));
        let added = cache.merge(PATH, strings(&["b:1", "c:1"]));

        assert_eq!(added, 1);
        assert_eq!(cache.get(PATH).unwrap(), set(&["a:1", "b:1", "c:1"]));
    }

    #[test]
    fn merge_is_idempotent() {
        let cache = AddressCache::new();
        cache.merge(PATH, strings(&["a:1"]));
        assert_eq!(cache.merge(PATH, strings(&["a:1"])), 0);
        assert_eq!(cache.get(PATH).unwrap().len(), 1);
    }

    #[test]
    fn merge_empty_creates_entry() {
        let cache = AddressCache::new();
        cache.merge(PATH, Vec::new());
        assert_eq!(cache.get(PATH), Some(HashSet::new()));
        assert_eq!(cache.paths(), vec![PATH.to_string()]);
    }

    #[tokio::test]
    async fn fill_stores_fetched_servers() {
        let cache = AddressCache::new();
        let servers = cache
            .fill_if_absent(PATH, || async { Ok::<_, Infallible>(strings(&["a:1", "b:1"])) })
            .await
            .unwrap();

        assert_eq!(servers, set(&["a:1", "b:1"]));
        assert_eq!(cache.get(PATH).unwrap(), servers);
    }

    #[tokio::test]
    async fn fill_skips_fetch_when_present() {
        let cache = AddressCache::new();
        cache.merge(PATH, strings(&["a:1"]));
        let calls = AtomicUsize::new(0);

        let servers = cache
            .fill_if_absent(PATH, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(strings(&["z:1"]))
            })
            .await
            .unwrap();

        assert_eq!(servers, set(&["a:1"]));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_fill_is_cached_by_default() {
        let cache = AddressCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let servers = cache
                .fill_if_absent(PATH, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(Vec::new())
                })
                .await
                .unwrap();
            assert!(servers.is_empty());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get(PATH), Some(HashSet::new()));
    }

    #[tokio::test]
    async fn requery_empty_fetches_on_every_miss() {
        let cache = AddressCache::from_config(&CacheConfig {
            requery_empty: true,
        });
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            cache
                .fill_if_absent(PATH, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(Vec::new())
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(cache.get(PATH).is_none());
    }

    #[tokio::test]
    async fn failed_fill_leaves_entry_absent() {
        let cache = AddressCache::new();
        let result = cache
            .fill_if_absent(PATH, || async { Err::<Vec<String>, _>("unreachable") })
            .await;

        assert_eq!(result.unwrap_err(), "unreachable");
        assert!(cache.get(PATH).is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_cold_fills_fetch_once() {
        let cache = Arc::new(AddressCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .fill_if_absent(PATH, || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok::<_, Infallible>(vec!["a:1".to_owned()])
                        })
                        .await
                        .unwrap()
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), set(&["a:1"]));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fills_of_different_paths_do_not_block_each_other() {
        let cache = Arc::new(AddressCache::new());
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let slow = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .fill_if_absent("/slow/servers", || async move {
                        let _ = release_rx.await;
                        Ok::<_, Infallible>(vec!["s:1".to_owned()])
                    })
                    .await
            })
        };

        let fast = tokio::time::timeout(
            Duration::from_secs(2),
            cache.fill_if_absent("/fast/servers", || async {
                Ok::<_, Infallible>(vec!["f:1".to_owned()])
            }),
        )
        .await
        .expect("fill of another path was blocked")
        .unwrap();

        assert_eq!(fast, set(&["f:1"]));
        release_tx.send(()).unwrap();
        assert_eq!(slow.await.unwrap().unwrap(), set(&["s:1"]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_merges_are_all_kept() {
        let cache = Arc::new(AddressCache::new());

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.merge(PATH, vec![format!("10.0.0.{i}:9000")]) })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(cache.get(PATH).unwrap().len(), 32);
    }

    #[tokio::test]
    async fn subscribers_see_fills_and_growing_merges() {
        let cache = AddressCache::new();
        let mut changes = cache.subscribe();

        cache
            .fill_if_absent(PATH, || async { Ok::<_, Infallible>(strings(&["a:1"])) })
            .await
            .unwrap();
        cache.merge(PATH, strings(&["a:1"]));
        cache.merge(PATH, strings(&["a:1", "b:1"]));

        assert_eq!(
            changes.recv().await.unwrap(),
            CacheChange::Filled {
                path: PATH.to_owned(),
                size: 1
            }
        );
        assert_eq!(
            changes.recv().await.unwrap(),
            CacheChange::Merged {
                path: PATH.to_owned(),
                added: strings(&["b:1"])
            }
        );
        assert!(changes.try_recv().is_err());
    }
}
