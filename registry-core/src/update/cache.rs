//! In-memory TTL cache over [`crate::manager::UpdateCandidate`] lists, so a
//! burst of UI queries (status bar, per-bundle badges, command palette)
//! doesn't each re-walk every installed bundle and its source cache.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::manager::UpdateCandidate;

/// Default time-to-live for a computed update list.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Holds the most recently computed candidate list, timestamped so callers
/// can tell whether it's still fresh.
pub struct UpdateCache {
    ttl: Duration,
    state: Mutex<Option<(Instant, Vec<UpdateCandidate>)>>,
}

impl UpdateCache {
    /// Build a cache with the given time-to-live.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(None),
        }
    }

    /// Whether the cache currently holds a value younger than its TTL.
    pub async fn is_valid(&self) -> bool {
        self.state
            .lock()
            .await
            .as_ref()
            .is_some_and(|(fetched_at, _)| fetched_at.elapsed() < self.ttl)
    }

    /// How long ago the cache was last populated, or `None` if it has never
    /// been populated.
    pub async fn age(&self) -> Option<Duration> {
        self.state
            .lock()
            .await
            .as_ref()
            .map(|(fetched_at, _)| fetched_at.elapsed())
    }

    /// The cached candidates, if still within the TTL.
    pub async fn get(&self) -> Option<Vec<UpdateCandidate>> {
        let state = self.state.lock().await;
        match state.as_ref() {
            Some((fetched_at, candidates)) if fetched_at.elapsed() < self.ttl => {
                Some(candidates.clone())
            }
            _ => None,
        }
    }

    /// Replace the cached value, stamped with the current time.
    pub async fn set(&self, candidates: Vec<UpdateCandidate>) {
        *self.state.lock().await = Some((Instant::now(), candidates));
    }

    /// Drop the cached value, forcing the next check to recompute it.
    pub async fn clear(&self) {
        *self.state.lock().await = None;
    }
}

impl Default for UpdateCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Scope;

    fn candidate(bundle_id: &str) -> UpdateCandidate {
        UpdateCandidate {
            bundle_id: bundle_id.to_string(),
            scope: Scope::User,
            installed_version: "1.0.0".to_string(),
            latest_bundle_id: bundle_id.to_string(),
            latest_version: "1.1.0".to_string(),
        }
    }

    #[tokio::test]
    async fn empty_cache_is_invalid() {
        let cache = UpdateCache::new(Duration::from_secs(60));
        assert!(!cache.is_valid().await);
        assert!(cache.get().await.is_none());
        assert!(cache.age().await.is_none());
    }

    #[tokio::test]
    async fn set_then_get_round_trips_within_ttl() {
        let cache = UpdateCache::new(Duration::from_secs(60));
        cache.set(vec![candidate("acme-widgets")]).await;
        assert!(cache.is_valid().await);
        let got = cache.get().await.expect("populated cache");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].bundle_id, "acme-widgets");
    }

    #[tokio::test]
    async fn expired_entry_is_not_returned() {
        let cache = UpdateCache::new(Duration::from_millis(1));
        cache.set(vec![candidate("acme-widgets")]).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!cache.is_valid().await);
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn clear_empties_the_cache() {
        let cache = UpdateCache::new(Duration::from_secs(60));
        cache.set(vec![candidate("acme-widgets")]).await;
        cache.clear().await;
        assert!(cache.get().await.is_none());
    }
}
