use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block,
}

/// Time-bounded store of moderation verdicts keyed by normalized query.
///
/// Reads return `None` both when no entry exists and when the entry is stale;
/// callers must treat both as "re-evaluate". Writes always overwrite. Stale
/// entries are pruned on write and overflow past `max_entries` is evicted, so
/// the map stays bounded in a long-lived process.
#[derive(Clone)]
pub struct VerdictCache {
    entries: Arc<RwLock<HashMap<String, VerdictEntry>>>,
    max_entries: usize,
    ttl: Duration,
}

#[derive(Clone)]
struct VerdictEntry {
    verdict: Verdict,
    categories: Vec<String>,
    recorded_at: Instant,
}

impl VerdictCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries,
            ttl,
        }
    }

    pub fn enabled(&self) -> bool {
        self.max_entries > 0 && self.ttl > Duration::ZERO
    }

    pub async fn get(&self, normalized: &str) -> Option<(Verdict, Vec<String>)> {
        if !self.enabled() {
            return None;
        }

        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.get(normalized).and_then(|entry| {
            (now.duration_since(entry.recorded_at) < self.ttl)
                .then(|| (entry.verdict, entry.categories.clone()))
        })
    }

    pub async fn put(&self, normalized: String, verdict: Verdict, categories: Vec<String>) {
        if !self.enabled() {
            return;
        }

        let now = Instant::now();
        let mut entries = self.entries.write().await;

        entries.retain(|_, entry| now.duration_since(entry.recorded_at) < self.ttl);
        entries.insert(
            normalized.clone(),
            VerdictEntry {
                verdict,
                categories,
                recorded_at: now,
            },
        );

        if entries.len() <= self.max_entries {
            return;
        }

        // The sweep must never evict the verdict that was just written.
        let mut overflow = entries.len() - self.max_entries;
        let keys = entries
            .keys()
            .filter(|key| **key != normalized)
            .cloned()
            .collect::<Vec<_>>();
        for key in keys {
            if overflow == 0 {
                break;
            }
            if entries.remove(&key).is_some() {
                overflow -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_entries_are_returned() {
        let cache = VerdictCache::new(16, Duration::from_secs(60));
        cache
            .put("lofi beats".to_string(), Verdict::Allow, Vec::new())
            .await;

        assert_eq!(
            cache.get("lofi beats").await,
            Some((Verdict::Allow, Vec::new()))
        );
        assert_eq!(cache.get("other query").await, None);
    }

    #[tokio::test]
    async fn stale_entries_read_as_absent() {
        let cache = VerdictCache::new(16, Duration::from_millis(5));
        cache
            .put(
                "q".to_string(),
                Verdict::Block,
                vec!["sexual".to_string()],
            )
            .await;

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.get("q").await, None);
    }

    #[tokio::test]
    async fn writes_overwrite_prior_verdicts() {
        let cache = VerdictCache::new(16, Duration::from_secs(60));
        cache
            .put("q".to_string(), Verdict::Block, vec!["sexual".to_string()])
            .await;
        cache.put("q".to_string(), Verdict::Allow, Vec::new()).await;

        assert_eq!(cache.get("q").await, Some((Verdict::Allow, Vec::new())));
    }

    #[tokio::test]
    async fn zero_capacity_disables_the_cache() {
        let cache = VerdictCache::new(0, Duration::from_secs(60));
        cache.put("q".to_string(), Verdict::Allow, Vec::new()).await;

        assert!(!cache.enabled());
        assert_eq!(cache.get("q").await, None);
    }

    #[tokio::test]
    async fn overflow_is_evicted_down_to_capacity() {
        let cache = VerdictCache::new(2, Duration::from_secs(60));
        for i in 0..5 {
            cache
                .put(format!("query {i}"), Verdict::Allow, Vec::new())
                .await;
        }

        let entries = cache.entries.read().await;
        assert!(entries.len() <= 2);
    }

    #[tokio::test]
    async fn eviction_never_removes_the_verdict_just_written() {
        let cache = VerdictCache::new(2, Duration::from_secs(60));
        for i in 0..10 {
            let key = format!("query {i}");
            cache.put(key.clone(), Verdict::Allow, Vec::new()).await;
            assert_eq!(
                cache.get(&key).await,
                Some((Verdict::Allow, Vec::new())),
                "a put at capacity must still store its own entry"
            );
        }
    }
}
