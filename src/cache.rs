//! Per-channel content cache.
//!
//! Holds the most recent successful [`FetchResult`] per conversation
//! channel, feeding follow-up questions. Never persisted, no expiry;
//! last-write-wins, including when a slow fetch completes after a faster
//! later one (an accepted race, not a protected ordering).

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::fetch::FetchResult;

#[derive(Default)]
pub struct ChannelCache {
    inner: Mutex<HashMap<String, FetchResult>>,
}

impl ChannelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache a successful result for a channel. Error results are ignored —
    /// they must never become follow-up context.
    pub fn put(&self, channel: &str, result: &FetchResult) {
        if result.error {
            return;
        }
        self.lock().insert(channel.to_string(), result.clone());
    }

    pub fn get(&self, channel: &str) -> Option<FetchResult> {
        self.lock().get(channel).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, FetchResult>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::metadata::PageMetadata;
    use crate::platform::Platform;

    fn result(url: &str, error: bool) -> FetchResult {
        FetchResult {
            url: url.to_string(),
            title: String::new(),
            content: "text".to_string(),
            platform: Platform::General,
            metadata: PageMetadata::default(),
            error,
        }
    }

    #[test]
    fn last_write_wins_per_channel() {
        let cache = ChannelCache::new();
        cache.put("general", &result("https://first", false));
        cache.put("general", &result("https://second", false));
        assert_eq!(cache.get("general").unwrap().url, "https://second");
    }

    #[test]
    fn channels_are_independent() {
        let cache = ChannelCache::new();
        cache.put("a", &result("https://a", false));
        cache.put("b", &result("https://b", false));
        assert_eq!(cache.get("a").unwrap().url, "https://a");
        assert_eq!(cache.get("b").unwrap().url, "https://b");
    }

    #[test]
    fn error_results_are_never_cached() {
        let cache = ChannelCache::new();
        cache.put("general", &result("https://bad", true));
        assert!(cache.get("general").is_none());
    }
}
