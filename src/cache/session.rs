use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::models::{NewsPage, Profile};

/// Consider cached session data stale after 10 minutes.
const CACHE_STALE_MINUTES: i64 = 10;

#[derive(Debug, Clone)]
pub struct CachedEntry<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedEntry<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn is_stale(&self) -> bool {
        (Utc::now() - self.cached_at).num_minutes() > CACHE_STALE_MINUTES
    }
}

#[derive(Default)]
struct CacheInner {
    profile: Option<CachedEntry<Profile>>,
    news: HashMap<i32, CachedEntry<NewsPage>>,
}

/// In-memory cache tied to the lifetime of the current session.
#[derive(Default)]
pub struct SessionCache {
    inner: RwLock<CacheInner>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self) -> Option<CachedEntry<Profile>> {
        self.inner
            .read()
            .expect("session cache lock poisoned")
            .profile
            .clone()
    }

    pub fn put_profile(&self, profile: Profile) {
        let mut inner = self.inner.write().expect("session cache lock poisoned");
        inner.profile = Some(CachedEntry::new(profile));
    }

    pub fn news_page(&self, page: i32) -> Option<CachedEntry<NewsPage>> {
        self.inner
            .read()
            .expect("session cache lock poisoned")
            .news
            .get(&page)
            .cloned()
    }

    pub fn put_news_page(&self, page: i32, data: NewsPage) {
        let mut inner = self.inner.write().expect("session cache lock poisoned");
        inner.news.insert(page, CachedEntry::new(data));
    }

    /// Drop everything. Called from credential teardown.
    pub fn clear(&self) {
        let mut inner = self.inner.write().expect("session cache lock poisoned");
        inner.profile = None;
        inner.news.clear();
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        let inner = self.inner.read().expect("session cache lock poisoned");
        inner.profile.is_none() && inner.news.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Settings;

    fn sample_profile() -> Profile {
        Profile {
            id: 1,
            email: "rider@example.com".to_string(),
            first_name: Some("Eva".to_string()),
            last_name: None,
            phone_number: None,
            settings: Settings::default(),
        }
    }

    #[test]
    fn clear_removes_all_entries() {
        let cache = SessionCache::new();
        cache.put_profile(sample_profile());
        cache.put_news_page(1, NewsPage::default());
        assert!(!cache.is_empty());

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.profile().is_none());
        assert!(cache.news_page(1).is_none());
    }

    #[test]
    fn fresh_entry_is_not_stale() {
        let cache = SessionCache::new();
        cache.put_profile(sample_profile());
        assert!(!cache.profile().expect("profile was just cached").is_stale());
    }
}
