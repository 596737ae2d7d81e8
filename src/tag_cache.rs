use crate::api::{ApiError, ArchiveApi};

/// Every tag the archive knows about, in the order the server listed them.
/// Only used to feed autocomplete.
#[derive(Debug, Default)]
pub struct TagIndexCache {
    tags: Vec<String>,
    refreshed: bool,
}

impl TagIndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache directly, e.g. from a tag list fetched elsewhere
    pub fn from_tags(tags: Vec<String>) -> Self {
        Self {
            tags,
            refreshed: true,
        }
    }

    /// Replace the cache with the server's tag list. On failure the previous
    /// tags stay in place and the error is handed back as a warning.
    pub async fn refresh<A: ArchiveApi + ?Sized>(&mut self, api: &A) -> Result<usize, ApiError> {
        match api.all_tags().await {
            Ok(tags) => {
                log::info!("[Tags] Cached {} tags", tags.len());
                self.tags = tags;
                self.refreshed = true;
                Ok(self.tags.len())
            }
            Err(e) => {
                log::warn!(
                    "[Tags] Refresh failed, keeping {} cached tags: {}",
                    self.tags.len(),
                    e
                );
                Err(e)
            }
        }
    }

    /// Tags whose first `prefix.chars().count()` characters match `prefix`
    /// ignoring case, in cache order
    pub fn suggestions_for(&self, prefix: &str) -> Vec<&str> {
        let wanted = prefix.to_lowercase();
        let width = prefix.chars().count();
        self.tags
            .iter()
            .filter(|tag| {
                let head: String = tag.chars().take(width).collect();
                head.to_lowercase() == wanted
            })
            .map(String::as_str)
            .collect()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Whether at least one refresh has succeeded
    pub fn is_loaded(&self) -> bool {
        self.refreshed
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeArchive;

    fn cache(tags: &[&str]) -> TagIndexCache {
        TagIndexCache::from_tags(tags.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn test_prefix_match_keeps_cache_order() {
        let cache = cache(&["cat", "car", "dog"]);
        assert_eq!(cache.suggestions_for("ca"), vec!["cat", "car"]);
        assert_eq!(cache.suggestions_for("CA"), vec!["cat", "car"]);
        assert_eq!(cache.suggestions_for("do"), vec!["dog"]);
        assert!(cache.suggestions_for("og").is_empty());
        assert!(cache.suggestions_for("cats").is_empty());
    }

    #[test]
    fn test_starts_empty() {
        let cache = TagIndexCache::new();
        assert!(!cache.is_loaded());
        assert!(cache.suggestions_for("a").is_empty());
    }

    #[tokio::test]
    async fn test_refresh_replaces_and_failure_keeps_previous() {
        let api = FakeArchive::default();
        api.set_tags(&["sunset", "sea"]);
        let mut cache = TagIndexCache::new();

        assert_eq!(cache.refresh(&api).await.unwrap(), 2);
        assert_eq!(cache.suggestions_for("s"), vec!["sunset", "sea"]);

        api.fail_tags(true);
        assert!(cache.refresh(&api).await.is_err());
        assert_eq!(cache.tags(), &["sunset".to_string(), "sea".to_string()]);
        assert!(cache.is_loaded());
    }
}
