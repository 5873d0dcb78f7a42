use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::BotError;
use crate::tmdb::CatalogClient;

/// Process-lifetime genre id -> name lookup.
///
/// Warmed from the catalog once; a concurrent warm race just rewrites the
/// map with the same data. There is no refresh path, staleness is accepted.
#[derive(Clone, Default)]
pub struct GenreCache {
    names: Arc<RwLock<HashMap<u64, String>>>,
}

impl GenreCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the cache from the remote genre listing unless it already
    /// holds entries.
    pub async fn warm(&self, client: &CatalogClient) -> Result<(), BotError> {
        if !self.is_empty() {
            return Ok(());
        }
        let genres = client.genre_list().await?;
        if let Ok(mut names) = self.names.write() {
            *names = genres.into_iter().map(|g| (g.id, g.name)).collect();
        }
        Ok(())
    }

    /// Display name for a genre id, falling back to the id itself when the
    /// cache was never warmed or the id is stale.
    pub fn lookup(&self, id: u64) -> String {
        self.names
            .read()
            .ok()
            .and_then(|names| names.get(&id).cloned())
            .unwrap_or_else(|| id.to_string())
    }

    /// Genres as (id, name) pairs sorted by name, for the genre menu.
    pub fn entries(&self) -> Vec<(u64, String)> {
        let mut entries: Vec<(u64, String)> = self
            .names
            .read()
            .map(|names| names.iter().map(|(&id, name)| (id, name.clone())).collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| a.1.cmp(&b.1));
        entries
    }

    pub fn is_empty(&self) -> bool {
        self.names.read().map(|names| names.is_empty()).unwrap_or(true)
    }

    #[cfg(test)]
    pub fn with_entries(entries: &[(u64, &str)]) -> Self {
        let cache = Self::new();
        if let Ok(mut names) = cache.names.write() {
            *names = entries
                .iter()
                .map(|&(id, name)| (id, name.to_string()))
                .collect();
        }
        cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_falls_back_to_stringified_id() {
        let cache = GenreCache::new();
        assert_eq!(cache.lookup(28), "28");

        let cache = GenreCache::with_entries(&[(28, "Боевик")]);
        assert_eq!(cache.lookup(28), "Боевик");
        assert_eq!(cache.lookup(999), "999");
    }

    #[test]
    fn entries_are_sorted_by_name() {
        let cache = GenreCache::with_entries(&[(35, "Комедия"), (28, "Боевик")]);
        let names: Vec<String> = cache.entries().into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, ["Боевик", "Комедия"]);
    }
}
