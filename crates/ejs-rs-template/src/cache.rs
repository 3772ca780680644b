//! Compiled-unit and raw-text caches.
//!
//! A [`TemplateCache`] maps filenames to compiled [`Template`]s, and
//! `filename + ":string"` keys to raw template text read by `render_file`.
//! The first writer for a key wins; [`TemplateCache::clear`] drops every entry
//! without affecting templates already handed out.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::engine::Template;

/// Suffix distinguishing raw-text keys from compiled-unit keys.
const SOURCE_SUFFIX: &str = ":string";

/// A thread-safe cache of compiled templates and template sources.
#[derive(Debug, Default)]
pub struct TemplateCache {
    units: RwLock<HashMap<String, Arc<Template>>>,
    sources: RwLock<HashMap<String, Arc<str>>>,
}

impl TemplateCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compiled template stored for `filename`.
    pub fn get(&self, filename: &str) -> Option<Arc<Template>> {
        self.units
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(filename)
            .cloned()
    }

    /// Stores a compiled template unless one is already present, and returns
    /// whichever template the cache now holds for `filename`.
    pub fn insert(&self, filename: &str, template: Arc<Template>) -> Arc<Template> {
        let mut units = self.units.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(units.entry(filename.to_string()).or_insert(template))
    }

    /// Returns the raw text stored for `filename`.
    pub fn get_source(&self, filename: &str) -> Option<Arc<str>> {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&source_key(filename))
            .cloned()
    }

    /// Stores raw text unless already present, returning the cached text.
    pub fn insert_source(&self, filename: &str, source: Arc<str>) -> Arc<str> {
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(sources.entry(source_key(filename)).or_insert(source))
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.units
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Returns the number of cached compiled templates.
    pub fn len(&self) -> usize {
        self.units.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if no compiled templates are cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn source_key(filename: &str) -> String {
    format!("{filename}{SOURCE_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::options::CompileOptions;

    fn compile(text: &str) -> Arc<Template> {
        Engine::new().compile(text, &CompileOptions::default()).unwrap()
    }

    #[test]
    fn test_first_writer_wins() {
        let cache = TemplateCache::new();
        let first = compile("one");
        let second = compile("two");
        let stored = cache.insert("a.ejs", Arc::clone(&first));
        assert!(Arc::ptr_eq(&stored, &first));
        let stored = cache.insert("a.ejs", second);
        assert!(Arc::ptr_eq(&stored, &first));
        assert!(Arc::ptr_eq(&cache.get("a.ejs").unwrap(), &first));
    }

    #[test]
    fn test_sources_are_keyed_separately() {
        let cache = TemplateCache::new();
        cache.insert_source("a.ejs", Arc::from("text"));
        assert!(cache.get("a.ejs").is_none());
        assert_eq!(cache.get_source("a.ejs").as_deref(), Some("text"));
        let kept = cache.insert_source("a.ejs", Arc::from("other"));
        assert_eq!(&*kept, "text");
    }

    #[test]
    fn test_clear_keeps_held_templates_usable() {
        let cache = TemplateCache::new();
        let held = cache.insert("a.ejs", compile("hello"));
        cache.insert_source("a.ejs", Arc::from("hello"));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get_source("a.ejs").is_none());
        assert_eq!(held.render(&crate::context::Context::new()).unwrap(), "hello");
    }
}
