//! URL path rules for cache-first static content.

use once_cell::sync::Lazy;
use regex::Regex;

/// Built bundles, fonts and images uploaded or shipped with the portal.
pub const DEFAULT_CACHE_PATTERNS: [&str; 3] = [
    r"/build/assets/.*\.(js|css|woff2|woff)$",
    r"/images/.*\.(jpg|jpeg|png|webp|svg)$",
    r"/storage/.*\.(jpg|jpeg|png|webp|svg)$",
];

static IMAGE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(jpg|jpeg|png|webp|svg)$").expect("valid image pattern"));

static DEFAULT_PATTERNS: Lazy<CachePatterns> = Lazy::new(|| {
    CachePatterns::new(DEFAULT_CACHE_PATTERNS).expect("valid default cache patterns")
});

/// Compiled set of cache patterns. A path matches if any pattern matches
/// anywhere in it.
#[derive(Debug, Clone)]
pub struct CachePatterns {
    patterns: Vec<Regex>,
}

impl CachePatterns {
    pub fn new<I, S>(sources: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = sources
            .into_iter()
            .map(|source| Regex::new(source.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn defaults() -> Self {
        DEFAULT_PATTERNS.clone()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(path))
    }

    pub fn sources(&self) -> Vec<&str> {
        self.patterns.iter().map(Regex::as_str).collect()
    }
}

impl Default for CachePatterns {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Whether the path names an image by extension.
pub fn is_image_path(path: &str) -> bool {
    IMAGE_EXTENSION.is_match(path)
}
