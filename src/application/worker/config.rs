use url::Url;

use crate::application::patterns::CachePatterns;

/// Dynamic store: pages and static assets cached on first fetch.
/// Its name doubles as the version reported to `GET_VERSION`.
pub const CACHE_NAME: &str = "satam-kahiji-v2";
/// Static store: critical assets precached at install.
pub const STATIC_CACHE_NAME: &str = "satam-static-v2";

pub const CRITICAL_ASSETS: [&str; 4] = [
    "/build/manifest.json",
    "/favicon.svg",
    "/favicon.ico",
    "/logo-satam.png",
];

/// Cross-origin host whose responses are cached as if same-origin.
pub const FONT_HOST: &str = "fonts.bunny.net";

/// Everything a worker generation is constructed with.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Origin of the pages this worker controls.
    pub origin: Url,
    pub dynamic_cache: String,
    pub static_cache: String,
    pub critical_assets: Vec<String>,
    pub patterns: CachePatterns,
    pub font_host: String,
    /// Request activation as soon as install succeeds.
    pub skip_waiting_on_install: bool,
}

impl WorkerConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            dynamic_cache: CACHE_NAME.to_string(),
            static_cache: STATIC_CACHE_NAME.to_string(),
            critical_assets: CRITICAL_ASSETS.iter().map(|s| s.to_string()).collect(),
            patterns: CachePatterns::defaults(),
            font_host: FONT_HOST.to_string(),
            skip_waiting_on_install: true,
        }
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    pub fn is_font_host(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| host.contains(self.font_host.as_str()))
    }

    /// The two store names kept at activation.
    pub fn is_current_cache(&self, name: &str) -> bool {
        name == self.dynamic_cache || name == self.static_cache
    }

    pub fn resolve_asset(&self, path: &str) -> Result<Url, url::ParseError> {
        self.origin.join(path)
    }
}
