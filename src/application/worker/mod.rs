//! The offline worker: one generation of caching and routing behavior.
//!
//! Each platform event maps onto an async method. The future each method
//! returns is the completion contract; the host awaits it before it treats
//! the event as handled.

mod config;
mod strategy;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Instant;

use axum::http::StatusCode;
use futures::future::{join_all, try_join_all};
use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::{
    clients::Clients,
    patterns::is_image_path,
    ports::{Caches, Network, NetworkError},
};
use crate::cache::{CacheError, CachedResponse};
use crate::domain::{ControlMessage, FetchRequest, FetchResponse, WorkerId};

pub use config::{CACHE_NAME, CRITICAL_ASSETS, FONT_HOST, STATIC_CACHE_NAME, WorkerConfig};
pub use strategy::{API_OFFLINE_BODY, API_PREFIX, Bypass, OFFLINE_PAGE_BODY, Route, Strategy, classify};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    Synthetic,
}

impl ResponseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::Synthetic => "synthetic",
        }
    }
}

/// A response together with where it came from.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: FetchResponse,
    pub source: ResponseSource,
}

impl Served {
    fn network(response: FetchResponse) -> Self {
        Self {
            response,
            source: ResponseSource::Network,
        }
    }

    fn cache(response: FetchResponse) -> Self {
        Self {
            response,
            source: ResponseSource::Cache,
        }
    }

    fn synthetic(response: FetchResponse) -> Self {
        Self {
            response,
            source: ResponseSource::Synthetic,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Outcome of a fetch event.
#[derive(Debug)]
pub enum FetchDisposition {
    /// Not intercepted; the host performs the request as if no worker existed.
    Passthrough(Bypass),
    Respond {
        strategy: Strategy,
        outcome: Result<Served, FetchError>,
    },
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("precaching `{url}` failed: {reason}")]
    Install { url: String, reason: String },
    #[error("critical asset `{path}` does not resolve against the worker origin")]
    AssetUrl {
        path: String,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// What activation did to the stores it found.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub kept: Vec<String>,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
    /// Whether this worker took control of the clients.
    pub claimed: bool,
}

pub struct OfflineWorker {
    id: WorkerId,
    config: WorkerConfig,
    caches: Arc<dyn Caches>,
    network: Arc<dyn Network>,
    clients: Arc<Clients>,
    skip_waiting: AtomicBool,
}

impl std::fmt::Debug for OfflineWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineWorker")
            .field("id", &self.id)
            .field("dynamic_cache", &self.config.dynamic_cache)
            .field("static_cache", &self.config.static_cache)
            .finish()
    }
}

impl OfflineWorker {
    pub fn new(
        config: WorkerConfig,
        caches: Arc<dyn Caches>,
        network: Arc<dyn Network>,
        clients: Arc<Clients>,
    ) -> Self {
        Self {
            id: WorkerId::new(),
            config,
            caches,
            network,
            clients,
            skip_waiting: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// The version reported to pages: the dynamic store name.
    pub fn version(&self) -> &str {
        &self.config.dynamic_cache
    }

    /// Ask to be activated without waiting for the current controller to go away.
    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Precache the critical assets into the static store.
    ///
    /// All assets are fetched concurrently; the store is written only once
    /// every one of them answered 2xx.
    pub async fn install(&self) -> Result<(), WorkerError> {
        let started = Instant::now();
        let store = self.caches.open(&self.config.static_cache).await?;

        let requests = self
            .config
            .critical_assets
            .iter()
            .map(|path| {
                self.config
                    .resolve_asset(path)
                    .map(FetchRequest::get)
                    .map_err(|source| WorkerError::AssetUrl {
                        path: path.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let fetched = try_join_all(requests.iter().map(|request| self.precache(request))).await?;
        let count = fetched.len();
        store.put_all(fetched);

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!("satam_edge_install_ms").record(elapsed_ms);
        info!(
            target = "satam_edge::worker::install",
            worker = %self.id,
            store = store.name(),
            assets = count,
            elapsed_ms,
            "critical assets precached"
        );

        if self.config.skip_waiting_on_install {
            self.skip_waiting();
        }
        Ok(())
    }

    async fn precache(&self, request: &FetchRequest) -> Result<(String, CachedResponse), WorkerError> {
        let url = request.cache_key();
        let response = self
            .network
            .fetch(request)
            .await
            .map_err(|err| WorkerError::Install {
                url: url.clone(),
                reason: err.message,
            })?;

        if !response.status().is_success() {
            return Err(WorkerError::Install {
                url,
                reason: format!("unexpected status {}", response.status()),
            });
        }

        Ok((url, CachedResponse::from_response(&response)))
    }

    /// Purge every store that is not one of this generation's two, then
    /// take control of the clients.
    pub async fn activate(&self) -> Result<ActivationReport, WorkerError> {
        let names = self.caches.keys().await?;
        let (kept, stale): (Vec<String>, Vec<String>) = names
            .into_iter()
            .partition(|name| self.config.is_current_cache(name));

        let deletions = stale.iter().map(|name| async move {
            let outcome = self.caches.delete(name).await;
            (name.clone(), outcome)
        });

        let mut report = ActivationReport {
            kept,
            ..ActivationReport::default()
        };
        for (name, outcome) in join_all(deletions).await {
            match outcome {
                Ok(_) => {
                    counter!("satam_edge_cache_purged_total").increment(1);
                    info!(
                        target = "satam_edge::worker::activate",
                        worker = %self.id,
                        store = %name,
                        "stale cache store deleted"
                    );
                    report.deleted.push(name);
                }
                Err(err) => {
                    warn!(
                        target = "satam_edge::worker::activate",
                        worker = %self.id,
                        store = %name,
                        error = %err,
                        "failed to delete stale cache store"
                    );
                    report.failed.push(name);
                }
            }
        }

        self.clients.claim(self.id);
        report.claimed = true;
        Ok(report)
    }

    /// Route one intercepted request.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> FetchDisposition {
        let strategy = match classify(request, &self.config) {
            Route::Bypass(reason) => {
                debug!(
                    target = "satam_edge::worker::fetch",
                    url = %request.url(),
                    reason = reason.as_str(),
                    "request not intercepted"
                );
                return FetchDisposition::Passthrough(reason);
            }
            Route::Intercept(strategy) => strategy,
        };

        let outcome = match strategy {
            Strategy::Api => Ok(self.network_only(request).await),
            Strategy::StaticAsset => self.cache_first(request).await,
            Strategy::Page => Ok(self.network_first(request).await),
        };

        let source = match &outcome {
            Ok(served) => served.source.as_str(),
            Err(_) => "error",
        };
        counter!(
            "satam_edge_fetch_total",
            "strategy" => strategy.as_str(),
            "source" => source
        )
        .increment(1);
        debug!(
            target = "satam_edge::worker::fetch",
            url = %request.url(),
            strategy = strategy.as_str(),
            source,
            "request handled"
        );

        FetchDisposition::Respond { strategy, outcome }
    }

    async fn network_only(&self, request: &FetchRequest) -> Served {
        match self.network.fetch(request).await {
            Ok(response) => Served::network(response),
            Err(err) => {
                debug!(
                    target = "satam_edge::worker::fetch",
                    url = %request.url(),
                    error = %err,
                    "api request failed; answering offline json"
                );
                Served::synthetic(strategy::api_unavailable())
            }
        }
    }

    async fn cache_first(&self, request: &FetchRequest) -> Result<Served, FetchError> {
        if let Some(cached) = self.cached(request).await {
            return Ok(Served::cache(cached.to_response()));
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.status() == StatusCode::OK {
                    self.store_dynamic(request, &response).await;
                }
                Ok(Served::network(response))
            }
            Err(_) if is_image_path(request.path()) => {
                Ok(Served::synthetic(strategy::image_not_found()))
            }
            Err(err) => Err(FetchError::Network(err)),
        }
    }

    async fn network_first(&self, request: &FetchRequest) -> Served {
        match self.network.fetch(request).await {
            Ok(response) => {
                let is_html = response
                    .content_type()
                    .is_some_and(|value| value.contains("text/html"));
                if response.status() == StatusCode::OK && is_html {
                    self.store_dynamic(request, &response).await;
                }
                Served::network(response)
            }
            Err(err) => {
                debug!(
                    target = "satam_edge::worker::fetch",
                    url = %request.url(),
                    error = %err,
                    "page request failed; falling back to cache"
                );
                match self.cached(request).await {
                    Some(cached) => Served::cache(cached.to_response()),
                    None => Served::synthetic(strategy::offline_page()),
                }
            }
        }
    }

    /// Cache lookup across every store. A failing lookup counts as a miss.
    async fn cached(&self, request: &FetchRequest) -> Option<CachedResponse> {
        match self.caches.match_request(&request.cache_key()).await {
            Ok(hit) => hit,
            Err(err) => {
                warn!(
                    target = "satam_edge::worker::fetch",
                    url = %request.url(),
                    error = %err,
                    "cache lookup failed"
                );
                None
            }
        }
    }

    /// Store a copy of a live response. Failures are logged and the live
    /// response is still returned.
    async fn store_dynamic(&self, request: &FetchRequest, response: &FetchResponse) {
        match self.caches.open(&self.config.dynamic_cache).await {
            Ok(store) => store.put(request.cache_key(), CachedResponse::from_response(response)),
            Err(err) => warn!(
                target = "satam_edge::worker::fetch",
                url = %request.url(),
                store = %self.config.dynamic_cache,
                error = %err,
                "failed to cache response"
            ),
        }
    }

    pub async fn handle_message(&self, message: ControlMessage) {
        match message {
            ControlMessage::SkipWaiting => {
                info!(
                    target = "satam_edge::worker::message",
                    worker = %self.id,
                    "skip waiting requested"
                );
                self.skip_waiting();
            }
            ControlMessage::GetVersion { reply: Some(reply) } => {
                if reply.send(self.version().to_string()).is_err() {
                    debug!(
                        target = "satam_edge::worker::message",
                        worker = %self.id,
                        "version reply channel closed"
                    );
                }
            }
            ControlMessage::GetVersion { reply: None } => {
                debug!(
                    target = "satam_edge::worker::message",
                    worker = %self.id,
                    "version requested without a reply channel"
                );
            }
            ControlMessage::Unknown => {}
        }
    }
}
