#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE};
use satam_edge::application::ports::{Network, NetworkError};
use satam_edge::application::{WorkerConfig, WorkerRegistration};
use satam_edge::cache::CacheStorage;
use satam_edge::domain::{FetchRequest, FetchResponse};
use url::Url;

pub const ORIGIN: &str = "https://satam.sch.id";

#[derive(Debug, Clone)]
enum Scripted {
    Respond(StatusCode, Option<&'static str>, &'static str),
    Reject,
}

/// A network whose answers are set per URL. Unscripted URLs reject, like a
/// device with no connectivity.
#[derive(Debug, Default)]
pub struct ScriptedNetwork {
    script: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(
        &self,
        url: &str,
        status: StatusCode,
        content_type: Option<&'static str>,
        body: &'static str,
    ) {
        self.script
            .lock()
            .unwrap()
            .insert(url.to_string(), Scripted::Respond(status, content_type, body));
    }

    pub fn ok(&self, url: &str, content_type: &'static str, body: &'static str) {
        self.respond(url, StatusCode::OK, Some(content_type), body);
    }

    pub fn reject(&self, url: &str) {
        self.script
            .lock()
            .unwrap()
            .insert(url.to_string(), Scripted::Reject);
    }

    /// Drop every scripted answer: the device goes offline.
    pub fn go_offline(&self) {
        self.script.lock().unwrap().clear();
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|called| called.as_str() == url)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError> {
        let url = request.url().as_str().to_string();
        self.calls.lock().unwrap().push(url.clone());

        let scripted = self.script.lock().unwrap().get(&url).cloned();
        match scripted {
            Some(Scripted::Respond(status, content_type, body)) => {
                let mut headers = HeaderMap::new();
                if let Some(content_type) = content_type {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
                }
                Ok(FetchResponse::new(status, headers, body))
            }
            Some(Scripted::Reject) | None => Err(NetworkError::new(url, "connection refused")),
        }
    }
}

pub fn origin() -> Url {
    Url::parse(ORIGIN).unwrap()
}

pub fn url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

pub fn config() -> WorkerConfig {
    WorkerConfig::new(origin())
}

pub fn get(path_or_url: &str) -> FetchRequest {
    let url = if path_or_url.starts_with('/') {
        url(path_or_url)
    } else {
        path_or_url.to_string()
    };
    FetchRequest::get(Url::parse(&url).unwrap())
}

/// Script successful answers for the four default critical assets.
pub fn script_critical_assets(network: &ScriptedNetwork) {
    network.ok(&url("/build/manifest.json"), "application/json", "{}");
    network.ok(&url("/favicon.svg"), "image/svg+xml", "<svg/>");
    network.ok(&url("/favicon.ico"), "image/x-icon", "ico");
    network.ok(&url("/logo-satam.png"), "image/png", "png");
}

pub fn registration(
    storage: Arc<CacheStorage>,
    network: Arc<ScriptedNetwork>,
) -> Arc<WorkerRegistration> {
    Arc::new(WorkerRegistration::new(storage, network))
}
