use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use bytes::Bytes;
use dashmap::DashMap;
use metrics::counter;
use time::OffsetDateTime;

use crate::domain::FetchResponse;

/// A stored response: status, headers and the full body.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub stored_at: OffsetDateTime,
}

impl CachedResponse {
    pub fn from_response(response: &FetchResponse) -> Self {
        Self {
            status: response.status().as_u16(),
            headers: response
                .headers()
                .iter()
                .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
                .collect(),
            body: response.body().clone(),
            stored_at: OffsetDateTime::now_utc(),
        }
    }

    /// Rebuild a response. Headers that no longer parse are skipped.
    pub fn to_response(&self) -> FetchResponse {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }
        FetchResponse::new(status, headers, self.body.clone())
    }
}

/// One named cache store.
///
/// Writes are whole-entry overwrites keyed by request URL; concurrent puts
/// for the same key settle on the last writer.
#[derive(Debug)]
pub struct CacheStore {
    name: String,
    entries: DashMap<String, CachedResponse>,
}

impl CacheStore {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn put(&self, key: impl Into<String>, response: CachedResponse) {
        self.entries.insert(key.into(), response);
        counter!("satam_edge_cache_put_total", "store" => self.name.clone()).increment(1);
    }

    /// Insert without counting as a cache write; used when restoring a snapshot.
    pub(crate) fn restore(&self, key: String, response: CachedResponse) {
        self.entries.insert(key, response);
    }

    /// Write a batch of entries that were all fetched successfully.
    pub fn put_all(&self, entries: Vec<(String, CachedResponse)>) {
        for (key, response) in entries {
            self.put(key, response);
        }
    }

    /// Stored keys in lexical order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub(crate) fn entries(&self) -> Vec<(String, CachedResponse)> {
        let mut entries: Vec<(String, CachedResponse)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::header::CONTENT_TYPE;

    use super::*;

    fn html(body: &'static str) -> FetchResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        FetchResponse::new(StatusCode::OK, headers, body)
    }

    #[test]
    fn cached_response_roundtrip_keeps_status_headers_and_body() {
        let cached = CachedResponse::from_response(&html("<h1>Jadwal</h1>"));
        let rebuilt = cached.to_response();
        assert_eq!(rebuilt.status(), StatusCode::OK);
        assert_eq!(rebuilt.content_type(), Some("text/html"));
        assert_eq!(rebuilt.body(), &Bytes::from_static(b"<h1>Jadwal</h1>"));
    }

    #[test]
    fn put_overwrites_existing_entry() {
        let store = CacheStore::new("satam-kahiji-v2");
        store.put("https://portal.test/", CachedResponse::from_response(&html("one")));
        store.put("https://portal.test/", CachedResponse::from_response(&html("two")));

        assert_eq!(store.len(), 1);
        let cached = store.get("https://portal.test/").expect("entry");
        assert_eq!(cached.body, Bytes::from_static(b"two"));
    }
}
