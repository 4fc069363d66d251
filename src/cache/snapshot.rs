//! JSON snapshot of cache storage.
//!
//! Lets stores written by one process generation survive a restart, so the
//! next activation sees (and purges) stores from older releases.

use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use super::{CacheError, CacheStorage, CacheStore, CachedResponse};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    written_at: i64,
    stores: Vec<SnapshotStore>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotStore {
    name: String,
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    key: String,
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
    stored_at: i64,
}

impl CacheStorage {
    /// Load storage from `path`. A missing file yields empty storage.
    pub async fn load_snapshot(path: &Path) -> Result<Self, CacheError> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    target = "satam_edge::cache::snapshot",
                    path = %path.display(),
                    "No cache snapshot found, starting empty"
                );
                return Ok(Self::new());
            }
            Err(err) => return Err(CacheError::snapshot_io(path, err)),
        };

        let file: SnapshotFile = serde_json::from_slice(&raw)
            .map_err(|err| CacheError::snapshot_format(path, err.to_string()))?;
        if file.version != SNAPSHOT_VERSION {
            return Err(CacheError::snapshot_format(
                path,
                format!("unsupported snapshot version {}", file.version),
            ));
        }

        let mut stores = Vec::with_capacity(file.stores.len());
        for snapshot_store in file.stores {
            let store = CacheStore::new(snapshot_store.name);
            for entry in snapshot_store.entries {
                let body = STANDARD
                    .decode(entry.body.as_bytes())
                    .map_err(|err| CacheError::snapshot_format(path, err.to_string()))?;
                let stored_at = OffsetDateTime::from_unix_timestamp(entry.stored_at)
                    .map_err(|err| CacheError::snapshot_format(path, err.to_string()))?;
                store.restore(
                    entry.key,
                    CachedResponse {
                        status: entry.status,
                        headers: entry.headers,
                        body: Bytes::from(body),
                        stored_at,
                    },
                );
            }
            stores.push(store);
        }

        info!(
            target = "satam_edge::cache::snapshot",
            path = %path.display(),
            stores = stores.len(),
            "Loaded cache snapshot"
        );
        Ok(Self::from_stores(stores))
    }

    /// Write storage to `path`, replacing any previous snapshot atomically.
    pub async fn write_snapshot(&self, path: &Path) -> Result<(), CacheError> {
        let stores = self
            .stores()
            .iter()
            .map(|store| SnapshotStore {
                name: store.name().to_string(),
                entries: store
                    .entries()
                    .into_iter()
                    .map(|(key, cached)| SnapshotEntry {
                        key,
                        status: cached.status,
                        headers: cached.headers,
                        body: STANDARD.encode(&cached.body),
                        stored_at: cached.stored_at.unix_timestamp(),
                    })
                    .collect(),
            })
            .collect();

        let file = SnapshotFile {
            version: SNAPSHOT_VERSION,
            written_at: OffsetDateTime::now_utc().unix_timestamp(),
            stores,
        };
        let encoded = serde_json::to_vec(&file)
            .map_err(|err| CacheError::snapshot_format(path, err.to_string()))?;

        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, encoded)
            .await
            .map_err(|err| CacheError::snapshot_io(&staging, err))?;
        tokio::fs::rename(&staging, path)
            .await
            .map_err(|err| CacheError::snapshot_io(path, err))?;

        info!(
            target = "satam_edge::cache::snapshot",
            path = %path.display(),
            stores = file.stores.len(),
            "Wrote cache snapshot"
        );
        Ok(())
    }
}
