//! Cache storage for the edge worker.
//!
//! Mirrors the browser cache-storage model: a set of named stores, each
//! mapping a request URL to a full response. Store names embed a generation
//! suffix (`-v2`) so a whole release can be purged at once on activation.
//!
//! Storage lives in memory for the lifetime of the process and can be
//! carried across restarts through a JSON snapshot:
//!
//! ```toml
//! [cache]
//! snapshot_path = "/var/lib/satam-edge/caches.json"
//! ```

mod error;
mod lock;
mod snapshot;
mod storage;
mod store;

pub use error::CacheError;
pub use storage::{CacheStorage, StoreInfo};
pub use store::{CacheStore, CachedResponse};

pub(crate) use lock::{rw_read, rw_write};
