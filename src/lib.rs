//! satam-edge: an offline-capable caching edge for the Satam school portal.
//!
//! The edge hosts one [`application::OfflineWorker`] generation at a time
//! and routes every proxied request through it: critical assets are
//! precached at install, stale stores are purged at activation, and each
//! request is answered network-only, cache-first or network-first depending
//! on its path.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
