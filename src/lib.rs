//! # getwork-gateway
//!
//! HTTP gateway bridging legacy pull-based getwork mining clients to a
//! push-based upstream pool session layer.
//!
//! Miners poll over plain HTTP with Basic authentication; upstream, work
//! arrives as push notifications on per-worker pool sessions. This crate
//! reconstructs session continuity per remote address, re-authorizes every
//! request, and turns push notifications into long-poll wakeups.
//!
//! ## Architecture
//!
//! ```text
//! Miners (HTTP getwork, long-poll)
//!     │
//!     ├── Request Dispatcher (api/)
//!     │
//!     ├── ConnectionRegistry ── WorkerConnection (domain/)
//!     │                              │
//!     └── PoolManager ───────── PoolSession (manager/)
//!                                    │
//!                               upstream pool
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod manager;
