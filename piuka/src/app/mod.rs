//! Engine bootstrap and lifecycle management.
//!
//! [`Engine`] wires the transport, queue, slot pool, dispatcher, status store
//! and memory cache together from an [`EngineConfig`], and tears them down on
//! shutdown.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            Engine                                │
//! │                                                                  │
//! │  EngineConfig ──► ReqwestTransport (proxies)                     │
//! │                                                                  │
//! │  add() ─────────► TaskQueue ──► Dispatcher ──► Worker × N        │
//! │                                                  │               │
//! │  status()/wait() ◄──────────── StatusStore ◄─────┤               │
//! │  cached() ◄─────────────────── MemoryCache ◄─────┘               │
//! │                                                                  │
//! │  shutdown() ──► CancellationToken ──► dispatcher + workers       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod engine;
mod error;

pub use config::{
    default_workers, EngineConfig, DEFAULT_FLUSH_THRESHOLD, DEFAULT_TIMEOUT, FALLBACK_WORKERS,
};
pub use engine::Engine;
pub use error::{ConfigError, EngineError, SubmitError};
