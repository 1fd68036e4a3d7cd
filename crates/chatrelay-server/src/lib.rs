//! # chatrelay-server
//!
//! Axum server relaying streamed completions to browser clients.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`websocket`] | `/ws` upgrade, session registry, per-session relay loop |
//! | [`http`] | `/query` one-shot bridge, homepage, health |
//! | [`server`] | Router assembly, listener, graceful shutdown |
//! | [`metrics`] | Prometheus recorder and metric names |
//! | [`state`] | Shared handler state |
//! | [`errors`] | Client-facing error responses |

#![deny(unsafe_code)]

pub mod errors;
pub mod http;
pub mod metrics;
pub mod server;
pub mod state;
pub mod websocket;

pub use errors::RelayError;
pub use server::{bind, build_router, serve, shutdown_signal};
pub use state::AppState;
