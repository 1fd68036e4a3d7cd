//! WebSocket sessions: upgrade, registry, and relay.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `connection` | WebSocket upgrade, per-connection read/write loops |
//! | `registry` | Session membership and directed sends |
//! | `relay` | Per-session turn loop: inbound message → upstream stream → fragments |
//!
//! ## Data Flow
//!
//! `connection` reader → inbound queue → `relay` → `registry::send` →
//! outbound queue → `connection` writer.

pub mod connection;
pub mod registry;
pub mod relay;
