#![deny(unused)]
//! Kiosk gateway: cache, fallback sequencing, sessions, and the HTTP surface.

pub mod cache;
pub mod gateway;
pub mod sequencer;
pub mod server;
pub mod sessions;

pub use cache::{CacheStats, LruResponseCache};
pub use gateway::ModelGateway;
pub use sequencer::FallbackSequencer;
pub use server::{AppState, KioskServer, ServerOptions};
pub use sessions::InMemorySessionStore;
