#![deny(unused)]
//! Provider adapters for the kiosk gateway.
//!
//! One adapter per backend, each translating a normalized prompt into the
//! provider's wire format and the provider's reply into plain text. All
//! adapters present the same contract: one outbound call, no retries, typed
//! errors (`Unavailable`, `RateLimited`, `InvalidResponse`, `Timeout`).

pub mod anthropic;
pub mod cohere;
pub mod google;
mod http;
pub mod huggingface;
pub mod mistral;
pub mod ollama;
pub mod openai;
pub mod registry;
pub mod replicate;

pub use registry::AdapterRegistry;
