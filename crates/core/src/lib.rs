#![deny(unused)]
//! Core types, traits, and error definitions for the kiosk gateway.
//!
//! This crate provides the foundational building blocks shared by the
//! provider adapters, the gateway facade, and the calling surfaces.

pub mod config;
pub mod error;
pub mod mocks;
pub mod traits;
pub mod types;

pub use error::{Error, ProviderError, ProviderErrorKind, ProviderFailure, Result};
pub use traits::*;
pub use types::*;
