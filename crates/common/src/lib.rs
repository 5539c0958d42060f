//! Shared configuration and error handling for Retouch
//!
//! This crate provides functionality used across the Retouch workspace:
//! - Runtime configuration following 12-factor principles
//! - The operation error taxonomy surfaced to users

pub mod config;
pub mod error;

pub use config::{Config, LogFormat};
pub use error::{Error, Result};
