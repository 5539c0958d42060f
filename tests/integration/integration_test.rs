//! Retouch integration tests
//!
//! Gemini client against a local wiremock server, and editor session workflows
//! end to end through the gateway.

#![allow(dead_code)]

mod common;
mod gemini;
mod session;
