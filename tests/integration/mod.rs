//! Integration test suite for relsync
//!
//! End-to-end tests against a mock release index (wiremock) with archives
//! built on the fly.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **pipeline**: full cycles, idempotence, overlay and recovery behavior
//! - **safety**: hostile and malformed archives never touch the destination
//! - **network**: release lookup, asset selection, HTTP failure classification
//! - **scheduler**: once and looping modes
//! - **cli**: the `relsync` binary

#[path = "../common/mod.rs"]
mod common;

mod cli;
mod pipeline;
mod scheduler;
