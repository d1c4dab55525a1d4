//! # Chrysalis application library
//!
//! Exposes the HTTP API, CLI, and configuration modules so integration
//! tests can drive the router without spawning a real server.

pub mod api;
pub mod cli;
pub mod config;
