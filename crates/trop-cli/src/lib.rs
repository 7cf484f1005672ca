//! trop-cli library root.
//!
//! Re-exports internal modules so that integration tests can drive the
//! commands against an in-memory control plane without going through
//! process argument parsing or AWS configuration.

pub mod aws;
pub mod cli;
pub mod commands;
pub mod config;
