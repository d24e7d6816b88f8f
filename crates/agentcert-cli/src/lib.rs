//! # agentcert-cli
//!
//! Command-line front end for issuing a self-signed TLS identity certificate
//! for the local host.
//!
//! ## Behavior
//!
//! - **One-shot**: parses arguments, issues the certificate, exits.
//! - **Host defaults**: hostname and domain fall back to system values when
//!   not passed.
//! - **Idempotent**: an existing, still-valid certificate is left alone
//!   unless `--force` is given.
//! - **Config file**: optional TOML defaults under the user config dir.

pub mod cli;
pub mod config;
pub mod hostinfo;

pub use cli::run;
