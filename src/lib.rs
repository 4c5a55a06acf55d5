//! Vidforge - one-shot video conversion service
//!
//! This library crate exposes the core functionality for integration testing.

pub mod admission;
pub mod config;
pub mod conversion;
pub mod files;
pub mod server;
pub mod validate;
