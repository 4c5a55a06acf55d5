//! Vidforge-Common: Shared types and utilities.
//!
//! This crate provides common functionality used across vidforge:
//!
//! - **Typed IDs**: [`ResultToken`], the opaque handle minted per conversion
//! - **Path Utilities**: Allowed video extensions and filename sanitization
//! - **Error Handling**: The error returned when client input is refused
//!
//! # Examples
//!
//! ```
//! use vidforge_common::{ResultToken, Error, Result};
//! use vidforge_common::paths::{has_allowed_extension, require_safe_name, sanitize_file_name};
//!
//! let token = ResultToken::new();
//! assert!(token.output_file_name().ends_with(".mp4"));
//!
//! assert!(has_allowed_extension("movie.MKV", &["mkv"]));
//! assert_eq!(sanitize_file_name("../etc/passwd"), "etcpasswd");
//!
//! assert!(matches!(require_safe_name("../etc/passwd"), Err(Error::InvalidInput(_))));
//!
//! fn example() -> Result<&'static str> {
//!     require_safe_name("clip.mp4")
//! }
//! ```

pub mod error;
pub mod ids;
pub mod paths;

pub use error::{Error, Result};
pub use ids::*;
