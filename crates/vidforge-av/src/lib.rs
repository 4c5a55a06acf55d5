//! # vidforge-av
//!
//! The boundary between vidforge and the external encoder.
//!
//! This crate provides functionality for:
//! - Locating the encoder binary ([`tools`])
//! - Running it as a cancellable child process with an optional deadline
//!   ([`EncoderCommand`])
//! - Describing what the user asked for ([`ConversionOptions`])
//! - Turning those options into the fixed MP4 delivery profile
//!   ([`transcode`])
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use vidforge_av::{transcode, ConversionOptions};
//!
//! # async fn example() -> vidforge_av::Result<()> {
//! let ffmpeg = vidforge_av::locate_encoder(None)?;
//! let options = ConversionOptions::from_form(Some("low"), Some("720p"));
//! transcode(&ffmpeg, Path::new("in.mkv"), Path::new("out.mp4"), &options, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
mod error;
pub mod options;
pub mod tools;
pub mod transcode;

// Re-exports
pub use command::{EncoderCommand, ToolOutput};
pub use error::{Error, Result};
pub use options::{CompressionLevel, ConversionOptions, TargetResolution};
pub use tools::{check_encoder, locate_encoder, EncoderInfo, FFMPEG};
pub use transcode::{mp4_profile_args, transcode};
