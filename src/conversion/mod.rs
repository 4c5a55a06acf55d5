//! Conversion supervision.
//!
//! Wraps the encoder from `vidforge-av` with what the request pipeline
//! needs: a concurrency cap, the output temp file, and a translation of tool
//! failures into [`ConversionError`] kinds. Conversions are never retried.

mod supervisor;

pub use supervisor::{ConversionError, ConversionSupervisor};
pub use vidforge_av::{CompressionLevel, ConversionOptions, TargetResolution};
