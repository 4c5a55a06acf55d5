//! User-selectable conversion options.
//!
//! Options arrive as free-form form fields. Parsing never fails: anything
//! unrecognized falls back to the default (`medium` compression, `original`
//! resolution).

use serde::{Deserialize, Serialize};
use std::fmt;

/// How aggressively to trade quality for file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Best quality, largest output.
    Low,
    /// Balanced.
    #[default]
    Medium,
    /// Smallest output, lowest quality.
    High,
}

impl CompressionLevel {
    /// Parse a form value, falling back to the default on anything unknown.
    pub fn parse_lossy(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("low") => Self::Low,
            Some("high") => Self::High,
            _ => Self::Medium,
        }
    }

    /// x264 constant rate factor for this level. Lower means higher quality.
    pub fn crf(&self) -> u8 {
        match self {
            Self::Low => 18,
            Self::Medium => 23,
            Self::High => 28,
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Output frame height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetResolution {
    /// Keep the source dimensions.
    #[default]
    #[serde(rename = "original")]
    Original,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl TargetResolution {
    /// Parse a form value, falling back to the default on anything unknown.
    pub fn parse_lossy(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("480p") => Self::P480,
            Some("720p") => Self::P720,
            Some("1080p") => Self::P1080,
            _ => Self::Original,
        }
    }

    /// Target frame height, or `None` to keep the source size.
    pub fn height(&self) -> Option<u32> {
        match self {
            Self::Original => None,
            Self::P480 => Some(480),
            Self::P720 => Some(720),
            Self::P1080 => Some(1080),
        }
    }

    /// Video filter that locks the height and keeps the width even while
    /// preserving the aspect ratio.
    pub fn scale_filter(&self) -> Option<String> {
        self.height().map(|h| format!("scale=-2:{h}"))
    }
}

impl fmt::Display for TargetResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.height() {
            Some(h) => write!(f, "{h}p"),
            None => write!(f, "original"),
        }
    }
}

/// Immutable set of options for one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConversionOptions {
    pub compression: CompressionLevel,
    pub resolution: TargetResolution,
}

impl ConversionOptions {
    pub fn new(compression: CompressionLevel, resolution: TargetResolution) -> Self {
        Self {
            compression,
            resolution,
        }
    }

    /// Build options from raw form values, coercing unknown values to defaults.
    pub fn from_form(compression: Option<&str>, resolution: Option<&str>) -> Self {
        Self::new(
            CompressionLevel::parse_lossy(compression),
            TargetResolution::parse_lossy(resolution),
        )
    }
}
