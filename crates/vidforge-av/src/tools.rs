//! Finding the encoder and confirming it runs.
//!
//! The server and `check-tools` both go through [`locate_encoder`], so the
//! binary that gets reported is the binary that gets run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::command::EncoderCommand;
use crate::{Error, Result};

/// Name of the encoder binary looked up on `PATH`.
pub const FFMPEG: &str = "ffmpeg";

/// ffmpeg takes a single dash for its version flag.
const VERSION_ARG: &str = "-version";

/// How long a version query may take before the binary is treated as broken.
const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// A located encoder that answered a version query.
#[derive(Debug, Clone)]
pub struct EncoderInfo {
    pub path: PathBuf,
    /// First line of the version banner, e.g. `ffmpeg version 6.1.1`.
    pub version: String,
}

/// Resolve the encoder binary.
///
/// A configured path wins when it exists. Otherwise `ffmpeg` is looked up
/// on `PATH`.
pub fn locate_encoder(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        tracing::warn!(
            configured = %path.display(),
            "Configured encoder does not exist, searching PATH"
        );
    }

    which::which(FFMPEG).map_err(|_| Error::tool_not_found(FFMPEG))
}

/// Run `<path> -version` and report what answered.
pub async fn check_encoder(path: &Path) -> Result<EncoderInfo> {
    let output = EncoderCommand::new(path.to_path_buf())
        .arg(VERSION_ARG)
        .timeout(Some(VERSION_TIMEOUT))
        .execute()
        .await?;

    let version = output
        .stdout
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(EncoderInfo {
        path: path.to_path_buf(),
        version,
    })
}
