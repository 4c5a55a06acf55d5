use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use vidforge_av::{ConversionOptions, FFMPEG};
use vidforge_common::{ResultToken, OUTPUT_EXTENSION};

use crate::config::EncoderConfig;
use crate::files::{TempFileRegistry, TrackedFile};

/// Why a conversion did not produce an output.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The encoder ran and rejected the input. Diagnostics stay server-side.
    #[error("encoding failed")]
    EncodingFailed { diagnostics: String },

    /// The encoder could not be found or started.
    #[error("encoder unavailable: {reason}")]
    ToolUnavailable { reason: String },

    /// The encoder exceeded its deadline and was killed.
    #[error("encoding timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("internal conversion error: {0}")]
    Internal(String),
}

impl From<vidforge_av::Error> for ConversionError {
    fn from(err: vidforge_av::Error) -> Self {
        use vidforge_av::Error;

        match err {
            Error::ToolFailed { stderr, .. } => Self::EncodingFailed {
                diagnostics: stderr,
            },
            Error::ToolNotFound { tool } => Self::ToolUnavailable {
                reason: format!("{tool} not found"),
            },
            err @ Error::Spawn { .. } => Self::ToolUnavailable {
                reason: err.to_string(),
            },
            Error::TimedOut { timeout, .. } => Self::Timeout { after: timeout },
            Error::Io(e) => Self::Internal(e.to_string()),
        }
    }
}

/// Runs encoder jobs, at most `max_concurrent` at a time.
#[derive(Debug, Clone)]
pub struct ConversionSupervisor {
    program: Option<PathBuf>,
    timeout: Option<Duration>,
    output_dir: PathBuf,
    registry: TempFileRegistry,
    permits: Arc<Semaphore>,
}

impl ConversionSupervisor {
    pub fn new(
        program: Option<PathBuf>,
        timeout: Option<Duration>,
        max_concurrent: usize,
        output_dir: PathBuf,
        registry: TempFileRegistry,
    ) -> Self {
        Self {
            program,
            timeout,
            output_dir,
            registry,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Build a supervisor from config, locating the encoder.
    ///
    /// A missing encoder is not fatal here; every conversion will then fail
    /// with [`ConversionError::ToolUnavailable`].
    pub fn from_config(
        config: &EncoderConfig,
        output_dir: PathBuf,
        registry: TempFileRegistry,
    ) -> Self {
        let program = match vidforge_av::locate_encoder(config.program.as_deref()) {
            Ok(path) => {
                tracing::info!(encoder = %path.display(), "Using encoder");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Encoder not found, conversions will fail");
                None
            }
        };

        Self::new(
            program,
            config.timeout(),
            config.max_concurrent,
            output_dir,
            registry,
        )
    }

    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }

    /// Conversion slots currently free.
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Convert `input` into `<token>.mp4` in the output directory.
    ///
    /// On success the returned guard owns the populated output. On any
    /// failure the output path has already been released.
    pub async fn convert(
        &self,
        input: &Path,
        token: &ResultToken,
        options: &ConversionOptions,
    ) -> Result<TrackedFile, ConversionError> {
        let program = self.program.as_deref().ok_or_else(|| ConversionError::ToolUnavailable {
            reason: format!("{FFMPEG} not found"),
        })?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ConversionError::Internal(e.to_string()))?;

        let mut output = self
            .registry
            .reserve_for(&self.output_dir, token, OUTPUT_EXTENSION);

        tracing::info!(
            token = %token,
            compression = %options.compression,
            resolution = %options.resolution,
            "Starting conversion"
        );

        let result =
            vidforge_av::transcode(program, input, output.path(), options, self.timeout).await;

        match result {
            Ok(_) => {
                output.mark_populated();
                tracing::info!(token = %token, "Conversion finished");
                Ok(output)
            }
            Err(e) => {
                let err = ConversionError::from(e);
                match &err {
                    ConversionError::EncodingFailed { diagnostics } => tracing::error!(
                        token = %token,
                        diagnostics = %diagnostics,
                        "Encoder rejected input"
                    ),
                    other => tracing::error!(token = %token, error = %other, "Conversion failed"),
                }
                output.release().await;
                Err(err)
            }
        }
    }
}
