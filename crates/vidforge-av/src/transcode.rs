//! The fixed MP4 delivery profile.
//!
//! Every conversion produces H.264 video and AAC audio in an MP4 container
//! with the index moved to the front for progressive playback. Only the
//! quality preset and the optional height lock vary per job.

use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use crate::command::{EncoderCommand, ToolOutput};
use crate::options::ConversionOptions;
use crate::Result;

const VIDEO_CODEC: &str = "libx264";
const VIDEO_PRESET: &str = "medium";
const AUDIO_CODEC: &str = "aac";
const AUDIO_BITRATE: &str = "128k";

/// Build the encoder argument list for one conversion.
///
/// Argument order is input, quality, scaling, fixed output encoding flags,
/// then the output path last.
pub fn mp4_profile_args(input: &Path, output: &Path, options: &ConversionOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-i".into(), input.into()];

    args.push("-crf".into());
    args.push(options.compression.crf().to_string().into());

    if let Some(filter) = options.resolution.scale_filter() {
        args.push("-vf".into());
        args.push(filter.into());
    }

    for flag in [
        "-codec:v",
        VIDEO_CODEC,
        "-preset",
        VIDEO_PRESET,
        "-codec:a",
        AUDIO_CODEC,
        "-b:a",
        AUDIO_BITRATE,
        "-movflags",
        "+faststart",
        "-y",
        "-hide_banner",
        "-loglevel",
        "error",
    ] {
        args.push(flag.into());
    }

    args.push(output.into());
    args
}

/// Transcode `input` into `output` with the MP4 profile.
///
/// Runs the encoder at `program` and waits for it, up to `timeout` if given.
pub async fn transcode(
    program: &Path,
    input: &Path,
    output: &Path,
    options: &ConversionOptions,
    timeout: Option<Duration>,
) -> Result<ToolOutput> {
    let args = mp4_profile_args(input, output, options);
    tracing::debug!(
        program = %program.display(),
        args = ?args,
        "Invoking encoder"
    );

    let mut command = EncoderCommand::new(program.to_path_buf());
    command.args(&args).timeout(timeout);
    command.execute().await
}
