//! `POST /upload`: receive a video, convert it, answer with a download name.
//!
//! Stages: admitted (rate limiter already passed) → validated → saved →
//! converting → succeeded or failed. The input temp file never outlives
//! the request; the output does only on success.

use axum::{
    extract::{multipart::Field, Multipart, State},
    http::{header, HeaderMap},
    Json,
};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use vidforge_av::ConversionOptions;
use vidforge_common::ResultToken;

use super::error::ApiError;
use super::AppContext;
use crate::files::TrackedFile;
use crate::validate::{FilePart, UploadMetadata, ValidatedUpload, ValidationError};

/// Multipart field carrying the video.
pub const FILE_FIELD: &str = "videoFile";
const COMPRESSION_FIELD: &str = "compression";
const RESOLUTION_FIELD: &str = "resolution";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Name to pass to `GET /download/{filename}`
    pub filename: String,
}

struct SavedUpload {
    token: ResultToken,
    input: TrackedFile,
    validated: ValidatedUpload,
}

pub async fn upload(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    tracing::info!(stage = "admitted", "Upload admitted");

    // A body declared too big is refused before any part is read
    if let Some(declared) = content_length(&headers) {
        ctx.validator.check_request_size(declared)?;
    }

    let mut saved: Option<SavedUpload> = None;
    let mut compression: Option<String> = None;
    let mut resolution: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FILE_FIELD if saved.is_none() => {
                let meta = UploadMetadata {
                    file: Some(FilePart {
                        file_name: field.file_name(),
                    }),
                    content_length: declared_length(&field),
                };
                let validated = ctx.validator.validate(&meta)?;
                let token = ResultToken::new();
                tracing::info!(
                    stage = "validated",
                    token = %token,
                    name = %validated.sanitized_name,
                    "Upload validated"
                );

                let input = save_field(&ctx, field, &token, &validated.extension).await?;
                saved = Some(SavedUpload {
                    token,
                    input,
                    validated,
                });
            }
            COMPRESSION_FIELD => compression = Some(field.text().await?),
            RESOLUTION_FIELD => resolution = Some(field.text().await?),
            _ => {}
        }
    }

    let SavedUpload {
        token,
        input,
        validated,
    } = saved.ok_or(ValidationError::MissingFile)?;

    let options = ConversionOptions::from_form(compression.as_deref(), resolution.as_deref());
    tracing::info!(
        stage = "converting",
        token = %token,
        source = %validated.sanitized_name,
        compression = %options.compression,
        resolution = %options.resolution,
        "Conversion queued"
    );

    let result = ctx.supervisor.convert(input.path(), &token, &options).await;

    match result {
        Ok(output) => {
            input.consume().await;
            let filename = token.output_file_name();
            output.hand_off();
            tracing::info!(stage = "succeeded", token = %token, "Output ready for download");
            Ok(Json(UploadResponse { filename }))
        }
        Err(e) => {
            input.release().await;
            tracing::warn!(stage = "failed", token = %token, error = %e, "Upload failed");
            Err(e.into())
        }
    }
}

/// Stream one file field to a reserved input path.
///
/// The running size is checked on every chunk so an oversize body is cut
/// off without buffering it. Any error drops the guard, which deletes
/// whatever was written.
async fn save_field(
    ctx: &AppContext,
    mut field: Field<'_>,
    token: &ResultToken,
    extension: &str,
) -> Result<TrackedFile, ApiError> {
    let mut input = ctx.registry.reserve_for(ctx.upload_dir(), token, extension);
    let mut file = tokio::fs::File::create(input.path()).await?;

    let mut written: u64 = 0;
    while let Some(chunk) = field.chunk().await? {
        written += chunk.len() as u64;
        ctx.validator.check_size(written)?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    input.mark_populated();
    tracing::info!(stage = "saved", token = %token, bytes = written, "Upload saved");
    Ok(input)
}

fn declared_length(field: &Field<'_>) -> Option<u64> {
    content_length(field.headers())
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}
