//! `GET /download/{filename}`: single-use retrieval of a converted file.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use futures::future::{BoxFuture, FutureExt};
use futures::Stream;
use tokio_util::io::ReaderStream;
use vidforge_common::paths::require_safe_name;

use super::error::ApiError;
use super::AppContext;
use crate::files::TrackedFile;

const OUTPUT_CONTENT_TYPE: &str = "video/mp4";

pub async fn download(
    State(ctx): State<AppContext>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let name = require_safe_name(&filename).map_err(|e| {
        tracing::warn!(requested = %filename, error = %e, "Rejected unsafe download name");
        ApiError::InvalidName
    })?;

    let claimed = ctx
        .registry
        .claim(ctx.output_dir(), name)
        .await?
        .ok_or(ApiError::NotFound)?;

    let file = tokio::fs::File::open(claimed.path()).await?;
    let len = file.metadata().await?.len();

    tracing::info!(filename = %name, bytes = len, "Serving download");

    let body = Body::from_stream(ConsumeOnEnd::new(ReaderStream::new(file), claimed));

    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(OUTPUT_CONTENT_TYPE));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", name)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}

/// Byte stream that deletes its file once the last chunk is read.
///
/// End of stream is only reported after the delete has finished. If the
/// client goes away first the stream is dropped and the guard releases the
/// file instead.
struct ConsumeOnEnd<S> {
    inner: S,
    guard: Option<TrackedFile>,
    finishing: Option<BoxFuture<'static, ()>>,
}

impl<S> ConsumeOnEnd<S> {
    fn new(inner: S, guard: TrackedFile) -> Self {
        Self {
            inner,
            guard: Some(guard),
            finishing: None,
        }
    }
}

impl<S> Stream for ConsumeOnEnd<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(finishing) = this.finishing.as_mut() {
                ready!(finishing.poll_unpin(cx));
                this.finishing = None;
                return Poll::Ready(None);
            }

            match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                None => match this.guard.take() {
                    Some(guard) => {
                        tracing::debug!(path = %guard.path().display(), "Download complete");
                        this.finishing = Some(guard.consume().boxed());
                    }
                    None => return Poll::Ready(None),
                },
                Some(Err(e)) => {
                    if let Some(guard) = this.guard.take() {
                        tracing::warn!(path = %guard.path().display(), error = %e, "Download aborted");
                        tokio::spawn(guard.release());
                    }
                    return Poll::Ready(Some(Err(e)));
                }
                Some(Ok(bytes)) => return Poll::Ready(Some(Ok(bytes))),
            }
        }
    }
}
