//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which builds a full [`AppContext`] over a
//! scratch storage root and a stub encoder script, and serves it on a random
//! port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use vidforge::config::Config;
use vidforge::server::{create_router, AppContext};

/// Encoder that copies its input to the output path (last argument).
pub const COPY_ENCODER: &str = "for last; do :; done\ncp \"$2\" \"$last\"";

/// Encoder that writes a partial output, complains, and fails.
pub const FAILING_ENCODER: &str =
    "for last; do :; done\necho partial > \"$last\"\necho 'Invalid data found when processing input' >&2\nexit 1";

/// Encoder that never finishes on its own.
pub const HANGING_ENCODER: &str = "for last; do :; done\necho partial > \"$last\"\nsleep 30";

/// Boundary used by hand-written multipart bodies.
pub const RAW_BOUNDARY: &str = "vidforge-raw-boundary";

/// A running server over a throwaway storage root.
pub struct TestHarness {
    pub ctx: AppContext,
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    root: TempDir,
}

impl TestHarness {
    /// Serve with default limits and an encoder that copies its input.
    pub async fn new() -> Self {
        Self::with_encoder(COPY_ENCODER, |_| {}).await
    }

    /// Serve with a custom encoder script body and config tweaks.
    pub async fn with_encoder(script: &str, tweak: impl FnOnce(&mut Config)) -> Self {
        let root = tempfile::tempdir().expect("failed to create temp dir");
        let encoder = write_script(root.path(), "encoder.sh", script);

        let mut config = Config::default();
        config.server.host = "127.0.0.1".into();
        config.server.static_dir = root.path().join("static");
        config.storage.upload_dir = root.path().join("uploads");
        config.storage.output_dir = root.path().join("converted");
        config.encoder.program = Some(encoder);
        config.encoder.max_concurrent = 4;
        tweak(&mut config);

        let ctx = AppContext::new(config).expect("failed to build context");
        let app = create_router(ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .ok();
        });

        Self {
            ctx,
            addr,
            client: reqwest::Client::new(),
            root,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.ctx.upload_dir().to_path_buf()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.ctx.output_dir().to_path_buf()
    }

    /// POST a file to `/upload` with optional form options.
    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        options: &[(&str, &str)],
    ) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let mut form = reqwest::multipart::Form::new();
        for (key, value) in options {
            form = form.text(key.to_string(), value.to_string());
        }
        form = form.part("videoFile", part);

        self.client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await
            .expect("upload request failed")
    }

    /// Open a connection and send only the head of an upload request.
    ///
    /// The body is left to the caller, so tests control exactly how much of
    /// it the server ever sees.
    pub async fn raw_upload_head(&self, content_length: u64) -> TcpStream {
        let mut stream = TcpStream::connect(self.addr)
            .await
            .expect("failed to connect");
        let head = format!(
            "POST /upload HTTP/1.1\r\n\
             Host: {}\r\n\
             Content-Type: multipart/form-data; boundary={}\r\n\
             Content-Length: {}\r\n\r\n",
            self.addr, RAW_BOUNDARY, content_length
        );
        stream
            .write_all(head.as_bytes())
            .await
            .expect("failed to write request head");
        stream
    }

    pub async fn download(&self, name: &str) -> reqwest::Response {
        self.client
            .get(self.url(&format!("/download/{}", name)))
            .send()
            .await
            .expect("download request failed")
    }
}

/// Multipart preamble that opens the video part for `file_name`.
pub fn file_part_header(file_name: &str) -> String {
    format!(
        "--{}\r\n\
         Content-Disposition: form-data; name=\"videoFile\"; filename=\"{}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n",
        RAW_BOUNDARY, file_name
    )
}

/// Read a raw HTTP response up to the end of its head and return the status.
pub async fn read_status(stream: &mut TcpStream) -> u16 {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let read = async {
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut chunk).await.expect("failed to read response");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .expect("no response from server");

    let text = String::from_utf8_lossy(&buf);
    text.split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("malformed status line")
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn eventually(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Regular files directly inside `dir`.
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("failed to write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to chmod script");
    path
}

#[cfg(not(unix))]
pub fn write_script(dir: &Path, name: &str, _body: &str) -> PathBuf {
    dir.join(name)
}
