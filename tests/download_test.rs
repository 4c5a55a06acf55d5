//! Integration tests for `GET /download/{filename}`.
#![cfg(unix)]

mod common;

use std::path::Path;
use std::time::Duration;

use common::{files_in, TestHarness};
use vidforge::files::INFLIGHT_DIR;

async fn upload_ok(h: &TestHarness, bytes: &[u8]) -> String {
    let resp = h.upload("source.mp4", bytes.to_vec(), &[]).await;
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    json["filename"].as_str().unwrap().to_string()
}

/// Deletion happens as the server finishes the body, which can trail the
/// client seeing the last byte.
async fn wait_until_gone(path: &Path) -> bool {
    for _ in 0..50 {
        if !path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn token_downloads_exactly_once() {
    let h = TestHarness::new().await;
    let payload = b"not really a video, but the stub encoder copies it".to_vec();
    let name = upload_ok(&h, &payload).await;

    let resp = h.download(&name).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "video/mp4");
    let disposition = resp.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains(&name));
    assert_eq!(resp.bytes().await.unwrap().as_ref(), payload.as_slice());

    assert!(wait_until_gone(&h.output_dir().join(&name)).await);
    let inflight = h.output_dir().join(INFLIGHT_DIR);
    for _ in 0..50 {
        if files_in(&inflight).is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(files_in(&inflight).is_empty());

    let again = h.download(&name).await;
    assert_eq!(again.status(), 404);
    let json: serde_json::Value = again.json().await.unwrap();
    assert_eq!(json["error"], "File not found");
}

#[tokio::test]
async fn unknown_name_is_404() {
    let h = TestHarness::new().await;
    let resp = h.download("00000000-0000-0000-0000-000000000000.mp4").await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn traversal_names_are_rejected() {
    let h = TestHarness::new().await;
    let secret = h.root().join("secret");
    std::fs::write(&secret, b"top secret").unwrap();

    for name in ["..%2Fsecret", "%2E%2E%2Fsecret", "..%5C..%5Csecret", ".hidden.mp4", "a%20b.mp4"] {
        let resp = h.download(name).await;
        assert_eq!(resp.status(), 400, "name {name} was not rejected");
    }

    assert_eq!(std::fs::read(&secret).unwrap(), b"top secret");
}

#[tokio::test]
async fn directories_are_not_served() {
    let h = TestHarness::new().await;
    std::fs::create_dir(h.output_dir().join("folder.mp4")).unwrap();
    let resp = h.download("folder.mp4").await;
    assert_eq!(resp.status(), 404);
    assert!(h.output_dir().join("folder.mp4").is_dir());
}

#[tokio::test]
async fn symlinks_are_not_followed() {
    let h = TestHarness::new().await;
    let secret = h.root().join("secret.mp4");
    std::fs::write(&secret, b"top secret").unwrap();
    std::os::unix::fs::symlink(&secret, h.output_dir().join("link.mp4")).unwrap();

    let resp = h.download("link.mp4").await;
    assert_eq!(resp.status(), 404);
    assert!(secret.exists());
}

#[tokio::test]
async fn racing_downloads_serve_once() {
    let h = TestHarness::new().await;
    let name = upload_ok(&h, b"race me").await;

    let (a, b, c) = tokio::join!(h.download(&name), h.download(&name), h.download(&name));
    let statuses: Vec<u16> = [a, b, c].iter().map(|r| r.status().as_u16()).collect();

    assert_eq!(statuses.iter().filter(|s| **s == 200).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == 404).count(), 2);
}

#[tokio::test]
async fn download_is_not_rate_limited() {
    let h = TestHarness::with_encoder(common::COPY_ENCODER, |c| c.rate_limit.requests = 1).await;
    for _ in 0..5 {
        let resp = h.download("missing.mp4").await;
        assert_eq!(resp.status(), 404);
    }
}
