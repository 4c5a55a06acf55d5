//! Filename utilities: the allowed video extensions and sanitization of
//! client-supplied names.
//!
//! Uploads are accepted by extension only; the contents are never sniffed.
//! Sanitization is shared by the upload and download paths so that a name
//! produced by one is always accepted unchanged by the other.

use crate::{Error, Result};

/// Default list of accepted video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "wmv", "flv", "mkv", "webm", "mpeg", "mpg", "m4v",
];

/// Get the default list of video file extensions.
#[must_use]
pub fn video_extensions() -> &'static [&'static str] {
    VIDEO_EXTENSIONS
}

/// Lowercased text after the last `.` of a file name.
///
/// Returns `None` when the name has no dot at all. A trailing dot yields an
/// empty extension, which no allow-list contains.
///
/// ```
/// use vidforge_common::paths::file_extension;
///
/// assert_eq!(file_extension("clip.final.MOV").as_deref(), Some("mov"));
/// assert_eq!(file_extension("clip"), None);
/// ```
pub fn file_extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Check a file name against an explicit allow-list, case-insensitively.
pub fn has_allowed_extension<S: AsRef<str>>(file_name: &str, allowed: &[S]) -> bool {
    match file_extension(file_name) {
        Some(ext) if !ext.is_empty() => allowed
            .iter()
            .any(|candidate| candidate.as_ref().eq_ignore_ascii_case(&ext)),
        _ => false,
    }
}

/// Reduce a client-supplied name to a single safe path component.
///
/// Path separators, reserved and control characters are removed, whitespace
/// becomes `_`, and leading dots are stripped so the result can never name a
/// parent directory or a hidden file.
///
/// ```
/// use vidforge_common::paths::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("my clip.mp4"), "my_clip.mp4");
/// assert_eq!(sanitize_file_name("..\\..\\boot.ini"), "boot.ini");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    let options = sanitize_filename::Options {
        windows: true,
        truncate: true,
        replacement: "",
    };

    let cleaned = sanitize_filename::sanitize_with_options(name, options);
    cleaned
        .trim()
        .trim_start_matches('.')
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Accept `name` only if sanitization would leave it unchanged.
///
/// Unlike [`sanitize_file_name`] this never corrects a name, so a request
/// for `../x` is refused rather than quietly turned into `x`.
///
/// ```
/// use vidforge_common::paths::require_safe_name;
///
/// assert!(require_safe_name("clip.mp4").is_ok());
/// assert!(require_safe_name("../clip.mp4").is_err());
/// ```
pub fn require_safe_name(name: &str) -> Result<&str> {
    let sanitized = sanitize_file_name(name);
    if sanitized.is_empty() || sanitized != name {
        return Err(Error::invalid_input(format!("unsafe file name {:?}", name)));
    }
    Ok(name)
}
