//! Upload metadata checks.
//!
//! Pure logic: nothing here touches the filesystem. Only the name and the
//! declared size are looked at, never the bytes themselves.

use thiserror::Error;
use vidforge_common::paths::{file_extension, has_allowed_extension, sanitize_file_name};

/// The file part of a multipart upload, as far as validation cares.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilePart<'a> {
    pub file_name: Option<&'a str>,
}

/// Everything known about an upload before its bytes are read.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadMetadata<'a> {
    pub file: Option<FilePart<'a>>,
    pub content_length: Option<u64>,
}

/// An upload that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpload {
    /// Client filename with separators and unsafe characters removed
    pub sanitized_name: String,
    /// Lowercased extension, without the dot
    pub extension: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No file part in the request")]
    MissingFile,

    #[error("No file selected")]
    EmptyName,

    #[error("File type not allowed")]
    BadExtension,

    #[error("File exceeds the {max_bytes} byte upload limit")]
    TooLarge { size: u64, max_bytes: u64 },
}

/// Room for multipart boundaries and the small option fields on top of the
/// file itself.
pub const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Upload policy: which extensions are accepted and how big a file may be.
#[derive(Debug, Clone)]
pub struct Validator {
    allowed_extensions: Vec<String>,
    max_bytes: u64,
}

impl Validator {
    pub fn new(allowed_extensions: Vec<String>, max_bytes: u64) -> Self {
        Self {
            allowed_extensions,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Check `meta`, stopping at the first failure.
    ///
    /// Order: file part present, name non-empty, extension allowed, declared
    /// size within the limit.
    pub fn validate(&self, meta: &UploadMetadata<'_>) -> Result<ValidatedUpload, ValidationError> {
        let file = meta.file.ok_or(ValidationError::MissingFile)?;

        let name = file.file_name.map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        if !has_allowed_extension(name, &self.allowed_extensions) {
            return Err(ValidationError::BadExtension);
        }
        let extension = file_extension(name).ok_or(ValidationError::BadExtension)?;

        if let Some(size) = meta.content_length {
            self.check_size(size)?;
        }

        Ok(ValidatedUpload {
            sanitized_name: sanitize_file_name(name),
            extension,
        })
    }

    /// Largest whole request body that can still carry an allowed file.
    pub fn max_request_bytes(&self) -> u64 {
        self.max_bytes.saturating_add(MULTIPART_OVERHEAD)
    }

    /// Reject a request whose declared body length cannot fit the limit.
    ///
    /// Runs before any part is read, so nothing reaches disk.
    pub fn check_request_size(&self, declared: u64) -> Result<(), ValidationError> {
        if declared > self.max_request_bytes() {
            return Err(ValidationError::TooLarge {
                size: declared,
                max_bytes: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Check a running byte count against the limit.
    pub fn check_size(&self, size: u64) -> Result<(), ValidationError> {
        if size > self.max_bytes {
            return Err(ValidationError::TooLarge {
                size,
                max_bytes: self.max_bytes,
            });
        }
        Ok(())
    }
}
