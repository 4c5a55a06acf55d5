//! Typed ID wrappers.
//!
//! A [`ResultToken`] is minted once per conversion job. It names both temp
//! files of the job and is the handle a client presents to download the
//! converted output.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Extension of every converted output file.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Opaque, globally unique handle for one conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultToken(Uuid);

impl ResultToken {
    /// Mint a new random token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// File name of the converted output, e.g. `<token>.mp4`.
    #[must_use]
    pub fn output_file_name(&self) -> String {
        format!("{}.{}", self.0, OUTPUT_EXTENSION)
    }

    /// File name of an input temp file carrying the given extension.
    #[must_use]
    pub fn file_name_with(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }
}

impl Default for ResultToken {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ResultToken {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<ResultToken> for Uuid {
    fn from(token: ResultToken) -> Self {
        token.0
    }
}

impl std::str::FromStr for ResultToken {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl std::fmt::Display for ResultToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
