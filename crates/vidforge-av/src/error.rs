//! Error types for vidforge-av.

use std::time::Duration;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the external encoder.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// The tool exists but the process could not be started.
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and exited unsuccessfully.
    #[error("tool execution failed: {tool} exited with {}", describe_code(*.code))]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The tool did not finish before its deadline and was killed.
    #[error("{tool} timed out after {timeout:?}")]
    TimedOut { tool: String, timeout: Duration },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool execution failed error.
    pub fn tool_failed(tool: impl Into<String>, code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Diagnostic output captured from a failed tool run, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::ToolFailed { stderr, .. } => Some(stderr.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_failed_message_omits_stderr() {
        let err = Error::tool_failed("ffmpeg", Some(1), "Invalid data found when processing input");
        assert_eq!(err.to_string(), "tool execution failed: ffmpeg exited with status 1");
        assert_eq!(err.diagnostics(), Some("Invalid data found when processing input"));
    }

    #[test]
    fn signal_exit_is_described() {
        let err = Error::tool_failed("ffmpeg", None, "");
        assert!(err.to_string().contains("terminated by signal"));
    }

    #[test]
    fn timeout_message() {
        let err = Error::TimedOut {
            tool: "ffmpeg".into(),
            timeout: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "ffmpeg timed out after 5s");
        assert!(err.diagnostics().is_none());
    }
}
