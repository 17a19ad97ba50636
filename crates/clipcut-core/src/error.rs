// crates/clipcut-core/src/error.rs
//
// Error taxonomy shared by every crate in the workspace.
//
// Engine adapters report opaque failures (anyhow in clipcut-media); the engine
// session maps those into the variants below at its boundary, so everything
// the UI sees is one of these.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractError {
    /// No usable engine API variant is present (library missing or blocked).
    #[error("transcoding engine library not found")]
    EngineUnavailable,

    #[error("engine loading timeout ({}min)", .0.as_secs() / 60)]
    EngineLoadTimeout(Duration),

    #[error("engine failed to load: {0}")]
    EngineLoadFailure(String),

    #[error("engine session has been terminated")]
    SessionTerminated,

    #[error("engine is not ready")]
    NotReady,

    #[error("not a video file (type '{0}')")]
    InvalidFile(String),

    #[error("no video file selected")]
    NoFileSelected,

    #[error("invalid time range {start}s–{end}s for a {duration}s source")]
    InvalidRange { start: f64, end: f64, duration: f64 },

    #[error("output file is empty or does not exist")]
    EmptyOutput,

    #[error("ffmpeg execution failed: {0}")]
    ExecutionFailure(String),

    #[error("failed to create a blob handle")]
    HandleExhaustion,

    #[error("download failed after {attempts} attempts: {reason}")]
    DownloadFailure { attempts: u32, reason: String },

    #[error("file error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ExtractError {
    fn from(e: std::io::Error) -> Self {
        ExtractError::Io(e.to_string())
    }
}

impl ExtractError {
    /// Coarse bucket used for the user-facing "Conversion failed: …" line.
    /// Execution failures are classified on the engine's own message, not on
    /// this error's display text.
    pub fn category(&self) -> FailureCategory {
        match self {
            ExtractError::EngineUnavailable
            | ExtractError::EngineLoadTimeout(_)
            | ExtractError::EngineLoadFailure(_)
            | ExtractError::SessionTerminated
            | ExtractError::NotReady => FailureCategory::Engine,
            ExtractError::InvalidFile(_)
            | ExtractError::NoFileSelected
            | ExtractError::EmptyOutput
            | ExtractError::Io(_) => FailureCategory::File,
            ExtractError::InvalidRange { .. } => FailureCategory::Format,
            ExtractError::ExecutionFailure(msg) => FailureCategory::classify(msg),
            ExtractError::HandleExhaustion
            | ExtractError::DownloadFailure { .. } => FailureCategory::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureCategory {
    Engine,
    File,
    Format,
    Unknown,
}

impl FailureCategory {
    /// Classify a raw engine message by keyword. Checked in this order, so a
    /// message mentioning both "ffmpeg" and "file" is an engine error.
    pub fn classify(message: &str) -> Self {
        let m = message.to_ascii_lowercase();
        if m.contains("ffmpeg") || m.contains("engine") {
            FailureCategory::Engine
        } else if m.contains("file") {
            FailureCategory::File
        } else if m.contains("format") {
            FailureCategory::Format
        } else {
            FailureCategory::Unknown
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FailureCategory::Engine  => "FFmpeg execution error",
            FailureCategory::File    => "File processing error",
            FailureCategory::Format  => "Format not supported",
            FailureCategory::Unknown => "Unknown error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_follows_keyword_priority() {
        assert_eq!(FailureCategory::classify("ffmpeg exited with file error"), FailureCategory::Engine);
        assert_eq!(FailureCategory::classify("Unable to read output file"), FailureCategory::File);
        assert_eq!(FailureCategory::classify("Invalid data / unknown format"), FailureCategory::Format);
        assert_eq!(FailureCategory::classify("boom"), FailureCategory::Unknown);
    }

    #[test]
    fn timeout_message_mentions_minutes() {
        let e = ExtractError::EngineLoadTimeout(Duration::from_secs(300));
        assert_eq!(e.to_string(), "engine loading timeout (5min)");
        assert_eq!(e.category(), FailureCategory::Engine);
    }

    #[test]
    fn empty_output_is_a_file_problem() {
        assert_eq!(ExtractError::EmptyOutput.category(), FailureCategory::File);
    }

    #[test]
    fn execution_failures_classify_the_engine_message() {
        let format = ExtractError::ExecutionFailure("Unsupported audio format".into());
        assert_eq!(format.category(), FailureCategory::Format);
        let file = ExtractError::ExecutionFailure("No such file or directory".into());
        assert_eq!(file.category(), FailureCategory::File);
        // The display prefix alone would read as an engine failure.
        assert_eq!(FailureCategory::classify(&format.to_string()), FailureCategory::Engine);
    }
}
