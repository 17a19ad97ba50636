// crates/clipcut-core/src/messages.rs
//
// Message vocabulary of the offload channel between the interactive context
// (clipcut-ui) and the background engine worker (clipcut-media::worker).
//
// The serde tags are the wire contract shared with the unchanged
// script/worker collaborators:
//
//   UI → worker   { "type": "init" | "convert" | "get-bitrate" | "cleanup", "data": … }
//   worker → UI   { "type": "log" | "progress" | "ffmpeg-loaded" | "conversion-complete"
//                          | "conversion-error" | "bitrate-complete" | "bitrate-error"
//                          | "cleanup-complete" | "error", …fields }
//
// `conversion-error` carries the failure category decided from the typed
// error; a peer that omits it is classified from the message text instead.
//
// In-process the buffers travel as owned values through the channel, so the
// result bytes are moved, never copied.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, FailureCategory};
use crate::job::{AudioFormat, ConversionJob, EngineConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitrateProbe {
    pub file_data: Arc<[u8]>,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WorkerRequest {
    #[serde(rename = "init")]
    Init(EngineConfig),
    #[serde(rename = "convert")]
    Convert(ConversionJob),
    #[serde(rename = "get-bitrate")]
    ProbeBitrate(BitrateProbe),
    #[serde(rename = "cleanup")]
    Cleanup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerEvent {
    #[serde(rename = "log")]
    Log { message: String },

    #[serde(rename = "progress")]
    Progress { ratio: f64 },

    #[serde(rename = "ffmpeg-loaded")]
    Ready {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error:   Option<String>,
    },

    #[serde(rename = "conversion-complete")]
    ConversionComplete {
        #[serde(rename = "outputData")]
        output_data:  Vec<u8>,
        #[serde(rename = "audioFormat")]
        audio_format: AudioFormat,
    },

    #[serde(rename = "conversion-error")]
    ConversionError {
        error:    String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<FailureCategory>,
    },

    #[serde(rename = "bitrate-complete")]
    BitrateComplete,

    #[serde(rename = "bitrate-error")]
    BitrateError { error: String },

    #[serde(rename = "cleanup-complete")]
    CleanupComplete,

    /// A failure outside any specific operation, e.g. the worker thread
    /// could not be started.
    #[serde(rename = "error")]
    Error { error: String },
}

impl WorkerEvent {
    pub fn log(message: impl Into<String>) -> Self {
        WorkerEvent::Log { message: message.into() }
    }

    /// Progress with the ratio clamped into [0, 1]; NaN reads as 0.
    pub fn progress(ratio: f64) -> Self {
        let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        WorkerEvent::Progress { ratio }
    }

    pub fn conversion_error(err: &ExtractError) -> Self {
        WorkerEvent::ConversionError { error: err.to_string(), category: Some(err.category()) }
    }

    /// Category of a failed conversion, falling back to keyword
    /// classification when the sender did not supply one.
    pub fn failure_category(&self) -> Option<FailureCategory> {
        match self {
            WorkerEvent::ConversionError { error, category } => {
                Some(category.unwrap_or_else(|| FailureCategory::classify(error)))
            }
            WorkerEvent::Error { error } => Some(FailureCategory::classify(error)),
            _ => None,
        }
    }

    /// True for the events that end an outstanding `convert`.
    pub fn ends_conversion(&self) -> bool {
        matches!(self, WorkerEvent::ConversionComplete { .. } | WorkerEvent::ConversionError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_tags_match_wire_vocabulary() {
        let v = serde_json::to_value(WorkerRequest::Cleanup).unwrap();
        assert_eq!(v["type"], "cleanup");

        let probe = WorkerRequest::ProbeBitrate(BitrateProbe {
            file_data: Arc::from(vec![0u8; 2]),
            file_name: "a.mp4".into(),
        });
        let v = serde_json::to_value(probe).unwrap();
        assert_eq!(v["type"], "get-bitrate");
        assert_eq!(v["data"]["fileName"], "a.mp4");

        let v = serde_json::to_value(WorkerRequest::Init(EngineConfig::default())).unwrap();
        assert_eq!(v["type"], "init");
        assert_eq!(v["data"]["corePath"], "ffmpeg");
    }

    #[test]
    fn events_parse_from_worker_json() {
        let e: WorkerEvent = serde_json::from_value(json!({"type": "ffmpeg-loaded", "success": true})).unwrap();
        assert_eq!(e, WorkerEvent::Ready { success: true, error: None });

        let e: WorkerEvent = serde_json::from_value(json!({"type": "progress", "ratio": 0.25})).unwrap();
        assert_eq!(e, WorkerEvent::Progress { ratio: 0.25 });

        let e: WorkerEvent = serde_json::from_value(json!({
            "type": "conversion-complete", "outputData": [1, 2], "audioFormat": "aac"
        })).unwrap();
        assert!(e.ends_conversion());

        let e: WorkerEvent = serde_json::from_value(json!({"type": "cleanup-complete"})).unwrap();
        assert_eq!(e, WorkerEvent::CleanupComplete);
    }

    #[test]
    fn conversion_error_carries_typed_category() {
        let e = WorkerEvent::conversion_error(&ExtractError::ExecutionFailure("Unsupported audio format".into()));
        assert_eq!(e.failure_category(), Some(FailureCategory::Format));
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["category"], "format");

        // A bare peer message is classified by keyword.
        let e: WorkerEvent = serde_json::from_value(json!({
            "type": "conversion-error", "error": "Unable to read output file"
        })).unwrap();
        assert_eq!(e.failure_category(), Some(FailureCategory::File));
        assert!(e.ends_conversion());
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(WorkerEvent::progress(1.7), WorkerEvent::Progress { ratio: 1.0 });
        assert_eq!(WorkerEvent::progress(-0.2), WorkerEvent::Progress { ratio: 0.0 });
        assert_eq!(WorkerEvent::progress(f64::NAN), WorkerEvent::Progress { ratio: 0.0 });
    }
}
