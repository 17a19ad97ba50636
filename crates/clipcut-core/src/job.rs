// crates/clipcut-core/src/job.rs
//
// Conversion job description and the engine command grammar.
//
// A ConversionJob is built by the orchestrator from the current format and
// range settings, moved across the offload channel, consumed exactly once by
// the engine session, and dropped after its result or error is reported.
//
// Command grammar (argv handed to the engine):
//   -i <input> [-ss <start> -t <len>] -vn -acodec <codec> -ab <bitrate> -ar 44100 -y <output>
// The sub-range is expressed as start offset + duration, never start/end.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};

/// Output sample rate forced on every job, whatever the source rate.
pub const OUTPUT_SAMPLE_RATE: u32 = 44_100;

/// How long the engine load may take before the session gives up.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(5 * 60);

// ── AudioFormat ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Aac,
    Wav,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 3] = [AudioFormat::Mp3, AudioFormat::Aac, AudioFormat::Wav];

    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Aac => "aac",
            AudioFormat::Wav => "wav",
        }
    }

    pub fn codec(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "libmp3lame",
            AudioFormat::Aac => "aac",
            AudioFormat::Wav => "pcm_s16le",
        }
    }

    /// Fixed default bitrate. Not probed from the source.
    pub fn default_bitrate(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "192k",
            AudioFormat::Aac => "256k",
            AudioFormat::Wav => "1411k",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Aac => "audio/aac",
            AudioFormat::Wav => "audio/wav",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "MP3",
            AudioFormat::Aac => "AAC",
            AudioFormat::Wav => "WAV",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "aac" => Some(AudioFormat::Aac),
            "wav" => Some(AudioFormat::Wav),
            _     => None,
        }
    }
}

// ── EngineConfig ──────────────────────────────────────────────────────────────

/// Engine-facing load configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub log:       bool,
    /// Engine core location. For the CLI engine this is the ffmpeg binary.
    pub core_path: String,
    #[serde(default)]
    pub wasm_path: Option<String>,
    #[serde(default = "default_load_timeout")]
    pub load_timeout: Duration,
}

fn default_load_timeout() -> Duration {
    DEFAULT_LOAD_TIMEOUT
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log:          true,
            core_path:    "ffmpeg".into(),
            wasm_path:    None,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }
}

// ── SourceFile ────────────────────────────────────────────────────────────────

/// A user-selected input file, already read into memory.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name:  String,
    pub mime:  String,
    pub bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self { name: name.into(), mime: mime.into(), bytes: bytes.into() }
    }

    /// Read `path` and guess its MIME type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name  = path.file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let mime = mime_for_name(&name);
        Ok(Self { name, mime: mime.into(), bytes: bytes.into() })
    }

    pub fn is_video(&self) -> bool {
        self.mime.starts_with("video/")
    }

    pub fn extension(&self) -> String {
        file_extension(&self.name)
    }

    /// `clip.mp4` → `clip`. Names without a dot are returned whole.
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(i) if i > 0 => &self.name[..i],
            _                => &self.name,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Last dot-separated segment, lowercased (`a.b.MKV` → `mkv`).
pub fn file_extension(name: &str) -> String {
    name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase()
}

/// MIME type from a file name's extension. Unknown → `application/octet-stream`.
pub fn mime_for_name(name: &str) -> &'static str {
    match file_extension(name).as_str() {
        "mp4" | "m4v"   => "video/mp4",
        "mov"           => "video/quicktime",
        "mkv"           => "video/x-matroska",
        "webm"          => "video/webm",
        "avi"           => "video/x-msvideo",
        "wmv"           => "video/x-ms-wmv",
        "flv"           => "video/x-flv",
        "mpeg" | "mpg"  => "video/mpeg",
        "3gp"           => "video/3gpp",
        "ogv"           => "video/ogg",
        "ts"            => "video/mp2t",
        "mp3"           => "audio/mpeg",
        "wav"           => "audio/wav",
        "aac"           => "audio/aac",
        "m4a"           => "audio/mp4",
        "flac"          => "audio/flac",
        "ogg"           => "audio/ogg",
        _               => "application/octet-stream",
    }
}

// ── ConversionJob ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionJob {
    #[serde(rename = "fileData")]
    pub source:        Arc<[u8]>,
    pub file_name:     String,
    #[serde(rename = "audioFormat")]
    pub output_format: AudioFormat,
    #[serde(rename = "audioBitrate")]
    pub bitrate:       String,
    pub start_seconds: f64,
    pub end_seconds:   f64,
    #[serde(rename = "isFullVideo")]
    pub full_range:    bool,
}

impl ConversionJob {
    /// Build and validate a job. `full_range` jobs ignore the bounds when
    /// building the command but must still describe `[0, duration]`.
    pub fn new(
        source:   &SourceFile,
        format:   AudioFormat,
        start:    f64,
        end:      f64,
        duration: f64,
    ) -> Result<Self> {
        if !(start.is_finite() && end.is_finite())
            || start < 0.0
            || start >= end
            || end > duration
        {
            return Err(ExtractError::InvalidRange { start, end, duration });
        }
        let full_range = start <= 0.0 && end >= duration;
        Ok(Self {
            source:        Arc::clone(&source.bytes),
            file_name:     source.name.clone(),
            output_format: format,
            bitrate:       format.default_bitrate().to_string(),
            start_seconds: start,
            end_seconds:   end,
            full_range,
        })
    }

    pub fn source_extension(&self) -> String {
        file_extension(&self.file_name)
    }

    pub fn clip_length(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    pub fn input_name(&self, seq: u64) -> String {
        format!("input_{seq}.{}", self.source_extension())
    }

    pub fn output_name(&self) -> String {
        format!("output.{}", self.output_format.extension())
    }

    /// Engine argv for this job.
    pub fn command(&self, input: &str, output: &str) -> Vec<String> {
        let mut args: Vec<String> = vec!["-i".into(), input.into()];
        if !self.full_range {
            args.push("-ss".into());
            args.push(format_seconds(self.start_seconds));
            args.push("-t".into());
            args.push(format_seconds(self.clip_length()));
        }
        args.extend([
            "-vn".to_string(),
            "-acodec".into(), self.output_format.codec().into(),
            "-ab".into(),     self.bitrate.clone(),
            "-ar".into(),     OUTPUT_SAMPLE_RATE.to_string(),
            "-y".into(),      output.into(),
        ]);
        args
    }
}

/// `10.0` → `10`, `10.5` → `10.5`.
pub fn format_seconds(secs: f64) -> String {
    format!("{secs}")
}

/// argv for the (unused by default) bitrate probe.
pub fn bitrate_probe_command(input: &str) -> Vec<String> {
    [
        "-i", input,
        "-v", "quiet",
        "-show_entries", "stream=bit_rate",
        "-select_streams", "a:0",
        "-of", "csv=p=0",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
