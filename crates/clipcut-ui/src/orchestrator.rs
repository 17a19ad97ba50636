// crates/clipcut-ui/src/orchestrator.rs
//
// Orchestrator: the single owned context behind the window. Holds the handle
// registry, the range selector, the preview player, a mirror of the engine
// phase, the current job and the scrolling log.
//
// It never talks to the worker thread itself. Methods that need the engine
// return the WorkerRequest (or DurationRequest) to send; the app forwards it
// and feeds every WorkerEvent back through `on_engine_event`. That keeps the
// whole state machine testable without threads.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};
use uuid::Uuid;

use clipcut_core::helpers::time::{format_file_size, format_time};
use clipcut_core::playback::{MediaElement, PreviewPlayer};
use clipcut_core::range::RangeSelector;
use clipcut_core::retry::{retry, RetryPolicy};
use clipcut_core::{
    AudioFormat, BlobHandle, ConversionJob, ExtractError, FailureCategory, HandleRegistry, Result,
    SourceFile, WorkerEvent, WorkerRequest,
};
use clipcut_media::EnginePhase;

use crate::helpers::download::DownloadOutcome;

/// Lines kept in the log panel; older lines scroll off.
pub const LOG_CAPACITY: usize = 500;

/// Handle recreation after a playback error: one attempt, 100 ms pause budget.
const REFRESH_POLICY: RetryPolicy = RetryPolicy::new(1, Duration::from_millis(100));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressTone {
    Neutral,
    Failed,
    Succeeded,
}

/// A blocking message for the modal.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub title:   String,
    pub message: String,
}

/// Work for the media subsystem: probe `source` and report back under `id`.
#[derive(Debug, Clone)]
pub struct DurationRequest {
    pub id:     Uuid,
    pub source: SourceFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleSlot {
    Preview,
    Result,
}

#[derive(Debug, Clone)]
pub struct LoadedMedia {
    pub id:       Uuid,
    pub source:   SourceFile,
    pub preview:  Option<BlobHandle>,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ExtractedAudio {
    pub bytes:  Arc<[u8]>,
    pub format: AudioFormat,
    pub handle: Option<BlobHandle>,
}

pub struct Orchestrator {
    registry:     HandleRegistry,
    pub selector: RangeSelector,
    pub player:   PreviewPlayer,

    phase:        EnginePhase,
    engine_error: Option<String>,
    init_started: Option<Instant>,

    media:     Option<LoadedMedia>,
    format:    AudioFormat,
    in_flight: Option<AudioFormat>,
    result:    Option<ExtractedAudio>,

    log:      VecDeque<String>,
    progress: f64,
    tone:     ProgressTone,
    alert:    Option<Alert>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::with_registry(HandleRegistry::new())
    }

    pub fn with_registry(registry: HandleRegistry) -> Self {
        Self {
            registry,
            selector:     RangeSelector::new(),
            player:       PreviewPlayer::new(),
            phase:        EnginePhase::Uninitialized,
            engine_error: None,
            init_started: None,
            media:        None,
            format:       AudioFormat::default(),
            in_flight:    None,
            result:       None,
            log:          VecDeque::with_capacity(LOG_CAPACITY),
            progress:     0.0,
            tone:         ProgressTone::Neutral,
            alert:        None,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn phase(&self) -> EnginePhase { self.phase }
    pub fn engine_error(&self) -> Option<&str> { self.engine_error.as_deref() }
    pub fn media(&self) -> Option<&LoadedMedia> { self.media.as_ref() }
    pub fn result(&self) -> Option<&ExtractedAudio> { self.result.as_ref() }
    pub fn format(&self) -> AudioFormat { self.format }
    pub fn progress(&self) -> f64 { self.progress }
    pub fn tone(&self) -> ProgressTone { self.tone }
    pub fn alert(&self) -> Option<&Alert> { self.alert.as_ref() }
    pub fn registry(&self) -> &HandleRegistry { &self.registry }

    pub fn is_converting(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Convert button state: a file with a known duration, a ready engine,
    /// nothing in flight.
    pub fn can_convert(&self) -> bool {
        self.phase == EnginePhase::Ready
            && self.in_flight.is_none()
            && self.media.as_ref().is_some_and(|m| m.duration.is_some())
    }

    pub fn log_lines(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(String::as_str)
    }

    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn set_format(&mut self, format: AudioFormat) {
        if self.format != format {
            info!("output format: {}", format.label());
            self.format = format;
        }
    }

    // ── Log / alerts ──────────────────────────────────────────────────────────

    pub fn push_log(&mut self, line: impl Into<String>) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(line.into());
    }

    pub fn raise(&mut self, title: &str, message: impl Into<String>) {
        let message = message.into();
        warn!("{title}: {message}");
        self.alert = Some(Alert { title: title.into(), message });
    }

    /// Surface a refused precondition as an alert and hand the error back.
    fn refuse(&mut self, err: ExtractError) -> ExtractError {
        let message = match &err {
            ExtractError::NotReady          => "Please wait for FFmpeg initialization to complete.".to_string(),
            ExtractError::NoFileSelected    => "Please select a video file first!".to_string(),
            ExtractError::InvalidFile(_)    => "Please select a video file!".to_string(),
            ExtractError::HandleExhaustion  => "Could not register the file for playback. Please try again.".to_string(),
            ExtractError::InvalidRange { start, end, .. } => format!(
                "Invalid time range {} – {}. The end must come after the start and stay within the video.",
                format_time(*start),
                format_time(*end),
            ),
            other => other.to_string(),
        };
        self.raise("Cannot continue", message);
        err
    }

    // ── Engine lifecycle ──────────────────────────────────────────────────────

    /// Mark the engine as loading. Called right before `WorkerRequest::Init`
    /// is sent, both at startup and from the retry button.
    pub fn begin_engine_init(&mut self) {
        self.phase        = EnginePhase::Loading;
        self.engine_error = None;
        self.init_started = Some(Instant::now());
        self.push_log("Initializing FFmpeg...");
    }

    /// Time spent loading so far; `None` unless a load is in progress.
    pub fn init_elapsed(&self) -> Option<Duration> {
        match (self.phase, self.init_started) {
            (EnginePhase::Loading, Some(t)) => Some(t.elapsed()),
            _ => None,
        }
    }

    pub fn on_engine_event(&mut self, event: WorkerEvent) {
        let category = event.failure_category().unwrap_or(FailureCategory::Unknown);
        match event {
            WorkerEvent::Log { message } => self.push_log(message),

            WorkerEvent::Progress { ratio } => {
                // Progress carries no job id; without a job it is stale.
                if self.in_flight.is_some() {
                    self.progress = ratio;
                    self.tone     = ProgressTone::Neutral;
                }
            }

            WorkerEvent::Ready { success: true, .. } => {
                let secs = self.init_started.map(|t| t.elapsed().as_secs_f64()).unwrap_or(0.0);
                self.phase        = EnginePhase::Ready;
                self.engine_error = None;
                info!(secs, "engine ready");
                self.push_log(format!("FFmpeg loaded successfully ({secs:.1}s)"));
            }

            WorkerEvent::Ready { success: false, error } => {
                let reason = error.unwrap_or_else(|| "unknown error".into());
                self.phase = EnginePhase::Failed;
                error!("engine init failed: {reason}");
                self.push_log(format!("❌ FFmpeg initialization failed: {reason}"));
                self.raise(
                    "FFmpeg failed to load",
                    format!("FFmpeg initialization failed: {reason}\n\nCheck the engine path and use Retry."),
                );
                self.engine_error = Some(reason);
            }

            WorkerEvent::ConversionComplete { output_data, audio_format } => {
                self.finish_conversion(output_data, audio_format);
            }

            WorkerEvent::ConversionError { error, .. } => self.fail_conversion(category, &error),

            WorkerEvent::Error { error } => {
                if self.in_flight.is_some() {
                    self.fail_conversion(category, &error);
                } else {
                    error!("engine worker error: {error}");
                    self.push_log(format!("❌ Engine error: {error}"));
                    self.raise("Engine error", error);
                }
            }

            WorkerEvent::BitrateComplete => self.push_log("Bitrate probe finished"),
            WorkerEvent::BitrateError { error } => self.push_log(format!("Bitrate probe failed: {error}")),

            WorkerEvent::CleanupComplete => {
                self.phase = EnginePhase::Terminated;
                self.push_log("FFmpeg resources released");
            }
        }
    }

    fn job_settled(&mut self) {
        self.in_flight = None;
        if self.phase == EnginePhase::Busy {
            self.phase = EnginePhase::Ready;
        }
    }

    fn finish_conversion(&mut self, output_data: Vec<u8>, format: AudioFormat) {
        self.job_settled();
        self.revoke_result();

        let bytes: Arc<[u8]> = output_data.into();
        let size = format_file_size(bytes.len() as u64);
        match self.registry.mint_typed(Arc::clone(&bytes), "audio-result", Some(format.mime_type())) {
            Some(handle) => {
                self.result   = Some(ExtractedAudio { bytes, format, handle: Some(handle) });
                self.progress = 1.0;
                self.tone     = ProgressTone::Succeeded;
                self.push_log(format!("Generated audio file, size: {size}"));
                self.push_log("Audio extraction completed!");
            }
            None => {
                self.tone = ProgressTone::Failed;
                self.push_log(format!("❌ Conversion failed: {}", ExtractError::HandleExhaustion));
                self.raise("Conversion failed", ExtractError::HandleExhaustion.to_string());
            }
        }
    }

    fn fail_conversion(&mut self, category: FailureCategory, raw: &str) {
        self.job_settled();
        self.tone = ProgressTone::Failed;
        let message = format!("Conversion failed: {}", category.label());
        error!("{message}: {raw}");
        self.push_log(format!("❌ {message}: {raw}"));
        self.raise("Conversion failed", format!("{message}\n\nDetails: {raw}"));
    }

    // ── File selection ────────────────────────────────────────────────────────

    /// Take a new source. On success the previous job and preview are gone
    /// and the caller should probe the returned request's duration.
    pub fn select_file(&mut self, source: SourceFile) -> Result<DurationRequest> {
        if self.phase != EnginePhase::Ready {
            return Err(self.refuse(ExtractError::NotReady));
        }
        if !source.is_video() {
            return Err(self.refuse(ExtractError::InvalidFile(source.mime.clone())));
        }

        self.revoke_result();
        self.log.clear();
        self.progress = 0.0;
        self.tone     = ProgressTone::Neutral;
        if let Some(handle) = self.media.take().and_then(|m| m.preview) {
            self.registry.revoke(&handle);
        }
        self.selector.clear();
        self.player.unload();

        let Some(preview) = self.registry.mint_typed(Arc::clone(&source.bytes), "video-preview", Some(&source.mime))
        else {
            return Err(self.refuse(ExtractError::HandleExhaustion));
        };

        let id = Uuid::new_v4();
        self.push_log(format!("Selected file: {} ({})", source.name, format_file_size(source.size())));
        self.media = Some(LoadedMedia { id, source: source.clone(), preview: Some(preview), duration: None });
        Ok(DurationRequest { id, source })
    }

    /// Probe result for the current file. Results for a file that has since
    /// been replaced are dropped.
    pub fn on_duration(&mut self, id: Uuid, seconds: f64) {
        let Some(media) = self.media.as_mut().filter(|m| m.id == id) else { return };
        media.duration = Some(seconds);
        self.selector.load(seconds);
        self.player.load(seconds);
        self.push_log(format!("Video loaded, duration: {}", format_time(seconds)));
    }

    pub fn on_duration_error(&mut self, id: Uuid, msg: &str) {
        if !self.media.as_ref().is_some_and(|m| m.id == id) {
            return;
        }
        self.push_log(format!("❌ Could not read video duration: {msg}"));
        self.raise("Video could not be loaded", format!("Could not read the video's duration.\n\nDetails: {msg}"));
    }

    // ── Conversion ────────────────────────────────────────────────────────────

    /// Validate the current selection and build the request to send.
    pub fn start_conversion(&mut self, format: AudioFormat) -> Result<WorkerRequest> {
        let Some(media) = self.media.as_ref() else {
            return Err(self.refuse(ExtractError::NoFileSelected));
        };
        if self.phase != EnginePhase::Ready || self.in_flight.is_some() {
            return Err(self.refuse(ExtractError::NotReady));
        }
        let duration = media.duration.unwrap_or(0.0);
        let job = match ConversionJob::new(&media.source, format, self.selector.start(), self.selector.end(), duration) {
            Ok(job) => job,
            Err(e)  => return Err(self.refuse(e)),
        };

        self.format = format;
        self.revoke_result();
        self.progress  = 0.0;
        self.tone      = ProgressTone::Neutral;
        self.in_flight = Some(format);
        self.phase     = EnginePhase::Busy;

        self.push_log(format!("Starting audio extraction ({}, {})", format.label(), job.bitrate));
        if !job.full_range {
            self.push_log(format!(
                "Extracting segment {} – {} ({})",
                format_time(job.start_seconds),
                format_time(job.end_seconds),
                format_time(job.clip_length()),
            ));
        }
        Ok(WorkerRequest::Convert(job))
    }

    /// The worker refused the request built by `start_conversion`.
    pub fn conversion_rejected(&mut self, err: ExtractError) {
        self.job_settled();
        if err == ExtractError::SessionTerminated {
            self.phase = EnginePhase::Terminated;
        }
        self.tone = ProgressTone::Failed;
        self.push_log(format!("❌ Conversion not started: {err}"));
        self.refuse(err);
    }

    // ── Result / download ─────────────────────────────────────────────────────

    /// `clip.mp4` + mp3 → `clip_extracted.mp3`.
    pub fn download_name(&self) -> Option<String> {
        let media  = self.media.as_ref()?;
        let result = self.result.as_ref()?;
        Some(format!("{}_extracted.{}", media.source.stem(), result.format.extension()))
    }

    /// Name and bytes to save. Counts as an access on the result handle,
    /// re-minting it if a sweep already took it.
    pub fn download_payload(&mut self) -> Result<(String, Arc<[u8]>)> {
        let Some(name) = self.download_name() else {
            return Err(self.refuse(ExtractError::EmptyOutput));
        };
        let live = self.result.as_ref()
            .and_then(|r| r.handle.clone())
            .and_then(|h| self.registry.get(&h));
        let bytes = match live {
            Some(bytes) => bytes,
            None        => {
                self.refresh_handle(HandleSlot::Result)?;
                self.result.as_ref().map(|r| Arc::clone(&r.bytes)).ok_or(ExtractError::EmptyOutput)?
            }
        };
        Ok((name, bytes))
    }

    pub fn on_download(&mut self, outcome: Result<DownloadOutcome>) {
        match outcome {
            Ok(DownloadOutcome::Saved(path)) => self.push_log(format!("Saved {}", path.display())),
            Ok(DownloadOutcome::Cancelled)   => {}
            Err(e) => {
                self.push_log(format!("❌ Download failed: {e}"));
                self.raise("Download failed", format!("{e}\n\nPlease try again."));
            }
        }
    }

    fn revoke_result(&mut self) {
        if let Some(handle) = self.result.take().and_then(|r| r.handle) {
            self.registry.revoke(&handle);
        }
    }

    /// Playback-error recovery: drop the slot's handle and register the same
    /// buffer again under a `-retry` identifier.
    pub fn refresh_handle(&mut self, slot: HandleSlot) -> Result<BlobHandle> {
        let (old, bytes, identifier, mime) = match slot {
            HandleSlot::Preview => {
                let media = self.media.as_ref().ok_or(ExtractError::NoFileSelected)?;
                (media.preview.clone(), Arc::clone(&media.source.bytes), "video-preview-retry", media.source.mime.clone())
            }
            HandleSlot::Result => {
                let result = self.result.as_ref().ok_or(ExtractError::EmptyOutput)?;
                (result.handle.clone(), Arc::clone(&result.bytes), "audio-result-retry", result.format.mime_type().to_string())
            }
        };
        if let Some(old) = &old {
            self.registry.revoke(old);
        }

        let registry = &mut self.registry;
        let handle = retry(REFRESH_POLICY, |_| {
            registry.mint_typed(Arc::clone(&bytes), identifier, Some(&mime)).ok_or(ExtractError::HandleExhaustion)
        })
        .map_err(|ex| ex.last_error)?;

        info!("recreated blob handle {handle} ({identifier})");
        match slot {
            HandleSlot::Preview => if let Some(m) = self.media.as_mut() { m.preview = Some(handle.clone()) },
            HandleSlot::Result  => if let Some(r) = self.result.as_mut() { r.handle = Some(handle.clone()) },
        }
        Ok(handle)
    }

    // ── Playback ──────────────────────────────────────────────────────────────

    /// Advance the preview clock and keep the selector's playhead in step.
    /// Returns true while playing.
    pub fn tick_playback(&mut self, dt: f64) -> bool {
        let playing = self.player.tick(dt);
        self.selector.sync_playback(self.player.current_time());
        playing
    }

    /// Play/pause. Playing needs a live preview handle, so one evicted by a
    /// sweep is recreated first.
    pub fn toggle_playback(&mut self) {
        let Some(media) = self.media.as_ref() else { return };
        let live = media.preview.as_ref().filter(|h| self.registry.contains(h)).cloned();
        let handle = match live {
            Some(h) => h,
            None    => match self.refresh_handle(HandleSlot::Preview) {
                Ok(h)  => h,
                Err(e) => {
                    self.push_log(format!("❌ Video playback error: {e}"));
                    return;
                }
            },
        };
        self.registry.touch(&handle);
        self.player.toggle();
    }

    // ── Housekeeping ──────────────────────────────────────────────────────────

    /// Periodic registry sweep. Slots whose handle was evicted forget it; the
    /// buffers themselves stay owned here.
    pub fn maybe_sweep(&mut self) -> usize {
        let evicted = self.registry.maybe_sweep();
        if evicted > 0 {
            let registry = &self.registry;
            if let Some(m) = self.media.as_mut() {
                m.preview = m.preview.take().filter(|h| registry.contains(h));
            }
            if let Some(r) = self.result.as_mut() {
                r.handle = r.handle.take().filter(|h| registry.contains(h));
            }
        }
        evicted
    }

    /// Full application reset: every handle revoked, every panel cleared.
    /// The engine phase is left alone.
    pub fn reset(&mut self) {
        self.registry.revoke_all();
        self.media     = None;
        self.result    = None;
        self.in_flight = None;
        if self.phase == EnginePhase::Busy {
            self.phase = EnginePhase::Ready;
        }
        self.selector.clear();
        self.player.unload();
        self.log.clear();
        self.progress = 0.0;
        self.tone     = ProgressTone::Neutral;
        self.alert    = None;
        info!("application state reset");
    }

    pub fn shutdown(&mut self) {
        self.registry.shutdown();
    }
}
