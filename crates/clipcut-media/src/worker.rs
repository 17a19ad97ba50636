// crates/clipcut-media/src/worker.rs
//
// EngineWorker: owns the EngineSession on a background thread.
// All public API that clipcut-ui calls lives here.
//
// Requests are handled strictly in arrival order. A slow engine load or a
// long conversion therefore delays the requests queued behind it, never the
// UI thread. Results come back on `rx` as WorkerEvents; duration probes come
// back on the separate `probe_rx`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use clipcut_core::messages::BitrateProbe;
use clipcut_core::{ConversionJob, EngineConfig, ExtractError, Result, SourceFile, WorkerEvent, WorkerRequest};

use crate::cli_engine::ffprobe_path;
use crate::engine::EngineLibrary;
use crate::probe::{probe_duration, ProbeResult};
use crate::session::{EngineNotice, EngineSession};

pub struct EngineWorker {
    /// Every WorkerEvent: log lines, progress, load and job outcomes.
    pub rx:       Receiver<WorkerEvent>,
    /// Duration probe results, kept apart from the event stream.
    pub probe_rx: Receiver<ProbeResult>,
    probe_tx:     Sender<ProbeResult>,
    req_tx:       Option<Sender<WorkerRequest>>,
    /// Set while a `convert` is outstanding; cleared by the worker thread
    /// just before it reports the outcome.
    converting:   Arc<AtomicBool>,
    ffprobe:      Mutex<PathBuf>,
}

impl EngineWorker {
    pub fn spawn(library: EngineLibrary) -> Self {
        let (req_tx, req_rx)     = unbounded::<WorkerRequest>();
        let (event_tx, rx)       = unbounded::<WorkerEvent>();
        let (probe_tx, probe_rx) = bounded::<ProbeResult>(16);
        let converting           = Arc::new(AtomicBool::new(false));

        let flag      = Arc::clone(&converting);
        let failed_tx = event_tx.clone();
        if let Err(e) = thread::Builder::new()
            .name("clipcut-engine".into())
            .spawn(move || run(library, req_rx, event_tx, flag))
        {
            warn!("engine worker thread failed to start: {e}");
            let _ = failed_tx.send(WorkerEvent::Error { error: format!("engine worker could not start: {e}") });
        }

        Self {
            rx,
            probe_rx,
            probe_tx,
            req_tx: Some(req_tx),
            converting,
            ffprobe: Mutex::new(PathBuf::from("ffprobe")),
        }
    }

    /// Queue a raw request. A second `convert` while one is outstanding is
    /// refused with `NotReady` and never reaches the engine.
    pub fn send(&self, request: WorkerRequest) -> Result<()> {
        let Some(tx) = &self.req_tx else { return Err(ExtractError::SessionTerminated) };
        if matches!(request, WorkerRequest::Convert(_)) && self.converting.swap(true, Ordering::SeqCst) {
            warn!("convert refused: a conversion is already running");
            return Err(ExtractError::NotReady);
        }
        let is_convert = matches!(request, WorkerRequest::Convert(_));
        tx.send(request).map_err(|_| {
            if is_convert {
                self.converting.store(false, Ordering::SeqCst);
            }
            ExtractError::SessionTerminated
        })
    }

    pub fn init(&self, config: EngineConfig) -> Result<()> {
        *self.ffprobe.lock() = ffprobe_path(std::path::Path::new(&config.core_path));
        self.send(WorkerRequest::Init(config))
    }

    pub fn convert(&self, job: ConversionJob) -> Result<()> {
        self.send(WorkerRequest::Convert(job))
    }

    pub fn probe_bitrate(&self, probe: BitrateProbe) -> Result<()> {
        self.send(WorkerRequest::ProbeBitrate(probe))
    }

    pub fn is_converting(&self) -> bool {
        self.converting.load(Ordering::SeqCst)
    }

    /// Probe the source's duration on a short-lived thread. The result
    /// arrives on `probe_rx` tagged with `id`.
    pub fn probe_duration(&self, id: Uuid, source: &SourceFile) {
        let tx      = self.probe_tx.clone();
        let ffprobe = self.ffprobe.lock().clone();
        let bytes   = Arc::clone(&source.bytes);
        let ext     = source.extension();
        thread::spawn(move || probe_duration(&ffprobe, &bytes, &ext, id, &tx));
    }

    /// Ask the engine to release itself, then close the request channel.
    /// The worker thread exits once the queue drains.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.req_tx.take() {
            let _ = tx.send(WorkerRequest::Cleanup);
            info!("engine worker shutting down");
        }
    }
}

impl Drop for EngineWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Worker thread ─────────────────────────────────────────────────────────────

fn run(
    library:    EngineLibrary,
    requests:   Receiver<WorkerRequest>,
    events:     Sender<WorkerEvent>,
    converting: Arc<AtomicBool>,
) {
    let notice_tx = events.clone();
    let mut session = EngineSession::new(
        library,
        Arc::new(move |notice: EngineNotice| {
            let event = match notice {
                EngineNotice::Log(message) => WorkerEvent::Log { message },
                EngineNotice::Progress(r)  => WorkerEvent::progress(r),
            };
            let _ = notice_tx.send(event);
        }),
    );

    for request in requests.iter() {
        let event = match request {
            WorkerRequest::Init(config) => match session.load(&config) {
                Ok(())  => WorkerEvent::Ready { success: true, error: None },
                Err(e)  => WorkerEvent::Ready { success: false, error: Some(e.to_string()) },
            },
            WorkerRequest::Convert(job) => {
                let format  = job.output_format;
                let outcome = session.submit(job);
                converting.store(false, Ordering::SeqCst);
                match outcome {
                    Ok(output_data) => WorkerEvent::ConversionComplete { output_data, audio_format: format },
                    Err(e)          => WorkerEvent::conversion_error(&e),
                }
            }
            WorkerRequest::ProbeBitrate(probe) => match session.probe_bitrate(&probe) {
                Ok(())  => WorkerEvent::BitrateComplete,
                Err(e)  => WorkerEvent::BitrateError { error: e.to_string() },
            },
            WorkerRequest::Cleanup => {
                session.terminate();
                WorkerEvent::CleanupComplete
            }
        };
        if events.send(event).is_err() {
            break;
        }
    }
    session.terminate();
    info!("engine worker exited");
}
