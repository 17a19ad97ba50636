// crates/clipcut-ui/src/context.rs
//
// AppContext owns the runtime handles behind the window: the engine worker,
// the loaded configuration and the Orchestrator. ClipCutApp holds one of these
// plus its panels and nothing else.
//
// This is the only place that talks to the worker thread. The Orchestrator
// decides; AppContext sends what it decided and feeds the answers back.

use std::path::Path;

use anyhow::{Context as _, Result};
use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{info, warn};

use clipcut_core::{SourceFile, WorkerEvent};
use clipcut_media::{EngineLibrary, EngineWorker, ProbeResult};

use crate::config::AppConfig;
use crate::helpers::download::{self, DownloadOutcome};
use crate::orchestrator::Orchestrator;

pub struct AppContext {
    pub worker: EngineWorker,
    pub config: AppConfig,
    pub orch:   Orchestrator,
    /// Outcome of the save running in the background, if any.
    saving:     Option<Receiver<clipcut_core::Result<DownloadOutcome>>>,
}

impl AppContext {
    pub fn new(library: EngineLibrary, config: AppConfig) -> Self {
        Self {
            worker: EngineWorker::spawn(library),
            config,
            orch:   Orchestrator::new(),
            saving: None,
        }
    }

    /// Start (or restart) the engine load. The outcome arrives later as
    /// `WorkerEvent::Ready`.
    pub fn init_engine(&mut self) {
        self.orch.begin_engine_init();
        if let Err(e) = self.worker.init(self.config.engine_config()) {
            self.orch.on_engine_event(WorkerEvent::Ready { success: false, error: Some(e.to_string()) });
        }
    }

    /// Read `path` and hand it to the orchestrator; a video that is accepted
    /// gets its duration probed in the background.
    pub fn import(&mut self, path: &Path) {
        let source = match read_source(path) {
            Ok(s)  => s,
            Err(e) => {
                warn!("{e:#}");
                self.orch.push_log(format!("❌ {e:#}"));
                self.orch.raise("File could not be read", format!("{e:#}"));
                return;
            }
        };
        if let Ok(req) = self.orch.select_file(source) {
            self.worker.probe_duration(req.id, &req.source);
        }
    }

    pub fn start_conversion(&mut self) {
        let format = self.orch.format();
        if let Ok(request) = self.orch.start_conversion(format) {
            if let Err(e) = self.worker.send(request) {
                self.orch.conversion_rejected(e);
            }
        }
    }

    /// Pick a destination now and write in the background. Ignored while a
    /// previous save is still running.
    pub fn download(&mut self) {
        if self.is_saving() {
            return;
        }
        let Ok((name, bytes)) = self.orch.download_payload() else { return };
        match download::choose_destination(&name, &self.config) {
            Some(dest) => {
                self.saving = Some(download::spawn_save(self.config.retry_policy(), dest, name, bytes));
            }
            None => self.orch.on_download(Ok(DownloadOutcome::Cancelled)),
        }
    }

    pub fn is_saving(&self) -> bool {
        self.saving.is_some()
    }

    /// Drain both worker channels into the orchestrator. Returns true when
    /// anything arrived, so the caller knows to repaint.
    pub fn ingest(&mut self) -> bool {
        let mut any = false;
        while let Ok(event) = self.worker.rx.try_recv() {
            self.orch.on_engine_event(event);
            any = true;
        }
        while let Ok(result) = self.worker.probe_rx.try_recv() {
            match result {
                ProbeResult::Duration { id, seconds } => self.orch.on_duration(id, seconds),
                ProbeResult::Error { id, msg }        => self.orch.on_duration_error(id, &msg),
            }
            any = true;
        }
        if let Some(rx) = &self.saving {
            match rx.try_recv() {
                Ok(outcome) => {
                    self.saving = None;
                    self.orch.on_download(outcome);
                    any = true;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    self.saving = None;
                    warn!("save thread ended without reporting");
                }
            }
        }
        any
    }

    pub fn shutdown(&mut self) {
        self.worker.shutdown();
        self.orch.shutdown();
        info!("application context shut down");
    }
}

fn read_source(path: &Path) -> Result<SourceFile> {
    let source = SourceFile::from_path(path).with_context(|| format!("reading {}", path.display()))?;
    info!("read {} ({} bytes, {})", source.name, source.size(), source.mime);
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use parking_lot::Mutex;

    use clipcut_core::EngineConfig;
    use clipcut_media::engine::{LogHandler, ModernEngine, ProgressHandler};
    use clipcut_media::EnginePhase;

    use crate::orchestrator::ProgressTone;

    /// Engine that "converts" anything into a fixed payload, or fails every
    /// exec with `complaint` when one is set.
    #[derive(Default)]
    struct CannedEngine {
        progress:  Option<ProgressHandler>,
        commands:  Arc<Mutex<Vec<Vec<String>>>>,
        complaint: Option<String>,
    }

    impl ModernEngine for CannedEngine {
        fn on_log(&mut self, _handler: LogHandler) {}
        fn on_progress(&mut self, handler: ProgressHandler) {
            self.progress = Some(handler);
        }
        fn load(&mut self, _config: &EngineConfig) -> anyhow::Result<()> { Ok(()) }
        fn write_file(&mut self, _name: &str, _data: &[u8]) -> anyhow::Result<()> { Ok(()) }
        fn exec(&mut self, args: &[String]) -> anyhow::Result<()> {
            self.commands.lock().push(args.to_vec());
            if let Some(msg) = &self.complaint {
                anyhow::bail!("{msg}");
            }
            if let Some(p) = &self.progress {
                p(1.0);
            }
            Ok(())
        }
        fn read_file(&mut self, _name: &str) -> anyhow::Result<Vec<u8>> { Ok(b"ID3canned".to_vec()) }
        fn delete_file(&mut self, _name: &str) -> anyhow::Result<()> { Ok(()) }
        fn terminate(&mut self) {}
    }

    fn pump_until(ctx: &mut AppContext, done: impl Fn(&Orchestrator) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(&ctx.orch) {
            assert!(Instant::now() < deadline, "timed out waiting on the worker");
            ctx.ingest();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn missing_engine_fails_init() {
        let mut ctx = AppContext::new(EngineLibrary::empty(), AppConfig::default());
        ctx.init_engine();
        pump_until(&mut ctx, |o| o.phase() != EnginePhase::Loading);
        assert_eq!(ctx.orch.phase(), EnginePhase::Failed);
        assert!(ctx.orch.alert().is_some());
    }

    #[test]
    fn unreadable_file_raises_alert() {
        let mut ctx = AppContext::new(EngineLibrary::empty(), AppConfig::default());
        ctx.import(Path::new("/nonexistent/clip.mp4"));
        assert_eq!(ctx.orch.alert().unwrap().title, "File could not be read");
    }

    #[test]
    fn import_convert_download() {
        let commands = Arc::new(Mutex::new(Vec::new()));
        let shared   = Arc::clone(&commands);
        let library  = EngineLibrary::empty().with_modern(move || {
            Ok(Box::new(CannedEngine { commands: Arc::clone(&shared), ..CannedEngine::default() }) as Box<dyn ModernEngine>)
        });

        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.download.use_dialog = false;
        config.download.directory  = Some(dir.path().to_path_buf());

        let mut ctx = AppContext::new(library, config);
        ctx.init_engine();
        pump_until(&mut ctx, |o| o.phase() == EnginePhase::Ready);

        let video = dir.path().join("holiday.mp4");
        std::fs::write(&video, [0u8; 128]).unwrap();
        ctx.import(&video);
        let id = ctx.orch.media().unwrap().id;
        ctx.orch.on_duration(id, 30.0);

        ctx.start_conversion();
        pump_until(&mut ctx, |o| !o.is_converting());
        assert_eq!(ctx.orch.tone(), ProgressTone::Succeeded);
        assert_eq!(commands.lock().len(), 1);

        ctx.download();
        assert!(ctx.is_saving());
        ctx.download();
        pump_until(&mut ctx, |o| o.log_lines().any(|l| l.starts_with("Saved ")));
        assert!(!ctx.is_saving());
        let saved = dir.path().join("holiday_extracted.mp3");
        assert_eq!(std::fs::read(saved).unwrap(), b"ID3canned");
        assert!(!dir.path().join("holiday_extracted (1).mp3").exists());
    }

    #[test]
    fn engine_format_complaint_reaches_the_user_as_format_error() {
        let library = EngineLibrary::empty().with_modern(|| {
            Ok(Box::new(CannedEngine {
                complaint: Some("Unsupported audio format".into()),
                ..CannedEngine::default()
            }) as Box<dyn ModernEngine>)
        });
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = AppContext::new(library, AppConfig::default());
        ctx.init_engine();
        pump_until(&mut ctx, |o| o.phase() == EnginePhase::Ready);

        let video = dir.path().join("talk.webm");
        std::fs::write(&video, [0u8; 64]).unwrap();
        ctx.import(&video);
        let id = ctx.orch.media().unwrap().id;
        ctx.orch.on_duration(id, 12.0);

        ctx.start_conversion();
        pump_until(&mut ctx, |o| !o.is_converting());
        assert_eq!(ctx.orch.tone(), ProgressTone::Failed);
        let alert = ctx.orch.alert().unwrap();
        assert!(alert.message.starts_with("Conversion failed: Format not supported"), "{}", alert.message);
    }
}
