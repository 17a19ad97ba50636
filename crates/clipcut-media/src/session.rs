// crates/clipcut-media/src/session.rs
//
// EngineSession: lifecycle of one transcoding engine instance and the
// per-job write → exec → read → delete sequence.
//
// Phases:
//
//   Uninitialized ──begin_load──▶ Loading ──ok──▶ Ready ──submit──▶ Busy
//         ▲                          │              ▲                 │
//         │                          └─err/timeout─▶ Failed           │
//         │                                          │  (retry load)  │
//         └──────────────── begin_load ◀─────────────┘       ◀────────┘
//   any ──terminate──▶ Terminated   (terminal; every later call errors)
//
// The engine's load runs on a helper thread so it can be raced against the
// load timeout. If the timeout wins, the helper still owns the adapter and
// terminates it once the load finally returns.
//
// Log and progress callbacks from the engine are forwarded to the notice
// sink. They never change the phase.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendError, TryRecvError};
use tracing::{debug, error, info, warn};

use clipcut_core::job::bitrate_probe_command;
use clipcut_core::messages::BitrateProbe;
use clipcut_core::{ConversionJob, EngineConfig, ExtractError, Result};

use crate::engine::{EngineAdapter, EngineLibrary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Uninitialized,
    Loading,
    Ready,
    Busy,
    Failed,
    Terminated,
}

impl EnginePhase {
    pub fn label(self) -> &'static str {
        match self {
            EnginePhase::Uninitialized => "not initialized",
            EnginePhase::Loading       => "loading",
            EnginePhase::Ready         => "ready",
            EnginePhase::Busy          => "busy",
            EnginePhase::Failed        => "failed",
            EnginePhase::Terminated    => "terminated",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineNotice {
    Log(String),
    Progress(f64),
}

pub type NoticeSink = Arc<dyn Fn(EngineNotice) + Send + Sync>;

struct PendingLoad {
    rx:       Receiver<anyhow::Result<EngineAdapter>>,
    deadline: Instant,
    timeout:  Duration,
}

pub struct EngineSession {
    library:    EngineLibrary,
    phase:      EnginePhase,
    adapter:    Option<EngineAdapter>,
    pending:    Option<PendingLoad>,
    last_error: Option<String>,
    notices:    NoticeSink,
    /// Per-session counter that keeps engine file names unique.
    seq:        u64,
}

impl EngineSession {
    pub fn new(library: EngineLibrary, notices: NoticeSink) -> Self {
        Self {
            library,
            phase:      EnginePhase::Uninitialized,
            adapter:    None,
            pending:    None,
            last_error: None,
            notices,
            seq:        0,
        }
    }

    pub fn phase(&self) -> EnginePhase { self.phase }
    pub fn last_error(&self) -> Option<&str> { self.last_error.as_deref() }
    pub fn is_ready(&self) -> bool { self.phase == EnginePhase::Ready }

    /// API generation of the loaded engine, once there is one.
    pub fn engine_kind(&self) -> Option<&'static str> {
        self.adapter.as_ref().map(EngineAdapter::kind)
    }

    fn notify(&self, line: impl Into<String>) {
        (self.notices)(EngineNotice::Log(line.into()));
    }

    fn fail(&mut self, e: ExtractError) -> ExtractError {
        error!("engine load failed: {e}");
        self.phase      = EnginePhase::Failed;
        self.last_error = Some(e.to_string());
        self.pending    = None;
        e
    }

    // ── Loading ───────────────────────────────────────────────────────────────

    /// Start loading the engine. No-op while already loading or loaded.
    pub fn begin_load(&mut self, config: &EngineConfig) -> Result<()> {
        match self.phase {
            EnginePhase::Terminated => return Err(ExtractError::SessionTerminated),
            EnginePhase::Loading | EnginePhase::Ready | EnginePhase::Busy => return Ok(()),
            EnginePhase::Uninitialized | EnginePhase::Failed => {}
        }
        self.phase      = EnginePhase::Loading;
        self.last_error = None;
        self.notify("Starting engine initialization...");

        let mut adapter = match self.library.instantiate(config) {
            Ok(a)  => a,
            Err(e) => return Err(self.fail(e)),
        };

        let log_sink = Arc::clone(&self.notices);
        let log_enabled = config.log;
        let progress_sink = Arc::clone(&self.notices);
        adapter.install_handlers(
            Box::new(move |line: &str| {
                debug!(target: "engine", "{line}");
                if log_enabled {
                    log_sink(EngineNotice::Log(line.to_string()));
                }
            }),
            Box::new(move |ratio: f64| progress_sink(EngineNotice::Progress(ratio))),
        );

        self.notify("Loading engine core...");
        let (tx, rx) = bounded(1);
        let cfg      = config.clone();
        let kind     = adapter.kind();
        thread::spawn(move || {
            let result = adapter.load(&cfg).map(|()| adapter);
            if let Err(SendError(Ok(mut late))) = tx.send(result) {
                warn!(kind, "engine finished loading after the session gave up; terminating it");
                late.terminate();
            }
        });

        info!(kind, timeout_secs = config.load_timeout.as_secs(), "engine load started");
        self.pending = Some(PendingLoad {
            rx,
            deadline: Instant::now() + config.load_timeout,
            timeout:  config.load_timeout,
        });
        Ok(())
    }

    fn finish_load(&mut self, outcome: anyhow::Result<EngineAdapter>) -> Result<()> {
        self.pending = None;
        match outcome {
            Ok(adapter) => {
                info!(kind = adapter.kind(), "engine ready");
                self.adapter = Some(adapter);
                self.phase   = EnginePhase::Ready;
                self.notify("Engine core loaded successfully");
                Ok(())
            }
            Err(e) => Err(self.fail(ExtractError::EngineLoadFailure(format!("{e:#}")))),
        }
    }

    fn settled(&self) -> Result<()> {
        match self.phase {
            EnginePhase::Ready | EnginePhase::Busy => Ok(()),
            EnginePhase::Terminated => Err(ExtractError::SessionTerminated),
            EnginePhase::Failed => Err(ExtractError::EngineLoadFailure(
                self.last_error.clone().unwrap_or_default(),
            )),
            EnginePhase::Uninitialized | EnginePhase::Loading => Err(ExtractError::NotReady),
        }
    }

    /// Block until the pending load resolves or its deadline passes.
    pub fn await_load(&mut self) -> Result<()> {
        let Some(pending) = self.pending.as_ref() else { return self.settled() };
        let remaining = pending.deadline.saturating_duration_since(Instant::now());
        let timeout   = pending.timeout;
        match pending.rx.recv_timeout(remaining) {
            Ok(outcome) => self.finish_load(outcome),
            Err(RecvTimeoutError::Timeout) => Err(self.fail(ExtractError::EngineLoadTimeout(timeout))),
            Err(RecvTimeoutError::Disconnected) => Err(self.fail(ExtractError::EngineLoadFailure(
                "engine load thread exited".into(),
            ))),
        }
    }

    /// Non-blocking check on a pending load. `None` while still loading.
    pub fn poll_load(&mut self) -> Option<Result<()>> {
        let pending = self.pending.as_ref()?;
        let timeout = pending.timeout;
        match pending.rx.try_recv() {
            Ok(outcome) => Some(self.finish_load(outcome)),
            Err(TryRecvError::Empty) if Instant::now() >= pending.deadline => {
                Some(Err(self.fail(ExtractError::EngineLoadTimeout(timeout))))
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(self.fail(ExtractError::EngineLoadFailure(
                "engine load thread exited".into(),
            )))),
        }
    }

    /// `begin_load` followed by `await_load`.
    pub fn load(&mut self, config: &EngineConfig) -> Result<()> {
        self.begin_load(config)?;
        self.await_load()
    }

    // ── Jobs ──────────────────────────────────────────────────────────────────

    fn ready_adapter(&mut self) -> Result<&mut EngineAdapter> {
        match self.phase {
            EnginePhase::Terminated => Err(ExtractError::SessionTerminated),
            EnginePhase::Ready => self.adapter.as_mut().ok_or(ExtractError::NotReady),
            _ => Err(ExtractError::NotReady),
        }
    }

    /// Run one conversion job and return the encoded audio.
    ///
    /// The input and output files are removed afterwards whatever the
    /// outcome; failures to remove them are logged and otherwise ignored.
    pub fn submit(&mut self, job: ConversionJob) -> Result<Vec<u8>> {
        self.ready_adapter()?;
        self.seq += 1;
        let input  = job.input_name(self.seq);
        let output = job.output_name();
        self.phase = EnginePhase::Busy;

        let notices = Arc::clone(&self.notices);
        let Some(adapter) = self.adapter.as_mut() else {
            self.phase = EnginePhase::Ready;
            return Err(ExtractError::NotReady);
        };
        let result = run_job(adapter, &job, &input, &output, &notices);
        remove_files(adapter, &[&input, &output]);
        self.phase = EnginePhase::Ready;

        match &result {
            Ok(bytes) => info!(bytes = bytes.len(), format = job.output_format.extension(), "conversion finished"),
            Err(e)    => warn!("conversion failed: {e}"),
        }
        result
    }

    /// Run the audio bitrate probe against `probe`. Produces no value; the
    /// per-format defaults stay in force.
    pub fn probe_bitrate(&mut self, probe: &BitrateProbe) -> Result<()> {
        self.ready_adapter()?;
        self.seq += 1;
        let name = format!("probe_{}.{}", self.seq, clipcut_core::job::file_extension(&probe.file_name));
        self.phase = EnginePhase::Busy;

        let Some(adapter) = self.adapter.as_mut() else {
            self.phase = EnginePhase::Ready;
            return Err(ExtractError::NotReady);
        };
        let result = adapter
            .write_file(&name, &probe.file_data)
            .and_then(|()| adapter.exec(&bitrate_probe_command(&name)))
            .map_err(execution_failure);
        remove_files(adapter, &[&name]);
        self.phase = EnginePhase::Ready;
        result
    }

    /// Release the engine. Terminal: every later call fails.
    pub fn terminate(&mut self) {
        if self.phase == EnginePhase::Terminated {
            return;
        }
        if let Some(mut adapter) = self.adapter.take() {
            adapter.terminate();
        }
        self.pending = None;
        self.phase   = EnginePhase::Terminated;
        info!("engine session terminated");
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.terminate();
        }
    }
}

fn execution_failure(e: anyhow::Error) -> ExtractError {
    ExtractError::ExecutionFailure(format!("{e:#}"))
}

fn run_job(
    adapter: &mut EngineAdapter,
    job:     &ConversionJob,
    input:   &str,
    output:  &str,
    notices: &NoticeSink,
) -> Result<Vec<u8>> {
    notices(EngineNotice::Log("Loading file into engine memory...".into()));
    adapter.write_file(input, &job.source).map_err(execution_failure)?;
    notices(EngineNotice::Log("File loaded, starting conversion...".into()));

    let command = job.command(input, output);
    notices(EngineNotice::Log(format!("Executing: ffmpeg {}", command.join(" "))));
    adapter.exec(&command).map_err(execution_failure)?;

    let data = adapter.read_file(output).map_err(|e| {
        warn!("reading {output}: {e:#}");
        ExtractError::EmptyOutput
    })?;
    if data.is_empty() {
        return Err(ExtractError::EmptyOutput);
    }
    Ok(data)
}

fn remove_files(adapter: &mut EngineAdapter, names: &[&str]) {
    for name in names {
        if let Err(e) = adapter.delete_file(name) {
            warn!("cleanup of {name} failed: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::*;
    use clipcut_core::{AudioFormat, SourceFile};
    use parking_lot::Mutex;

    fn collector() -> (NoticeSink, Arc<Mutex<Vec<EngineNotice>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s    = Arc::clone(&seen);
        (Arc::new(move |n: EngineNotice| s.lock().push(n)), seen)
    }

    fn silent() -> NoticeSink {
        Arc::new(|_: EngineNotice| {})
    }

    fn job(format: AudioFormat, start: f64, end: f64) -> ConversionJob {
        let src = SourceFile::new("clip.mp4", "video/mp4", vec![0u8; 64]);
        ConversionJob::new(&src, format, start, end, 45.0).unwrap()
    }

    fn ready_session(s: &ScriptHandle) -> EngineSession {
        let mut session = EngineSession::new(modern_library(s), silent());
        session.load(&EngineConfig::default()).unwrap();
        session
    }

    #[test]
    fn load_reaches_ready() {
        let s = script();
        let session = ready_session(&s);
        assert_eq!(session.phase(), EnginePhase::Ready);
        assert_eq!(session.engine_kind(), Some("modern"));
        assert!(s.lock().loaded_with.is_some());
    }

    #[test]
    fn missing_library_fails_the_load() {
        let mut session = EngineSession::new(EngineLibrary::empty(), silent());
        assert_eq!(session.load(&EngineConfig::default()), Err(ExtractError::EngineUnavailable));
        assert_eq!(session.phase(), EnginePhase::Failed);
        assert!(session.last_error().is_some());
    }

    #[test]
    fn rejected_load_fails_then_retry_succeeds() {
        let s = script();
        s.lock().fail_load = Some("core fetch refused".into());
        let mut session = EngineSession::new(modern_library(&s), silent());
        match session.load(&EngineConfig::default()) {
            Err(ExtractError::EngineLoadFailure(msg)) => assert!(msg.contains("core fetch refused")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(session.phase(), EnginePhase::Failed);

        s.lock().fail_load = None;
        session.load(&EngineConfig::default()).unwrap();
        assert_eq!(session.phase(), EnginePhase::Ready);
        assert_eq!(session.last_error(), None);
    }

    #[test]
    fn slow_load_times_out_and_late_engine_is_terminated() {
        let s = script();
        s.lock().load_delay = Duration::from_millis(300);
        let cfg = EngineConfig { load_timeout: Duration::from_millis(30), ..EngineConfig::default() };
        let mut session = EngineSession::new(modern_library(&s), silent());
        assert_eq!(session.load(&cfg), Err(ExtractError::EngineLoadTimeout(Duration::from_millis(30))));
        assert_eq!(session.phase(), EnginePhase::Failed);

        thread::sleep(Duration::from_millis(700));
        assert!(s.lock().terminated);
    }

    #[test]
    fn submit_while_loading_is_not_ready() {
        let s = script();
        s.lock().load_delay = Duration::from_millis(200);
        let mut session = EngineSession::new(modern_library(&s), silent());
        session.begin_load(&EngineConfig::default()).unwrap();
        assert_eq!(session.phase(), EnginePhase::Loading);
        assert_eq!(session.poll_load(), None);
        assert_eq!(session.submit(job(AudioFormat::Mp3, 0.0, 45.0)), Err(ExtractError::NotReady));
        assert_eq!(session.phase(), EnginePhase::Loading);
        session.await_load().unwrap();
        assert!(session.is_ready());
    }

    #[test]
    fn submit_after_failed_load_stays_failed() {
        let s = script();
        s.lock().fail_load = Some("core fetch refused".into());
        let mut session = EngineSession::new(modern_library(&s), silent());
        assert!(session.load(&EngineConfig::default()).is_err());
        assert_eq!(session.phase(), EnginePhase::Failed);

        assert_eq!(session.submit(job(AudioFormat::Wav, 0.0, 45.0)), Err(ExtractError::NotReady));
        assert_eq!(session.phase(), EnginePhase::Failed);
        assert!(s.lock().commands.is_empty());
    }

    #[test]
    fn submit_before_load_leaves_state_alone() {
        let s = script();
        let mut session = EngineSession::new(modern_library(&s), silent());
        assert_eq!(session.submit(job(AudioFormat::Mp3, 0.0, 45.0)), Err(ExtractError::NotReady));
        assert_eq!(session.phase(), EnginePhase::Uninitialized);
        assert!(s.lock().calls.is_empty());
    }

    #[test]
    fn full_range_job_runs_and_cleans_up() {
        let s = script();
        s.lock().output = Some(b"ID3-audio".to_vec());
        let mut session = ready_session(&s);

        let out = session.submit(job(AudioFormat::Mp3, 0.0, 45.0)).unwrap();
        assert_eq!(out, b"ID3-audio");
        assert_eq!(session.phase(), EnginePhase::Ready);

        let sc = s.lock();
        assert!(sc.files.is_empty(), "input and output removed");
        let cmd = &sc.commands[0];
        assert_eq!(&cmd[..2], &["-i".to_string(), "input_1.mp4".to_string()]);
        assert!(!cmd.iter().any(|a| a == "-ss"));
        assert_eq!(cmd.last().map(String::as_str), Some("output.mp3"));
    }

    #[test]
    fn sub_range_job_passes_offset_and_length() {
        let s = script();
        s.lock().output = Some(vec![1, 2, 3]);
        let mut session = ready_session(&s);
        session.submit(job(AudioFormat::Aac, 10.0, 20.0)).unwrap();
        let sc = s.lock();
        let cmd = sc.commands[0].join(" ");
        assert!(cmd.contains("-ss 10 -t 10"), "{cmd}");
        assert!(cmd.ends_with("-y output.aac"), "{cmd}");
    }

    #[test]
    fn empty_or_missing_output_is_reported() {
        let s = script();
        s.lock().output = Some(Vec::new());
        let mut session = ready_session(&s);
        assert_eq!(session.submit(job(AudioFormat::Wav, 0.0, 45.0)), Err(ExtractError::EmptyOutput));
        assert_eq!(session.phase(), EnginePhase::Ready);

        s.lock().output = None;
        assert_eq!(session.submit(job(AudioFormat::Wav, 0.0, 45.0)), Err(ExtractError::EmptyOutput));
    }

    #[test]
    fn exec_failure_returns_to_ready_and_removes_input() {
        let s = script();
        s.lock().fail_exec = Some("Invalid data found when processing input".into());
        let mut session = ready_session(&s);
        match session.submit(job(AudioFormat::Mp3, 0.0, 45.0)) {
            Err(ExtractError::ExecutionFailure(msg)) => assert!(msg.contains("Invalid data")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(session.phase(), EnginePhase::Ready);
        assert!(s.lock().files.is_empty());
        assert!(s.lock().calls.iter().any(|c| c == "delete input_1.mp4"));
    }

    #[test]
    fn cleanup_failure_is_swallowed() {
        let s = script();
        {
            let mut sc = s.lock();
            sc.output = Some(vec![9; 4]);
            sc.fail_delete = true;
        }
        let mut session = ready_session(&s);
        assert_eq!(session.submit(job(AudioFormat::Mp3, 0.0, 45.0)), Ok(vec![9; 4]));
        assert_eq!(session.phase(), EnginePhase::Ready);
    }

    #[test]
    fn file_names_are_unique_per_job() {
        let s = script();
        s.lock().output = Some(vec![1]);
        let mut session = ready_session(&s);
        session.submit(job(AudioFormat::Mp3, 0.0, 45.0)).unwrap();
        session.submit(job(AudioFormat::Mp3, 0.0, 45.0)).unwrap();
        let sc = s.lock();
        assert_eq!(sc.commands[0][1], "input_1.mp4");
        assert_eq!(sc.commands[1][1], "input_2.mp4");
    }

    #[test]
    fn engine_callbacks_become_notices() {
        let s = script();
        {
            let mut sc = s.lock();
            sc.output    = Some(vec![1]);
            sc.log_lines = vec!["size=1kB time=00:00:01.00".into()];
            sc.progress  = vec![0.5, 1.0];
        }
        let (sink, seen) = collector();
        let mut session = EngineSession::new(modern_library(&s), sink);
        session.load(&EngineConfig::default()).unwrap();
        session.submit(job(AudioFormat::Mp3, 0.0, 45.0)).unwrap();

        let seen = seen.lock();
        assert!(seen.contains(&EngineNotice::Log("size=1kB time=00:00:01.00".into())));
        assert!(seen.contains(&EngineNotice::Progress(0.5)));
        assert!(seen.iter().any(|n| matches!(n, EngineNotice::Log(l) if l.starts_with("Executing: ffmpeg -i input_1.mp4"))));
    }

    #[test]
    fn terminated_session_refuses_everything() {
        let s = script();
        let mut session = ready_session(&s);
        session.terminate();
        assert_eq!(session.phase(), EnginePhase::Terminated);
        assert!(s.lock().terminated);
        assert_eq!(session.submit(job(AudioFormat::Mp3, 0.0, 45.0)), Err(ExtractError::SessionTerminated));
        assert_eq!(session.begin_load(&EngineConfig::default()), Err(ExtractError::SessionTerminated));
        session.terminate();
    }

    #[test]
    fn legacy_engine_drives_the_same_flow() {
        let s = script();
        s.lock().output = Some(b"RIFF".to_vec());
        let mut session = EngineSession::new(legacy_library(&s), silent());
        session.load(&EngineConfig::default()).unwrap();
        assert_eq!(session.engine_kind(), Some("legacy"));
        assert_eq!(session.submit(job(AudioFormat::Wav, 0.0, 45.0)), Ok(b"RIFF".to_vec()));
        session.terminate();
        assert!(s.lock().terminated);
    }

    #[test]
    fn bitrate_probe_writes_runs_and_removes() {
        let s = script();
        let mut session = ready_session(&s);
        let probe = BitrateProbe { file_data: Arc::from(vec![0u8; 8]), file_name: "clip.mkv".into() };
        session.probe_bitrate(&probe).unwrap();
        let sc = s.lock();
        assert_eq!(sc.commands[0][1], "probe_1.mkv");
        assert!(sc.commands[0].contains(&"stream=bit_rate".to_string()));
        assert!(sc.files.is_empty());
    }
}
