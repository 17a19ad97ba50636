// crates/clipcut-media/src/cli_engine.rs
//
// CliEngine: the system ffmpeg binary presented as a ModernEngine.
//
// The engine's "filesystem" is a private temp directory; every exec runs
// with that directory as cwd so the relative names the session uses
// (input_<n>.<ext>, output.<fmt>) resolve inside it. The directory and
// anything left in it is removed when the engine is dropped.
//
// ffmpeg writes its log to stderr, with progress lines terminated by '\r'
// rather than '\n'. Both separators are split on; every line goes to the log
// handler, and `time=` stamps are turned into a 0..1 ratio against the clip
// length (`-t`) or, failing that, the input's `Duration:`.

use std::fmt::Display;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use tempfile::TempDir;
use tracing::{debug, info};

use clipcut_core::EngineConfig;

use crate::engine::{LogHandler, ModernEngine, ProgressHandler};

pub struct CliEngine {
    workdir:  TempDir,
    binary:   PathBuf,
    loaded:   bool,
    log:      Option<LogHandler>,
    progress: Option<ProgressHandler>,
}

impl CliEngine {
    pub fn new() -> Result<Self> {
        let workdir = tempfile::Builder::new()
            .prefix("clipcut_engine_")
            .tempdir()
            .context("creating engine working directory")?;
        Ok(Self {
            workdir,
            binary:   PathBuf::from("ffmpeg"),
            loaded:   false,
            log:      None,
            progress: None,
        })
    }

    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            bail!("invalid engine file name '{name}'");
        }
        Ok(self.workdir.path().join(name))
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.loaded { Ok(()) } else { Err(anyhow!("ffmpeg not loaded")) }
    }

    /// ffprobe-only options go to the sibling ffprobe binary.
    fn program_for(&self, args: &[String]) -> PathBuf {
        if args.iter().any(|a| a == "-show_entries") {
            ffprobe_path(&self.binary)
        } else {
            self.binary.clone()
        }
    }
}

impl ModernEngine for CliEngine {
    fn on_log(&mut self, handler: LogHandler) {
        self.log = Some(handler);
    }

    fn on_progress(&mut self, handler: ProgressHandler) {
        self.progress = Some(handler);
    }

    fn load(&mut self, config: &EngineConfig) -> Result<()> {
        self.binary = PathBuf::from(&config.core_path);
        let out = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("launching {}", self.binary.display()))?;
        if !out.status.success() {
            bail!("{} -version exited with {}", self.binary.display(), out.status);
        }
        let version = String::from_utf8_lossy(&out.stdout);
        let first   = version.lines().next().unwrap_or("ffmpeg").to_string();
        info!(binary = %self.binary.display(), "{first}");
        if config.log {
            if let Some(log) = &self.log {
                log(&first);
            }
        }
        self.loaded = true;
        Ok(())
    }

    fn write_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.ensure_loaded()?;
        let path = self.path_for(name)?;
        std::fs::write(&path, data).with_context(|| format!("writing {name}"))
    }

    fn exec(&mut self, args: &[String]) -> Result<()> {
        self.ensure_loaded()?;
        let program = self.program_for(args);
        debug!(program = %program.display(), ?args, "engine exec");

        let mut child = Command::new(&program)
            .arg("-hide_banner")
            .args(args)
            .current_dir(self.workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("launching {}", program.display()))?;

        let last_line = match child.stderr.take() {
            Some(stderr) => scan_stderr(
                stderr,
                clip_length_hint(args),
                self.log.as_deref(),
                self.progress.as_deref(),
            ),
            None => None,
        };

        let status = child.wait().context("waiting for ffmpeg")?;
        if !status.success() {
            // The engine's own stderr tail decides the failure category, so keep
            // the program name out of this message.
            bail!("{}", exit_message(status, last_line.as_deref()));
        }
        if let Some(progress) = &self.progress {
            progress(1.0);
        }
        Ok(())
    }

    fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        self.ensure_loaded()?;
        let path = self.path_for(name)?;
        std::fs::read(&path).with_context(|| format!("reading {name}"))
    }

    fn delete_file(&mut self, name: &str) -> Result<()> {
        self.ensure_loaded()?;
        let path = self.path_for(name)?;
        std::fs::remove_file(&path).with_context(|| format!("deleting {name}"))
    }

    fn terminate(&mut self) {
        self.loaded = false;
        info!(workdir = %self.workdir.path().display(), "cli engine terminated");
    }
}

// ── stderr scanning ───────────────────────────────────────────────────────────

/// Forward every stderr line to `log` and derive progress from `time=` stamps.
/// Returns the last non-empty line for error reporting.
fn scan_stderr<R: Read>(
    stderr:   R,
    length:   Option<f64>,
    log:      Option<&(dyn Fn(&str) + Send + Sync)>,
    progress: Option<&(dyn Fn(f64) + Send + Sync)>,
) -> Option<String> {
    let mut total = length;
    let mut last  = None;
    for chunk in BufReader::new(stderr).split(b'\r') {
        let Ok(chunk) = chunk else { break };
        let text = String::from_utf8_lossy(&chunk);
        for line in text.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(log) = log {
                log(line);
            }
            if total.is_none() {
                total = field_after(line, "Duration:").and_then(parse_timestamp);
            }
            if let (Some(total), Some(cb)) = (total, progress) {
                if let Some(t) = field_after(line, "time=").and_then(parse_timestamp) {
                    if total > 0.0 {
                        cb((t / total).clamp(0.0, 1.0));
                    }
                }
            }
            last = Some(line.to_string());
        }
    }
    last
}

/// The whitespace/comma-terminated token following `key`.
fn field_after<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = &line[line.find(key)? + key.len()..];
    rest.trim_start()
        .split(|c: char| c.is_whitespace() || c == ',')
        .next()
        .filter(|s| !s.is_empty())
}

/// `HH:MM:SS.ss` → seconds. `N/A` and other junk → None.
pub fn parse_timestamp(s: &str) -> Option<f64> {
    let mut parts = s.split(':');
    let h: f64 = parts.next()?.parse().ok()?;
    let m: f64 = parts.next()?.parse().ok()?;
    let sec: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(h * 3600.0 + m * 60.0 + sec)
}

/// Clip length from a `-t <secs>` pair in the argv, if any.
fn clip_length_hint(args: &[String]) -> Option<f64> {
    args.windows(2)
        .find(|w| w[0] == "-t")
        .and_then(|w| w[1].parse().ok())
}

/// Failure text for a non-zero exit: the last stderr line when there is one.
fn exit_message(status: impl Display, last_line: Option<&str>) -> String {
    match last_line.map(str::trim).filter(|l| !l.is_empty()) {
        Some(line) => line.to_string(),
        None       => format!("process exited with {status}"),
    }
}

/// `ffmpeg` → `ffprobe`, `/usr/bin/ffmpeg.exe` → `/usr/bin/ffprobe.exe`.
pub fn ffprobe_path(ffmpeg: &Path) -> PathBuf {
    let name = ffmpeg.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let probe = if name.contains("ffmpeg") {
        name.replacen("ffmpeg", "ffprobe", 1)
    } else {
        "ffprobe".to_string()
    };
    ffmpeg.with_file_name(probe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;
    use parking_lot::Mutex;

    #[test]
    fn parses_ffmpeg_timestamps() {
        assert_eq!(parse_timestamp("00:01:23.50"), Some(83.5));
        assert_eq!(parse_timestamp("01:00:00.00"), Some(3600.0));
        assert_eq!(parse_timestamp("N/A"), None);
        assert_eq!(parse_timestamp("1:2"), None);
    }

    #[test]
    fn stderr_scan_reports_lines_and_progress() {
        let stderr = b"Input #0, mov,mp4\n  Duration: 00:00:40.00, start: 0.000000, bitrate: 900 kb/s\n\
                       size=  10kB time=00:00:10.00 bitrate=1kbits/s\r\
                       size=  20kB time=00:00:20.00 bitrate=1kbits/s\r\
                       video:0kB audio:20kB\n";
        let lines  = Arc::new(Mutex::new(Vec::<String>::new()));
        let ratios = Arc::new(Mutex::new(Vec::<f64>::new()));
        let (l, r) = (lines.clone(), ratios.clone());
        let log  = move |s: &str| l.lock().push(s.to_string());
        let prog = move |p: f64| r.lock().push(p);

        let last = scan_stderr(Cursor::new(&stderr[..]), None, Some(&log), Some(&prog));
        assert_eq!(last.as_deref(), Some("video:0kB audio:20kB"));
        assert_eq!(*ratios.lock(), vec![0.25, 0.5]);
        assert_eq!(lines.lock().len(), 5);
    }

    #[test]
    fn clip_length_overrides_input_duration() {
        let args: Vec<String> = ["-i", "in.mp4", "-ss", "10", "-t", "5"].iter().map(|s| s.to_string()).collect();
        assert_eq!(clip_length_hint(&args), Some(5.0));
        let ratios = Arc::new(Mutex::new(Vec::<f64>::new()));
        let r = ratios.clone();
        let prog = move |p: f64| r.lock().push(p);
        let stderr = b"Duration: 00:01:00.00,\ntime=00:00:02.50 x\r";
        scan_stderr(Cursor::new(&stderr[..]), Some(5.0), None, Some(&prog));
        assert_eq!(*ratios.lock(), vec![0.5]);
    }

    #[test]
    fn exit_message_is_the_stderr_tail() {
        use clipcut_core::{ExtractError, FailureCategory};

        let status = "exit status: 1";
        let msg = exit_message(status, Some("out.wav: Invalid data found when processing input format"));
        assert_eq!(msg, "out.wav: Invalid data found when processing input format");
        assert_eq!(ExtractError::ExecutionFailure(msg).category(), FailureCategory::Format);
        assert!(exit_message(status, Some("  ")).starts_with("process exited with"));
    }

    #[test]
    fn probe_binary_sits_next_to_ffmpeg() {
        assert_eq!(ffprobe_path(Path::new("ffmpeg")), PathBuf::from("ffprobe"));
        assert_eq!(ffprobe_path(Path::new("/opt/bin/ffmpeg.exe")), PathBuf::from("/opt/bin/ffprobe.exe"));
    }

    #[test]
    fn file_ops_stay_inside_the_workdir() {
        let mut engine = CliEngine::new().unwrap();
        assert!(engine.write_file("a.bin", b"x").is_err(), "not loaded yet");
        engine.loaded = true;
        engine.write_file("input_1.mp4", b"abc").unwrap();
        assert!(engine.workdir().join("input_1.mp4").exists());
        assert_eq!(engine.read_file("input_1.mp4").unwrap(), b"abc");
        engine.delete_file("input_1.mp4").unwrap();
        assert!(engine.read_file("input_1.mp4").is_err());
        assert!(engine.write_file("../escape", b"x").is_err());
    }

    #[test]
    fn load_fails_for_missing_binary() {
        let mut engine = CliEngine::new().unwrap();
        let cfg = EngineConfig { core_path: "/nonexistent/clipcut-ffmpeg".into(), ..EngineConfig::default() };
        assert!(engine.load(&cfg).is_err());
        assert!(engine.exec(&[]).is_err());
    }
}
