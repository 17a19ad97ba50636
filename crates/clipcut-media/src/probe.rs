// crates/clipcut-media/src/probe.rs
//
// Media duration probing via the ffprobe CLI.
//
// The source lives in memory, so it is spilled to a named temp file carrying
// the original extension (ffprobe sniffs some containers by name) and probed
// from there. The temp file is removed when the probe returns.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use crossbeam_channel::Sender;
use tracing::{debug, warn};
use uuid::Uuid;

/// Results from short-lived probe threads. Travel on their own channel so a
/// busy conversion log never delays them.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeResult {
    Duration { id: Uuid, seconds: f64 },
    Error    { id: Uuid, msg: String },
}

/// Probe `bytes` and send the outcome for `id` on `tx`.
pub fn probe_duration(ffprobe: &Path, bytes: &[u8], extension: &str, id: Uuid, tx: &Sender<ProbeResult>) {
    let result = match probe_bytes(ffprobe, bytes, extension) {
        Ok(seconds) => {
            debug!(%id, seconds, "probed duration");
            ProbeResult::Duration { id, seconds }
        }
        Err(e) => {
            warn!(%id, "duration probe failed: {e:#}");
            ProbeResult::Error { id, msg: format!("{e:#}") }
        }
    };
    let _ = tx.send(result);
}

fn probe_bytes(ffprobe: &Path, bytes: &[u8], extension: &str) -> Result<f64> {
    let mut file = tempfile::Builder::new()
        .prefix("clipcut_probe_")
        .suffix(&format!(".{extension}"))
        .tempfile()
        .context("creating probe temp file")?;
    file.write_all(bytes).context("writing probe temp file")?;
    file.flush()?;

    let out = Command::new(ffprobe)
        .args([
            "-v", "error",
            "-show_entries", "format=duration",
            "-of", "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(file.path())
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("launching {}", ffprobe.display()))?;

    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        bail!("ffprobe failed: {}", stderr.lines().last().unwrap_or("").trim());
    }
    match parse_duration_output(&String::from_utf8_lossy(&out.stdout)) {
        Some(d) => Ok(d),
        None    => bail!("duration unknown"),
    }
}

/// First line of ffprobe's bare `format=duration` output. `N/A`, zero and
/// negative values are treated as unknown.
pub fn parse_duration_output(stdout: &str) -> Option<f64> {
    let secs: f64 = stdout.lines().next()?.trim().parse().ok()?;
    (secs.is_finite() && secs > 0.0).then_some(secs)
}
