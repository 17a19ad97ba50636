// crates/clipcut-ui/src/helpers/download.rs
//
// Saving the extracted audio, in two steps:
//
//   choose_destination  (UI thread)  native save dialog, or the download
//                                    directory when the dialog is off in
//                                    config or no desktop session can show it
//   spawn_save          (thread)     the write, retried per RetryPolicy and
//                                    reported as DownloadFailure once the
//                                    attempts run out
//
// Closing the dialog is a cancel, not an error. Directory saves never clobber
// an existing file (`clip_extracted (1).mp3`, ...).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver};
use rfd::FileDialog;
use tracing::{info, warn};

use clipcut_core::retry::{retry, RetryPolicy};
use clipcut_core::{ExtractError, Result};

use crate::config::AppConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    Saved(PathBuf),
    Cancelled,
}

/// Where a download goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    /// Exact path picked in the save dialog.
    Picked(PathBuf),
    /// Directory fallback; the final name is made unique at write time.
    Directory(PathBuf),
}

/// Whether a native dialog can be shown. Linux and the BSDs need a
/// Wayland or X11 session; `env` looks up an environment variable.
pub fn dialog_available(env: impl Fn(&str) -> Option<String>) -> bool {
    if cfg!(any(target_os = "windows", target_os = "macos")) {
        return true;
    }
    ["WAYLAND_DISPLAY", "DISPLAY"]
        .into_iter()
        .any(|var| env(var).is_some_and(|v| !v.is_empty()))
}

/// Pick the destination on the UI thread. `None` means the user cancelled.
pub fn choose_destination(name: &str, config: &AppConfig) -> Option<Destination> {
    let fallback = Destination::Directory(config.download_dir());
    if !config.download.use_dialog {
        return Some(fallback);
    }
    if !dialog_available(|var| std::env::var(var).ok()) {
        warn!("save dialog unavailable, saving into the download directory");
        return Some(fallback);
    }
    match FileDialog::new()
        .set_file_name(name)
        .add_filter("Audio files", &["mp3", "wav", "aac"])
        .save_file()
    {
        Some(path) => Some(Destination::Picked(path)),
        None => {
            info!("download cancelled");
            None
        }
    }
}

/// Write `bytes` to `dest`, blocking for as long as the retries take.
pub fn write(policy: RetryPolicy, dest: &Destination, name: &str, bytes: &[u8]) -> Result<DownloadOutcome> {
    match dest {
        Destination::Picked(path) => write_with_retry(policy, path, bytes).map(|()| DownloadOutcome::Saved(path.clone())),
        Destination::Directory(dir) => save_to_dir(policy, dir, name, bytes),
    }
}

/// Run `write` on a short-lived thread; the outcome arrives on the returned
/// receiver, so retry backoff never stalls a frame.
pub fn spawn_save(
    policy: RetryPolicy,
    dest:   Destination,
    name:   String,
    bytes:  Arc<[u8]>,
) -> Receiver<Result<DownloadOutcome>> {
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let _ = tx.send(write(policy, &dest, &name, &bytes));
    });
    rx
}

/// Dialog-less path: write `name` into `dir`, creating it if needed.
pub fn save_to_dir(policy: RetryPolicy, dir: &Path, name: &str, bytes: &[u8]) -> Result<DownloadOutcome> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!("creating {}: {e}", dir.display());
    }
    let dest = unique_destination(dir, name);
    write_with_retry(policy, &dest, bytes)?;
    Ok(DownloadOutcome::Saved(dest))
}

pub fn write_with_retry(policy: RetryPolicy, dest: &Path, bytes: &[u8]) -> Result<()> {
    retry(policy, |attempt| {
        info!(attempt, "saving {} ({} bytes)", dest.display(), bytes.len());
        std::fs::write(dest, bytes)
    })
    .map_err(|ex| ExtractError::DownloadFailure {
        attempts: ex.attempts,
        reason:   ex.last_error.to_string(),
    })
}

/// `dir/name`, or `dir/stem (n).ext` for the first free `n`.
pub fn unique_destination(dir: &Path, name: &str) -> PathBuf {
    let first = dir.join(name);
    if !first.exists() {
        return first;
    }
    let (stem, ext) = match name.rfind('.') {
        Some(i) if i > 0 => (&name[..i], &name[i..]),
        _                => (name, ""),
    };
    (1..)
        .map(|n| dir.join(format!("{stem} ({n}){ext}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}
