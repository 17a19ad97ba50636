// crates/clipcut-ui/src/commands.rs
//
// Everything a panel can ask for. Panels push these during the UI pass;
// ClipCutApp::process_command applies them once the pass is over.

use std::path::PathBuf;

use clipcut_core::range::RangeHandle;
use clipcut_core::AudioFormat;

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    // ── Engine ───────────────────────────────────────────────────────────────
    RetryEngineInit,

    // ── Source ───────────────────────────────────────────────────────────────
    ImportFile(PathBuf),
    TogglePlayback,

    // ── Range ────────────────────────────────────────────────────────────────
    Range(RangeEdit),

    // ── Export ───────────────────────────────────────────────────────────────
    SetFormat(AudioFormat),
    StartConversion,
    Download,

    // ── App ──────────────────────────────────────────────────────────────────
    DismissAlert,
    ResetAll,
}

/// Edits to the range selector. Times are in media seconds.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeEdit {
    BeginDrag(RangeHandle),
    DragTo(f64),
    EndDrag,
    ClickTrack(f64),
    /// Start field committed; both fields' text as currently typed.
    StartField { start: String, end: String },
    EndField { start: String, end: String },
    Reset,
}
