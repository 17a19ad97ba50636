// crates/clipcut-core/src/range.rs
//
// RangeSelector: the two-handle [start, end) selection over a media time axis.
//
// Invariants, after every public call:
//   0 ≤ start ≤ end − 1 ≤ duration − 1       (at least one second selected)
//   0 ≤ playback ≤ duration
// Media shorter than one second is the only exception: the range is then
// pinned to [0, duration].
//
// Every mutation that moves the playhead also seeks the bound MediaElement so
// the preview and the progress indicator stay in step. With no media loaded
// (duration 0) the selector is inert.

use tracing::debug;

use crate::helpers::time::{format_time, format_time_for_input, parse_time_input};
use crate::playback::MediaElement;

/// Smallest selectable span in seconds.
pub const MIN_SPAN: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeHandle {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeSelector {
    duration: f64,
    start:    f64,
    end:      f64,
    playback: f64,
    dragging: Option<RangeHandle>,
}

impl Default for RangeSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeSelector {
    pub fn new() -> Self {
        Self { duration: 0.0, start: 0.0, end: 0.0, playback: 0.0, dragging: None }
    }

    /// Re-initialise for freshly loaded media: full range, playhead at 0.
    pub fn load(&mut self, duration: f64) {
        self.duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        self.start    = 0.0;
        self.end      = self.duration;
        self.playback = 0.0;
        self.dragging = None;
        debug!(duration = self.duration, "range selector loaded");
    }

    /// Forget the media entirely.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn duration(&self) -> f64 { self.duration }
    pub fn start(&self) -> f64 { self.start }
    pub fn end(&self) -> f64 { self.end }
    pub fn playback_position(&self) -> f64 { self.playback }
    pub fn dragging(&self) -> Option<RangeHandle> { self.dragging }

    pub fn is_active(&self) -> bool {
        self.duration > 0.0
    }

    pub fn is_full_range(&self) -> bool {
        self.start <= 0.0 && self.end >= self.duration
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    /// Playhead as a fraction of the media, for the progress indicator.
    pub fn progress_fraction(&self) -> f64 {
        if self.duration > 0.0 { self.playback / self.duration } else { 0.0 }
    }

    // ── Clamps ────────────────────────────────────────────────────────────────

    fn clamped_start(&self, t: f64) -> f64 {
        t.min(self.end - MIN_SPAN).max(0.0)
    }

    fn clamped_end(&self, t: f64) -> f64 {
        t.max(self.start + MIN_SPAN).min(self.duration)
    }

    fn seek(&mut self, t: f64, media: &mut dyn MediaElement) {
        self.playback = t.clamp(0.0, self.duration);
        media.seek(self.playback);
    }

    // ── Dragging ──────────────────────────────────────────────────────────────

    /// Grab a handle. Playback pauses for the duration of the drag.
    pub fn begin_drag(&mut self, handle: RangeHandle, media: &mut dyn MediaElement) {
        if !self.is_active() {
            return;
        }
        if !media.is_paused() {
            media.pause();
        }
        self.dragging = Some(handle);
    }

    /// Move the grabbed handle to `t`. No-op without an active drag.
    pub fn drag_to(&mut self, t: f64, media: &mut dyn MediaElement) {
        match self.dragging {
            Some(RangeHandle::Start) => self.drag_start_to(t, media),
            Some(RangeHandle::End)   => self.drag_end_to(t, media),
            None => {}
        }
    }

    pub fn end_drag(&mut self) {
        self.dragging = None;
    }

    /// Start handle follows `t`; the preview seeks to the new start.
    pub fn drag_start_to(&mut self, t: f64, media: &mut dyn MediaElement) {
        if !self.is_active() {
            return;
        }
        self.start = self.clamped_start(t);
        let start = self.start;
        self.seek(start, media);
    }

    /// End handle follows `t`. The playhead is left alone.
    pub fn drag_end_to(&mut self, t: f64, _media: &mut dyn MediaElement) {
        if !self.is_active() {
            return;
        }
        self.end = self.clamped_end(t);
    }

    /// Click on the track: the nearer handle jumps to `t` (ties go to the
    /// start handle) and the preview always seeks to the click position.
    pub fn click_track(&mut self, t: f64, media: &mut dyn MediaElement) {
        if !self.is_active() || self.dragging.is_some() {
            return;
        }
        let t = t.clamp(0.0, self.duration);
        if (t - self.start).abs() <= (t - self.end).abs() {
            self.start = self.clamped_start(t);
        } else {
            self.end = self.clamped_end(t);
        }
        self.seek(t, media);
    }

    // ── Programmatic setters ─────────────────────────────────────────────────

    pub fn set_start(&mut self, t: f64, media: &mut dyn MediaElement) {
        self.drag_start_to(t, media);
    }

    /// Set the end and seek the preview to it.
    pub fn set_end(&mut self, t: f64, media: &mut dyn MediaElement) {
        if !self.is_active() {
            return;
        }
        self.end = self.clamped_end(t);
        let end = self.end;
        self.seek(end, media);
    }

    /// Back to the full `[0, duration)` range with the playhead at 0.
    pub fn reset(&mut self, media: &mut dyn MediaElement) {
        if !self.is_active() {
            return;
        }
        self.start    = 0.0;
        self.end      = self.duration;
        self.dragging = None;
        self.seek(0.0, media);
    }

    /// Mirror a playback time update from the media element.
    pub fn sync_playback(&mut self, position: f64) {
        if position.is_finite() {
            self.playback = position.clamp(0.0, self.duration);
        }
    }

    // ── HH:MM:SS text fields ─────────────────────────────────────────────────

    pub fn start_field(&self) -> String {
        format_time_for_input(self.start)
    }

    pub fn end_field(&self) -> String {
        format_time_for_input(self.end)
    }

    /// Commit an edited start field. A start at or past the typed end first
    /// pushes the end out to `min(start + 1, duration)`.
    pub fn apply_start_field(&mut self, start_text: &str, end_text: &str, media: &mut dyn MediaElement) {
        if !self.is_active() {
            return;
        }
        let start = parse_time_input(start_text);
        let end   = parse_time_input(end_text);
        if start >= end {
            let new_end = (start + MIN_SPAN).min(self.duration);
            self.set_end(new_end, media);
        }
        self.set_start(start, media);
    }

    /// Commit an edited end field, clamped to the media and kept past start.
    pub fn apply_end_field(&mut self, start_text: &str, end_text: &str, media: &mut dyn MediaElement) {
        if !self.is_active() {
            return;
        }
        let start = parse_time_input(start_text);
        let mut end = parse_time_input(end_text).min(self.duration);
        if end <= start {
            end = (start + MIN_SPAN).min(self.duration);
        }
        self.set_end(end, media);
    }
}

// ── Ticks ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickSpacing {
    pub major: f64,
    pub minor: f64,
}

impl TickSpacing {
    pub fn for_duration(duration: f64) -> Self {
        let (major, minor) = if duration <= 60.0 {
            (10.0, 2.0)
        } else if duration <= 300.0 {
            (30.0, 10.0)
        } else if duration <= 1800.0 {
            (120.0, 30.0)
        } else {
            (300.0, 60.0)
        };
        Self { major, minor }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickLabel {
    pub seconds:  f64,
    /// Position along the track, 0.0..=1.0.
    pub fraction: f64,
    pub text:     String,
}

/// A label at every major boundary from 0 through `duration` inclusive.
pub fn tick_labels(duration: f64) -> Vec<TickLabel> {
    if !(duration.is_finite() && duration > 0.0) {
        return Vec::new();
    }
    let spacing = TickSpacing::for_duration(duration);
    let mut out = Vec::new();
    let mut i = 0u32;
    loop {
        let t = spacing.major * i as f64;
        if t > duration {
            break;
        }
        out.push(TickLabel { seconds: t, fraction: t / duration, text: format_time(t) });
        i += 1;
    }
    out
}

/// Track fractions of every minor tick that is not also a major tick.
pub fn minor_ticks(duration: f64) -> Vec<f64> {
    if !(duration.is_finite() && duration > 0.0) {
        return Vec::new();
    }
    let spacing = TickSpacing::for_duration(duration);
    let per_major = (spacing.major / spacing.minor).round() as u32;
    let mut out = Vec::new();
    let mut i = 0u32;
    loop {
        let t = spacing.minor * i as f64;
        if t > duration {
            break;
        }
        if per_major == 0 || i % per_major != 0 {
            out.push(t / duration);
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::PreviewPlayer;

    fn setup(duration: f64) -> (RangeSelector, PreviewPlayer) {
        let mut sel = RangeSelector::new();
        let mut player = PreviewPlayer::new();
        sel.load(duration);
        player.load(duration);
        (sel, player)
    }

    fn assert_invariants(sel: &RangeSelector) {
        assert!(sel.start() >= 0.0, "start {} < 0", sel.start());
        assert!(sel.end() - sel.start() >= MIN_SPAN - 1e-9, "span {}..{}", sel.start(), sel.end());
        assert!(sel.end() <= sel.duration(), "end {} > duration", sel.end());
        assert!(sel.playback_position() >= 0.0 && sel.playback_position() <= sel.duration());
    }

    #[test]
    fn load_selects_everything() {
        let (sel, _) = setup(45.0);
        assert_eq!((sel.start(), sel.end()), (0.0, 45.0));
        assert!(sel.is_full_range());
    }

    #[test]
    fn start_drag_is_capped_below_end_and_seeks() {
        let (mut sel, mut p) = setup(45.0);
        sel.drag_end_to(20.0, &mut p);
        sel.drag_start_to(30.0, &mut p);
        assert_eq!(sel.start(), 19.0);
        assert_eq!(p.current_time(), 19.0);
        assert_eq!(sel.playback_position(), 19.0);
        sel.drag_start_to(-5.0, &mut p);
        assert_eq!(sel.start(), 0.0);
    }

    #[test]
    fn end_drag_stays_past_start_and_inside_media() {
        let (mut sel, mut p) = setup(45.0);
        sel.drag_start_to(10.0, &mut p);
        let playhead = p.current_time();
        sel.drag_end_to(3.0, &mut p);
        assert_eq!(sel.end(), 11.0);
        sel.drag_end_to(99.0, &mut p);
        assert_eq!(sel.end(), 45.0);
        assert_eq!(p.current_time(), playhead);
    }

    #[test]
    fn begin_drag_pauses_playback() {
        let (mut sel, mut p) = setup(45.0);
        p.play();
        sel.begin_drag(RangeHandle::End, &mut p);
        assert!(p.is_paused());
        sel.drag_to(30.0, &mut p);
        assert_eq!(sel.end(), 30.0);
        sel.end_drag();
        sel.drag_to(10.0, &mut p);
        assert_eq!(sel.end(), 30.0);
    }

    #[test]
    fn click_moves_nearest_handle_and_always_seeks() {
        let (mut sel, mut p) = setup(40.0);
        sel.click_track(30.0, &mut p);
        assert_eq!(sel.end(), 30.0);
        assert_eq!(sel.start(), 0.0);
        assert_eq!(p.current_time(), 30.0);

        sel.click_track(5.0, &mut p);
        assert_eq!(sel.start(), 5.0);
        assert_eq!(p.current_time(), 5.0);
    }

    #[test]
    fn click_tie_goes_to_start() {
        let (mut sel, mut p) = setup(20.0);
        sel.click_track(10.0, &mut p);
        assert_eq!(sel.start(), 10.0);
        assert_eq!(sel.end(), 20.0);
    }

    #[test]
    fn reset_restores_full_span_and_rewinds() {
        let (mut sel, mut p) = setup(45.0);
        sel.set_start(10.0, &mut p);
        sel.set_end(20.0, &mut p);
        assert_eq!(p.current_time(), 20.0);
        sel.reset(&mut p);
        assert_eq!((sel.start(), sel.end()), (0.0, 45.0));
        assert_eq!(p.current_time(), 0.0);
    }

    #[test]
    fn text_fields_follow_the_same_clamps() {
        let (mut sel, mut p) = setup(45.0);
        sel.apply_end_field("00:00:00", "00:00:20", &mut p);
        sel.apply_start_field("00:00:10", "00:00:20", &mut p);
        assert_eq!((sel.start(), sel.end()), (10.0, 20.0));
        assert_eq!(sel.start_field(), "00:00:10");
        assert_eq!(sel.end_field(), "00:00:20");

        // start past end drags the end along
        sel.apply_start_field("00:00:30", "00:00:20", &mut p);
        assert_eq!((sel.start(), sel.end()), (30.0, 31.0));

        // end past the media clamps
        sel.apply_end_field("00:00:30", "01:00:00", &mut p);
        assert_eq!(sel.end(), 45.0);

        // garbage reads as zero and is pushed past start
        sel.apply_end_field("00:00:30", "garbage", &mut p);
        assert_eq!(sel.end(), 31.0);
        assert_invariants(&sel);
    }

    #[test]
    fn span_never_drops_below_one_second() {
        let (mut sel, mut p) = setup(90.0);
        // Deterministic pseudo-random operation sequence.
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        for _ in 0..2000 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let t = (seed % 12_000) as f64 / 100.0 - 10.0;
            match seed % 7 {
                0 => sel.drag_start_to(t, &mut p),
                1 => sel.drag_end_to(t, &mut p),
                2 => sel.click_track(t, &mut p),
                3 => sel.set_start(t, &mut p),
                4 => sel.set_end(t, &mut p),
                5 => sel.sync_playback(t),
                _ => {
                    sel.begin_drag(if t > 40.0 { RangeHandle::End } else { RangeHandle::Start }, &mut p);
                    sel.drag_to(t, &mut p);
                    sel.end_drag();
                }
            }
            assert_invariants(&sel);
        }
    }

    #[test]
    fn inert_without_media() {
        let mut sel = RangeSelector::new();
        let mut p = PreviewPlayer::new();
        sel.drag_start_to(5.0, &mut p);
        sel.click_track(5.0, &mut p);
        assert_eq!((sel.start(), sel.end()), (0.0, 0.0));
        assert!(!sel.is_active());
    }

    #[test]
    fn tick_spacing_thresholds() {
        assert_eq!(TickSpacing::for_duration(60.0), TickSpacing { major: 10.0, minor: 2.0 });
        assert_eq!(TickSpacing::for_duration(61.0), TickSpacing { major: 30.0, minor: 10.0 });
        assert_eq!(TickSpacing::for_duration(1800.0), TickSpacing { major: 120.0, minor: 30.0 });
        assert_eq!(TickSpacing::for_duration(1801.0), TickSpacing { major: 300.0, minor: 60.0 });
    }

    #[test]
    fn labels_cover_zero_through_duration() {
        let labels = tick_labels(45.0);
        let secs: Vec<f64> = labels.iter().map(|l| l.seconds).collect();
        assert_eq!(secs, vec![0.0, 10.0, 20.0, 30.0, 40.0]);
        assert_eq!(labels[1].text, "00:10");

        let labels = tick_labels(60.0);
        assert_eq!(labels.last().unwrap().seconds, 60.0);
        assert_eq!(labels.last().unwrap().fraction, 1.0);
        assert!(tick_labels(0.0).is_empty());
    }

    #[test]
    fn minor_ticks_skip_major_positions() {
        let minors = minor_ticks(20.0);
        // 2,4,6,8,12,14,16,18 → 8 ticks
        assert_eq!(minors.len(), 8);
        assert!(!minors.contains(&0.5));
    }
}
