// crates/clipcut-core/src/playback.rs
//
// The media element the range selector is bound to, and the preview player
// that implements it for the desktop shell.
//
// PreviewPlayer state machine:
//
//   Empty ──load(d>0)──▶ Paused ──play──▶ Playing ──tick past end──▶ Ended
//                          ▲                 │                        │
//                          └──────pause──────┘◀───────play (rewinds)──┘
//
// `tick(dt)` advances the clock while Playing; the UI calls it once per frame
// with egui's stable dt.

use tracing::{debug, warn};

/// Minimal surface of a seekable, playable media element.
pub trait MediaElement {
    /// Media length in seconds; 0 when nothing is loaded.
    fn duration(&self) -> f64;
    fn current_time(&self) -> f64;
    fn seek(&mut self, seconds: f64);
    fn play(&mut self) -> bool;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Empty,
    Paused,
    Playing,
    Ended,
}

#[derive(Debug, Clone)]
pub struct PreviewPlayer {
    state:    PlayState,
    position: f64,
    duration: f64,
}

impl Default for PreviewPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewPlayer {
    pub fn new() -> Self {
        Self { state: PlayState::Empty, position: 0.0, duration: 0.0 }
    }

    /// Bind new media. A non-positive duration leaves the player empty.
    pub fn load(&mut self, duration: f64) {
        self.position = 0.0;
        if duration.is_finite() && duration > 0.0 {
            self.duration = duration;
            self.state    = PlayState::Paused;
        } else {
            self.duration = 0.0;
            self.state    = PlayState::Empty;
        }
    }

    pub fn unload(&mut self) {
        self.load(0.0);
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state != PlayState::Empty
    }

    /// Play/pause button behaviour. Returns the new state.
    pub fn toggle(&mut self) -> PlayState {
        match self.state {
            PlayState::Empty => warn!("no video loaded"),
            PlayState::Playing => self.pause(),
            PlayState::Paused | PlayState::Ended => {
                self.play();
            }
        }
        self.state
    }

    /// Advance the playback clock by `dt` seconds. Returns true while playing
    /// so the caller knows to keep repainting.
    pub fn tick(&mut self, dt: f64) -> bool {
        if self.state != PlayState::Playing {
            return false;
        }
        self.position += dt.max(0.0);
        if self.position >= self.duration {
            self.position = self.duration;
            self.state    = PlayState::Ended;
            debug!("preview playback ended");
            return false;
        }
        true
    }
}

impl MediaElement for PreviewPlayer {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn seek(&mut self, seconds: f64) {
        if !self.is_loaded() {
            return;
        }
        self.position = if seconds.is_finite() { seconds.clamp(0.0, self.duration) } else { 0.0 };
        if self.state == PlayState::Ended && self.position < self.duration {
            self.state = PlayState::Paused;
        }
    }

    fn play(&mut self) -> bool {
        match self.state {
            PlayState::Empty => {
                warn!("play requested with no media loaded");
                false
            }
            PlayState::Ended => {
                self.position = 0.0;
                self.state    = PlayState::Playing;
                true
            }
            _ => {
                self.state = PlayState::Playing;
                true
            }
        }
    }

    fn pause(&mut self) {
        if self.state == PlayState::Playing {
            self.state = PlayState::Paused;
        }
    }

    fn is_paused(&self) -> bool {
        self.state != PlayState::Playing
    }
}
