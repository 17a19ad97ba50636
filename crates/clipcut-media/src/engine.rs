// crates/clipcut-media/src/engine.rs
//
// The two transcoding engine API generations and the adapter that hides them.
//
// Engines are opaque collaborators: they load, hold a small virtual
// filesystem, run an argv, and report log lines and progress through
// callbacks. Every call returns `anyhow::Result` because an engine's failure
// text is all we get; EngineSession maps it into ExtractError.
//
// The generation is chosen once, when the session first loads, from whatever
// constructors the EngineLibrary carries. The modern API wins when both are
// present.

use anyhow::Result;
use tracing::info;

use clipcut_core::{EngineConfig, ExtractError};

use crate::cli_engine::CliEngine;

pub type LogHandler      = Box<dyn Fn(&str) + Send + Sync>;
pub type ProgressHandler = Box<dyn Fn(f64) + Send + Sync>;

// ── Engine generations ────────────────────────────────────────────────────────

/// Current engine API: configured at load, async-style file operations.
pub trait ModernEngine: Send {
    fn on_log(&mut self, handler: LogHandler);
    fn on_progress(&mut self, handler: ProgressHandler);
    fn load(&mut self, config: &EngineConfig) -> Result<()>;
    fn write_file(&mut self, name: &str, data: &[u8]) -> Result<()>;
    fn exec(&mut self, args: &[String]) -> Result<()>;
    fn read_file(&mut self, name: &str) -> Result<Vec<u8>>;
    fn delete_file(&mut self, name: &str) -> Result<()>;
    fn terminate(&mut self);
}

/// Older engine API: configured at construction, FS-style file operations.
pub trait LegacyEngine: Send {
    fn set_logger(&mut self, handler: LogHandler);
    fn set_progress(&mut self, handler: ProgressHandler);
    fn load(&mut self) -> Result<()>;
    fn fs_write_file(&mut self, name: &str, data: &[u8]) -> Result<()>;
    fn fs_read_file(&mut self, name: &str) -> Result<Vec<u8>>;
    fn fs_unlink(&mut self, name: &str) -> Result<()>;
    fn run(&mut self, args: &[String]) -> Result<()>;
    fn exit(&mut self);
}

// ── EngineAdapter ─────────────────────────────────────────────────────────────

/// One engine instance of either generation behind a single call surface.
pub enum EngineAdapter {
    Legacy(Box<dyn LegacyEngine>),
    Modern(Box<dyn ModernEngine>),
}

impl EngineAdapter {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineAdapter::Legacy(_) => "legacy",
            EngineAdapter::Modern(_) => "modern",
        }
    }

    pub fn install_handlers(&mut self, log: LogHandler, progress: ProgressHandler) {
        match self {
            EngineAdapter::Legacy(e) => { e.set_logger(log); e.set_progress(progress); }
            EngineAdapter::Modern(e) => { e.on_log(log); e.on_progress(progress); }
        }
    }

    pub fn load(&mut self, config: &EngineConfig) -> Result<()> {
        match self {
            EngineAdapter::Legacy(e) => e.load(),
            EngineAdapter::Modern(e) => e.load(config),
        }
    }

    pub fn write_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        match self {
            EngineAdapter::Legacy(e) => e.fs_write_file(name, data),
            EngineAdapter::Modern(e) => e.write_file(name, data),
        }
    }

    pub fn exec(&mut self, args: &[String]) -> Result<()> {
        match self {
            EngineAdapter::Legacy(e) => e.run(args),
            EngineAdapter::Modern(e) => e.exec(args),
        }
    }

    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        match self {
            EngineAdapter::Legacy(e) => e.fs_read_file(name),
            EngineAdapter::Modern(e) => e.read_file(name),
        }
    }

    pub fn delete_file(&mut self, name: &str) -> Result<()> {
        match self {
            EngineAdapter::Legacy(e) => e.fs_unlink(name),
            EngineAdapter::Modern(e) => e.delete_file(name),
        }
    }

    pub fn terminate(&mut self) {
        match self {
            EngineAdapter::Legacy(e) => e.exit(),
            EngineAdapter::Modern(e) => e.terminate(),
        }
    }
}

// ── EngineLibrary ─────────────────────────────────────────────────────────────

pub type ModernCtor = Box<dyn Fn() -> Result<Box<dyn ModernEngine>> + Send + Sync>;
pub type LegacyCtor = Box<dyn Fn(&EngineConfig) -> Result<Box<dyn LegacyEngine>> + Send + Sync>;

/// The engine constructors available in this process.
#[derive(Default)]
pub struct EngineLibrary {
    modern: Option<ModernCtor>,
    legacy: Option<LegacyCtor>,
}

impl EngineLibrary {
    /// No engine at all. Loading against it fails with EngineUnavailable.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The system ffmpeg binary driven as a modern engine.
    pub fn cli() -> Self {
        Self::empty().with_modern(|| Ok(Box::new(CliEngine::new()?) as Box<dyn ModernEngine>))
    }

    pub fn with_modern<F>(mut self, ctor: F) -> Self
    where
        F: Fn() -> Result<Box<dyn ModernEngine>> + Send + Sync + 'static,
    {
        self.modern = Some(Box::new(ctor));
        self
    }

    pub fn with_legacy<F>(mut self, ctor: F) -> Self
    where
        F: Fn(&EngineConfig) -> Result<Box<dyn LegacyEngine>> + Send + Sync + 'static,
    {
        self.legacy = Some(Box::new(ctor));
        self
    }

    /// Build one engine instance, preferring the modern API.
    pub fn instantiate(&self, config: &EngineConfig) -> Result<EngineAdapter, ExtractError> {
        if let Some(ctor) = &self.modern {
            let engine = ctor().map_err(|e| ExtractError::EngineLoadFailure(format!("{e:#}")))?;
            info!(kind = "modern", "engine instantiated");
            return Ok(EngineAdapter::Modern(engine));
        }
        if let Some(ctor) = &self.legacy {
            let engine = ctor(config).map_err(|e| ExtractError::EngineLoadFailure(format!("{e:#}")))?;
            info!(kind = "legacy", "engine instantiated");
            return Ok(EngineAdapter::Legacy(engine));
        }
        Err(ExtractError::EngineUnavailable)
    }
}

// ── Scripted engines for tests ────────────────────────────────────────────────
