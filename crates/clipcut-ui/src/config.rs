// crates/clipcut-ui/src/config.rs
//
// User configuration: `<config dir>/clipcut.toml`.
//
//   [engine]
//   log               = true
//   core_path         = "ffmpeg"          # overridden by $CLIPCUT_FFMPEG
//   wasm_path         = "..."             # optional, passed through to the engine
//   load_timeout_secs = 300
//
//   [download]
//   use_dialog   = true                   # false → write straight to `directory`
//   max_attempts = 3
//   backoff_ms   = 500
//   directory    = "/home/me/Downloads"   # optional, defaults to the OS download dir
//
// A missing file means defaults. A malformed file is logged and ignored.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use clipcut_core::job::DEFAULT_LOAD_TIMEOUT;
use clipcut_core::retry::RetryPolicy;
use clipcut_core::EngineConfig;

pub const CONFIG_FILE: &str = "clipcut.toml";
pub const FFMPEG_ENV:  &str = "CLIPCUT_FFMPEG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub log:               bool,
    pub core_path:         String,
    pub wasm_path:         Option<String>,
    pub load_timeout_secs: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            log:               true,
            core_path:         "ffmpeg".into(),
            wasm_path:         None,
            load_timeout_secs: DEFAULT_LOAD_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSection {
    pub use_dialog:   bool,
    pub max_attempts: u32,
    pub backoff_ms:   u64,
    pub directory:    Option<PathBuf>,
}

impl Default for DownloadSection {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            use_dialog:   true,
            max_attempts: policy.max_attempts,
            backoff_ms:   policy.backoff.as_millis() as u64,
            directory:    None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine:   EngineSection,
    pub download: DownloadSection,
}

impl AppConfig {
    /// `<config dir>/clipcut.toml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "clipcut").map(|d| d.config_dir().join(CONFIG_FILE))
    }

    /// Defaults ← file ← environment.
    pub fn load() -> Self {
        let mut cfg = match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None       => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg
    }

    pub fn load_from(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(t)  => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!("config {}: {e}; using defaults", path.display());
                return Self::default();
            }
        };
        match toml::from_str::<AppConfig>(&text) {
            Ok(cfg) => {
                info!("config loaded from {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("config {} is malformed: {e}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(FFMPEG_ENV).filter(|p| !p.trim().is_empty()) {
            info!("{FFMPEG_ENV} overrides engine core path: {path}");
            self.engine.core_path = path;
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            log:          self.engine.log,
            core_path:    self.engine.core_path.clone(),
            wasm_path:    self.engine.wasm_path.clone(),
            load_timeout: Duration::from_secs(self.engine.load_timeout_secs.max(1)),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.download.max_attempts, Duration::from_millis(self.download.backoff_ms))
    }

    /// Where fallback downloads land: configured dir, OS download dir, or temp.
    pub fn download_dir(&self) -> PathBuf {
        self.download.directory.clone()
            .or_else(|| UserDirs::new().and_then(|u| u.download_dir().map(Path::to_path_buf)))
            .unwrap_or_else(std::env::temp_dir)
    }
}
