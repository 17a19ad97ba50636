// crates/clipcut-media/src/lib.rs
//
// No egui dependency. Communicates with clipcut-ui via channels only.
//
// To add a new engine backend:
//   1. Implement `ModernEngine` (or `LegacyEngine`) in a new module here
//   2. Register its constructor on an `EngineLibrary`
//   3. Hand that library to `EngineWorker::spawn`

pub mod cli_engine;
pub mod engine;
pub mod probe;
pub mod session;
pub mod worker;

// Re-export the main public API so clipcut-ui imports are simple.
pub use engine::{EngineAdapter, EngineLibrary, LegacyEngine, ModernEngine};
pub use probe::ProbeResult;
pub use session::{EngineNotice, EnginePhase, EngineSession};
pub use worker::EngineWorker;
