// crates/clipcut-core/src/lib.rs
//
// Plain data and pure logic shared by clipcut-media and clipcut-ui.
// No egui, no child processes, no threads.

pub mod clock;
pub mod error;
pub mod helpers;
pub mod job;
pub mod messages;
pub mod playback;
pub mod range;
pub mod registry;
pub mod retry;

pub use error::{ExtractError, FailureCategory, Result};
pub use job::{AudioFormat, ConversionJob, EngineConfig, SourceFile};
pub use messages::{WorkerEvent, WorkerRequest};
pub use registry::{BlobHandle, HandleRegistry};
