//! Backend abstraction layer
//!
//! Provides the collaborator traits the stage records commands and builds
//! pipelines through, plus headless implementations of both.

pub mod dummy;
pub mod recording;
pub mod traits;
pub mod types;

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_conversion;

pub use dummy::DummyPipelineCompiler;
pub use recording::{RecordedCommand, RecordingEncoder};
pub use traits::*;
pub use types::*;
