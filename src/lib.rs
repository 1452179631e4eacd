//! # RedLilium Stage
//!
//! Scene stage for the RedLilium render graph.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`Stage`] - Geometry owner: content-deduplicated buffers, buffer views,
//!   accessors and meshes, with vertex layouts derived per primitive
//! - [`RenderGraph`] - Host for two-phase render passes (`setup` declares
//!   resources, `execute` records commands)
//! - [`backend`] - Collaborator traits ([`CommandEncoder`], [`PipelineCompiler`])
//!   with a recording encoder and a dummy compiler for headless use
//!
//! ## Example
//!
//! ```ignore
//! use redlilium_stage::{DummyPipelineCompiler, RecordingEncoder, RenderGraph, Stage, StageConfig};
//!
//! let mut stage = Stage::new(StageConfig::default(), Box::new(DummyPipelineCompiler::new()))?;
//! // create_buffer, create_buffer_view, create_accessor, create_mesh...
//! stage.setup_pipelines()?;
//!
//! let mut graph = RenderGraph::with_extent(1280, 720);
//! stage.contribute_transfer(&mut graph);
//! stage.contribute_draw(&mut graph);
//!
//! let mut encoder = RecordingEncoder::new();
//! graph.run_frame(&mut encoder)?;
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod mesh;
pub mod render_graph;
pub mod stage;

// Re-export main types for convenience
pub use backend::{
    BackendError, BufferDescriptor, BufferUsage, CommandEncoder, DummyPipelineCompiler,
    IndexFormat, PipelineCompiler, PipelineHandle, RecordedCommand, RecordingEncoder,
};
pub use config::StageConfig;
pub use error::{ReferenceKind, StageError, StageResult};
pub use mesh::{AttributeSemantic, CompoundType, NumType, VertexInputLayout};
pub use render_graph::{CompiledGraph, GraphError, PassId, PassType, RenderGraph, RenderPass, ResourceId};
pub use stage::{
    Accessor, AccessorIndex, BufferIndex, BufferView, BufferViewIndex, BufferViewKind, MeshIndex,
    MeshInfo, PrimitiveInfo, PrimitiveLayout, Stage,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
