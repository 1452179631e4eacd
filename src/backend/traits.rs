//! Collaborator traits
//!
//! These traits define the narrow interface through which the stage talks to
//! the graphics backend: a command encoder used while a pass executes, and a
//! pipeline compiler used while layouts are built.

use crate::backend::types::*;
use crate::render_graph::ResourceId;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to create shader: {0}")]
    ShaderCreationFailed(String),
    #[error("Failed to create pipeline: {0}")]
    PipelineCreationFailed(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a compiled graphics pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineHandle(u64);

impl PipelineHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Handle to a shader module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderModuleHandle(u64);

impl ShaderModuleHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Records GPU commands while a render-graph pass executes.
///
/// Commands are recorded, not executed; submission and synchronization are
/// the backend's business.
pub trait CommandEncoder {
    /// Write bytes into a buffer resource
    fn write_buffer(&mut self, resource: ResourceId, offset: u64, data: &[u8]);

    /// Bind a graphics pipeline
    fn bind_pipeline(&mut self, pipeline: PipelineHandle);

    /// Set the data of a named shader argument
    fn set_argument_data(&mut self, name: &str, data: &[u8]);

    /// Set viewports starting at `first`
    fn set_viewports(&mut self, first: u32, viewports: &[Viewport]);

    /// Bind vertex buffers to consecutive slots starting at `first_binding`
    fn bind_vertex_buffers(&mut self, first_binding: u32, bindings: &[VertexBufferBinding]);

    /// Bind an index buffer
    fn bind_index_buffer(&mut self, resource: ResourceId, offset: u64, format: IndexFormat);

    /// Draw non-indexed primitives
    fn draw(&mut self, vertex_count: u32);

    /// Draw indexed primitives
    fn draw_indexed(&mut self, index_count: u32);
}

/// Builds shader modules and graphics pipelines.
///
/// Calls are synchronous; callers cache the returned handles.
pub trait PipelineCompiler: Send {
    /// Create a shader module
    fn create_shader_module(
        &mut self,
        desc: &ShaderModuleDescriptor,
    ) -> BackendResult<ShaderModuleHandle>;

    /// Compile a graphics pipeline
    fn compile_pipeline(
        &mut self,
        desc: &GraphicsPipelineDescriptor,
    ) -> BackendResult<PipelineHandle>;
}
