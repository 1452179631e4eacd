//! Dummy pipeline compiler for testing and headless use.
//!
//! Hands out sequential handles without touching a GPU. The compiler state
//! is shared between clones, so a test can keep a clone and inspect what the
//! stage requested after handing the compiler over.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::traits::{BackendResult, PipelineCompiler, PipelineHandle, ShaderModuleHandle};
use crate::backend::types::{GraphicsPipelineDescriptor, ShaderModuleDescriptor};

#[derive(Debug, Default)]
struct DummyCompilerState {
    next_handle: u64,
    shader_modules: Vec<ShaderModuleDescriptor>,
    pipelines: Vec<GraphicsPipelineDescriptor>,
}

/// Dummy pipeline compiler.
#[derive(Debug, Clone, Default)]
pub struct DummyPipelineCompiler {
    state: Arc<Mutex<DummyCompilerState>>,
}

impl DummyPipelineCompiler {
    /// Create a new dummy compiler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the compiler name.
    pub fn name(&self) -> &'static str {
        "Dummy"
    }

    /// Number of shader modules created so far.
    pub fn shader_module_count(&self) -> usize {
        self.state.lock().shader_modules.len()
    }

    /// Number of pipelines compiled so far.
    pub fn pipeline_count(&self) -> usize {
        self.state.lock().pipelines.len()
    }

    /// Descriptors of all pipelines compiled so far.
    pub fn pipelines(&self) -> Vec<GraphicsPipelineDescriptor> {
        self.state.lock().pipelines.clone()
    }

    fn next_handle(state: &mut DummyCompilerState) -> u64 {
        state.next_handle += 1;
        state.next_handle
    }
}

impl PipelineCompiler for DummyPipelineCompiler {
    fn create_shader_module(
        &mut self,
        desc: &ShaderModuleDescriptor,
    ) -> BackendResult<ShaderModuleHandle> {
        log::trace!("DummyPipelineCompiler: creating shader module {}", desc.path);
        let mut state = self.state.lock();
        let handle = Self::next_handle(&mut state);
        state.shader_modules.push(desc.clone());
        Ok(ShaderModuleHandle::new(handle))
    }

    fn compile_pipeline(
        &mut self,
        desc: &GraphicsPipelineDescriptor,
    ) -> BackendResult<PipelineHandle> {
        log::trace!(
            "DummyPipelineCompiler: compiling pipeline {:?} ({} bindings)",
            desc.label,
            desc.vertex_layout.binding_count()
        );
        let mut state = self.state.lock();
        let handle = Self::next_handle(&mut state);
        state.pipelines.push(desc.clone());
        Ok(PipelineHandle::new(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::ShaderStage;
    use crate::mesh::VertexInputLayout;

    #[test]
    fn test_dummy_compiler() {
        let compiler = DummyPipelineCompiler::new();
        assert_eq!(compiler.name(), "Dummy");

        let mut handed_over = compiler.clone();
        let vert = handed_over
            .create_shader_module(&ShaderModuleDescriptor::new("a.vert", ShaderStage::Vertex))
            .unwrap();
        let frag = handed_over
            .create_shader_module(&ShaderModuleDescriptor::new("a.frag", ShaderStage::Fragment))
            .unwrap();
        assert_ne!(vert, frag);

        let pipeline = handed_over
            .compile_pipeline(&GraphicsPipelineDescriptor {
                label: None,
                vertex_shader: vert,
                fragment_shader: frag,
                vertex_layout: VertexInputLayout::new(),
            })
            .unwrap();
        assert_eq!(pipeline.raw(), 3);

        // State is shared between clones.
        assert_eq!(compiler.shader_module_count(), 2);
        assert_eq!(compiler.pipeline_count(), 1);
    }
}
