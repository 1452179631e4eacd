//! The scene stage.
//!
//! A [`Stage`] owns the geometry of a scene: deduplicated buffers, the
//! buffer views, accessors and meshes describing them, and the layouts
//! derived for drawing. It takes part in a [`RenderGraph`] through two
//! passes, one uploading new buffers and one drawing all meshes.
//!
//! # Example
//!
//! ```ignore
//! let mut stage = Stage::new(StageConfig::default(), Box::new(DummyPipelineCompiler::new()))?;
//! let buffer = stage.create_buffer(bytemuck::cast_slice(&positions), Some("positions"))?;
//! let view = stage.create_buffer_view(BufferView::new(buffer, 0, 36))?;
//! let accessor = stage.create_accessor(Accessor::new(view, NumType::F32, CompoundType::Vec3, 3))?;
//! stage.create_mesh(MeshInfo::new().with_primitive(
//!     PrimitiveInfo::new().with_attribute(AttributeSemantic::Position, accessor),
//! ))?;
//! stage.setup_pipelines()?;
//!
//! let mut graph = RenderGraph::with_extent(800, 600);
//! stage.contribute_transfer(&mut graph);
//! stage.contribute_draw(&mut graph);
//! graph.run_frame(&mut encoder)?;
//! ```

mod buffer_store;
mod catalog;
mod layout_builder;
mod passes;

pub use buffer_store::{
    content_hash, Buffer, BufferIndex, BufferMemory, BufferStore, DEFAULT_BUFFER_USAGE,
};
pub use catalog::{
    Accessor, AccessorIndex, Attribute, BufferView, BufferViewIndex, BufferViewKind,
    GeometryCatalog, Mesh, MeshIndex, MeshInfo, Primitive, PrimitiveInfo, PrimitiveLayout,
    MAX_BOUND_COMPONENTS,
};
pub use layout_builder::{derive_layout, DerivedLayout, LayoutBuilder};
pub use passes::{StageDrawPass, StageTransferPass};

use std::sync::Arc;

use glam::Vec3;
use parking_lot::{Mutex, MutexGuard};

use crate::backend::traits::PipelineCompiler;
use crate::config::StageConfig;
use crate::error::{ReferenceKind, StageError, StageResult};
use crate::mesh::AttributeSemantic;
use crate::render_graph::{PassId, PassType, RenderGraph};

/// Geometry shared between a stage and the passes it contributes
#[derive(Debug, Default)]
pub struct StageData {
    pub buffers: BufferStore,
    pub catalog: GeometryCatalog,
}

impl StageData {
    pub fn mesh(&self, mesh: MeshIndex) -> StageResult<&Mesh> {
        self.catalog.mesh(mesh).ok_or_else(|| {
            StageError::invalid_reference(ReferenceKind::Mesh, mesh.raw(), self.catalog.mesh_count())
        })
    }

    pub fn primitive(&self, mesh: MeshIndex, primitive: usize) -> StageResult<&Primitive> {
        let primitives = self.mesh(mesh)?.primitives();
        primitives.get(primitive).ok_or_else(|| {
            StageError::invalid_reference(ReferenceKind::Primitive, primitive as u32, primitives.len())
        })
    }

    /// Union of the position bounds of all primitives of a mesh.
    ///
    /// `None` if no position accessor of the mesh carries bounds.
    pub fn mesh_bounds(&self, mesh: MeshIndex) -> StageResult<Option<(Vec3, Vec3)>> {
        let mut bounds: Option<(Vec3, Vec3)> = None;
        for primitive in self.mesh(mesh)?.primitives() {
            let position = primitive
                .attributes()
                .iter()
                .find(|a| a.semantic == AttributeSemantic::Position && a.set_index == 0);
            let Some(position) = position else {
                continue;
            };
            let (accessor, _) = self.catalog.resolve(position.accessor)?;
            let (Some(min), Some(max)) = (accessor.min, accessor.max) else {
                continue;
            };
            let min = Vec3::from_slice(&min[..3]);
            let max = Vec3::from_slice(&max[..3]);
            bounds = Some(match bounds {
                Some((lo, hi)) => (lo.min(min), hi.max(max)),
                None => (min, max),
            });
        }
        Ok(bounds)
    }
}

/// A scene stage.
///
/// Catalog mutation and frame contribution are expected to happen on one
/// thread; the internal lock only lets contributed passes share the data.
pub struct Stage {
    config: StageConfig,
    data: Arc<Mutex<StageData>>,
    builder: LayoutBuilder,
}

impl Stage {
    /// Create a stage. Shader modules are created here, once.
    pub fn new(config: StageConfig, compiler: Box<dyn PipelineCompiler>) -> StageResult<Self> {
        let builder = LayoutBuilder::new(compiler, &config)?;
        log::info!(
            "Stage created (shaders: {}, {})",
            config.vertex_shader,
            config.fragment_shader
        );
        Ok(Self {
            config,
            data: Arc::new(Mutex::new(StageData::default())),
            builder,
        })
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Copy `bytes` into the stage. Identical content yields the same index.
    pub fn create_buffer(&mut self, bytes: &[u8], label: Option<&str>) -> StageResult<BufferIndex> {
        self.data.lock().buffers.submit(bytes, label)
    }

    /// Register shared memory without copying it. The stage drops its
    /// reference once the buffer is uploaded.
    pub fn create_buffer_shared(
        &mut self,
        bytes: Arc<[u8]>,
        label: Option<&str>,
    ) -> StageResult<BufferIndex> {
        self.data.lock().buffers.submit_shared(bytes, label)
    }

    pub fn create_buffer_view(&mut self, view: BufferView) -> StageResult<BufferViewIndex> {
        let mut data = self.data.lock();
        let StageData { buffers, catalog } = &mut *data;
        catalog.add_buffer_view(view, buffers)
    }

    pub fn create_accessor(&mut self, accessor: Accessor) -> StageResult<AccessorIndex> {
        self.data.lock().catalog.add_accessor(accessor)
    }

    pub fn create_mesh(&mut self, info: MeshInfo) -> StageResult<MeshIndex> {
        self.data.lock().catalog.add_mesh(info)
    }

    /// Build layouts and pipelines for every primitive that has none.
    ///
    /// Returns the number of primitives built; calling it again without new
    /// meshes builds nothing.
    pub fn setup_pipelines(&mut self) -> StageResult<usize> {
        let mut data = self.data.lock();
        let StageData { buffers, catalog } = &mut *data;
        let built = self.builder.build_all(catalog, buffers)?;
        if built > 0 {
            log::debug!(
                "Built {} primitive layouts ({} pipelines)",
                built,
                self.builder.pipeline_count()
            );
        }
        Ok(built)
    }

    /// Pass uploading pending buffers
    pub fn transfer_pass(&self) -> StageTransferPass {
        StageTransferPass::new(self.config.transfer_pass_name.clone(), self.data.clone())
    }

    /// Pass drawing all meshes into `color_target`
    pub fn draw_pass(&self, color_target: crate::render_graph::ResourceId) -> StageDrawPass {
        StageDrawPass::new(
            self.config.draw_pass_name.clone(),
            self.data.clone(),
            color_target,
            self.config.projection_argument.clone(),
        )
    }

    /// Add the transfer pass to `graph`.
    pub fn contribute_transfer(&self, graph: &mut RenderGraph) -> PassId {
        graph.add_pass(self.transfer_pass(), PassType::Transfer)
    }

    /// Add the draw pass to `graph`, registering the configured color target
    /// as an external resource if needed.
    pub fn contribute_draw(&self, graph: &mut RenderGraph) -> PassId {
        let color_target = graph.register_external(&self.config.color_target);
        graph.add_pass(self.draw_pass(color_target), PassType::Graphics)
    }

    pub fn pending_uploads(&self) -> Vec<BufferIndex> {
        self.data.lock().buffers.pending_uploads()
    }

    /// Flag a buffer as uploaded outside the transfer pass.
    pub fn mark_uploaded(&mut self, index: BufferIndex) -> StageResult<()> {
        self.data.lock().buffers.mark_uploaded(index)
    }

    /// Lock the stage data for inspection.
    ///
    /// Contributed passes lock the same data in setup and execute, and the
    /// lock is not re-entrant: drop the guard before compiling or executing
    /// a graph holding this stage's passes, or the frame deadlocks.
    pub fn lock(&self) -> MutexGuard<'_, StageData> {
        self.data.lock()
    }

    pub fn mesh_bounds(&self, mesh: MeshIndex) -> StageResult<Option<(Vec3, Vec3)>> {
        self.data.lock().mesh_bounds(mesh)
    }

    /// Cached layout of a primitive, if built
    pub fn primitive_layout(
        &self,
        mesh: MeshIndex,
        primitive: usize,
    ) -> StageResult<Option<PrimitiveLayout>> {
        Ok(self.data.lock().primitive(mesh, primitive)?.layout().cloned())
    }

    pub fn buffer_count(&self) -> usize {
        self.data.lock().buffers.len()
    }

    pub fn buffer_view_count(&self) -> usize {
        self.data.lock().catalog.buffer_view_count()
    }

    pub fn accessor_count(&self) -> usize {
        self.data.lock().catalog.accessor_count()
    }

    pub fn mesh_count(&self) -> usize {
        self.data.lock().catalog.mesh_count()
    }

    pub fn primitive_count(&self) -> usize {
        self.data.lock().catalog.primitive_count()
    }

    pub fn pipeline_count(&self) -> usize {
        self.builder.pipeline_count()
    }

    /// Destroy the stage, releasing buffer memory it still owns.
    ///
    /// Passes already added to a graph keep the geometry alive until the
    /// graph drops them.
    pub fn destroy(self) {
        let shared = Arc::strong_count(&self.data) - 1;
        {
            let data = self.data.lock();
            log::info!(
                "Destroying stage: {} buffers ({} pending upload), {} meshes, {} passes still registered",
                data.buffers.len(),
                data.buffers.pending_uploads().len(),
                data.catalog.mesh_count(),
                shared
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyPipelineCompiler;
    use crate::mesh::{CompoundType, NumType};

    fn stage() -> Stage {
        Stage::new(StageConfig::default(), Box::new(DummyPipelineCompiler::new())).unwrap()
    }

    #[test]
    fn test_mesh_bounds_union() {
        let mut stage = stage();
        let buffer = stage.create_buffer(&[0u8; 72], None).unwrap();
        let view = stage.create_buffer_view(BufferView::new(buffer, 0, 72)).unwrap();
        let a = stage
            .create_accessor(
                Accessor::new(view, NumType::F32, CompoundType::Vec3, 3)
                    .with_bounds(&[-1.0, 0.0, 0.0], &[1.0, 1.0, 0.0]),
            )
            .unwrap();
        let b = stage
            .create_accessor(
                Accessor::new(view, NumType::F32, CompoundType::Vec3, 3)
                    .with_offset(36)
                    .with_bounds(&[0.0, -2.0, -1.0], &[0.5, 0.5, 3.0]),
            )
            .unwrap();
        let mesh = stage
            .create_mesh(
                MeshInfo::new()
                    .with_primitive(PrimitiveInfo::new().with_attribute(AttributeSemantic::Position, a))
                    .with_primitive(PrimitiveInfo::new().with_attribute(AttributeSemantic::Position, b)),
            )
            .unwrap();

        let (min, max) = stage.mesh_bounds(mesh).unwrap().unwrap();
        assert_eq!(min, Vec3::new(-1.0, -2.0, -1.0));
        assert_eq!(max, Vec3::new(1.0, 1.0, 3.0));
    }

    #[test]
    fn test_mesh_bounds_without_bounds() {
        let mut stage = stage();
        let mesh = stage.create_mesh(MeshInfo::new()).unwrap();
        assert_eq!(stage.mesh_bounds(mesh).unwrap(), None);
        assert!(matches!(
            stage.mesh_bounds(MeshIndex(4)),
            Err(StageError::InvalidReference { kind: ReferenceKind::Mesh, .. })
        ));
    }

    #[test]
    fn test_primitive_lookup() {
        let mut stage = stage();
        let mesh = stage
            .create_mesh(MeshInfo::new().with_primitive(PrimitiveInfo::new()))
            .unwrap();
        assert_eq!(stage.primitive_layout(mesh, 0).unwrap(), None);
        assert!(matches!(
            stage.primitive_layout(mesh, 1),
            Err(StageError::InvalidReference { kind: ReferenceKind::Primitive, index: 1, len: 1 })
        ));

        stage.setup_pipelines().unwrap();
        assert!(stage.primitive_layout(mesh, 0).unwrap().is_some());
    }

    #[test]
    fn test_contributed_passes_share_data() {
        let mut stage = stage();
        let mut graph = RenderGraph::new();
        stage.contribute_transfer(&mut graph);
        stage.contribute_draw(&mut graph);
        stage.create_buffer(&[1, 2, 3], None).unwrap();

        let compiled = graph.compile().unwrap();
        assert_eq!(compiled.pass_order().len(), 2);
        assert_eq!(graph.pass_nodes()[0].name, "Stage Xfer");
        assert!(graph.get_external("swapchain").is_some());

        stage.destroy();
        assert_eq!(graph.pass_count(), 2);
    }
}
