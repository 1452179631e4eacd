//! Binding-layout builder.
//!
//! Turns the sorted attributes of a primitive into vertex buffer bindings and
//! a pipeline. Consecutive attributes reading the same buffer view share one
//! binding (interleaved data); a change of buffer view opens the next
//! binding. When a view has no explicit stride, the binding stride is the
//! tightly packed size of its attributes.

use std::collections::HashMap;

use crate::backend::traits::{PipelineCompiler, PipelineHandle, ShaderModuleHandle};
use crate::backend::types::{
    GraphicsPipelineDescriptor, IndexBufferBinding, IndexFormat, ShaderModuleDescriptor,
    ShaderStage, VertexBufferBinding,
};
use crate::config::StageConfig;
use crate::error::{ReferenceKind, StageError, StageResult};
use crate::mesh::{VertexInputAttribute, VertexInputBinding, VertexInputLayout};
use crate::stage::buffer_store::{BufferIndex, BufferStore};
use crate::stage::catalog::{GeometryCatalog, Primitive, PrimitiveLayout};

/// Vertex input state derived from a primitive's accessors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedLayout {
    pub input_layout: VertexInputLayout,
    pub vertex_buffers: Vec<VertexBufferBinding>,
    pub index_buffer: Option<IndexBufferBinding>,
    pub vertex_count: u32,
    pub index_count: u32,
}

/// Derive the vertex input state of `primitive`.
///
/// Fails with `InvalidLayout` when a view's explicit stride is smaller than
/// the attributes it carries, and with `UnsupportedIndexType` when the index
/// accessor does not hold unsigned integers.
pub fn derive_layout(
    primitive: &Primitive,
    catalog: &GeometryCatalog,
    buffers: &BufferStore,
) -> StageResult<DerivedLayout> {
    let attributes = primitive.attributes();
    let mut input_layout = VertexInputLayout::new();
    let mut vertex_buffers = Vec::new();
    let mut location = 0;
    let mut cursor = 0;

    while cursor < attributes.len() {
        let (first, view) = catalog.resolve(attributes[cursor].accessor)?;
        let view_index = first.buffer_view;
        let mut binding = VertexInputBinding::new(view.stride);

        while let Some(attribute) = attributes.get(cursor) {
            let (accessor, _) = catalog.resolve(attribute.accessor)?;
            if accessor.buffer_view != view_index {
                break;
            }
            if accessor.sparse {
                log::warn!(
                    "Accessor {} is sparse; sparse storage is ignored for vertex input",
                    attribute.accessor.raw()
                );
            }
            binding.add_attribute(VertexInputAttribute::new(
                location,
                attribute.semantic,
                accessor.offset,
                accessor.num_type,
                accessor.components(),
                accessor.normalized,
            ));
            location += 1;
            cursor += 1;
        }

        if view.stride == 0 {
            binding.set_stride(binding.packed_size());
        }

        let buffer = buffer_resource(buffers, view.buffer)?;
        log::trace!(
            "Binding {}: view {} stride {} with {} attributes",
            input_layout.binding_count(),
            view_index.raw(),
            binding.stride,
            binding.attribute_count()
        );
        vertex_buffers.push(VertexBufferBinding {
            buffer,
            offset: view.offset as u64,
        });
        input_layout.push_binding(binding);
    }

    input_layout.validate().map_err(StageError::InvalidLayout)?;

    let vertex_count = match attributes.first() {
        Some(attribute) => catalog.resolve(attribute.accessor)?.0.count,
        None => 0,
    };

    let (index_buffer, index_count) = match primitive.indices() {
        Some(indices) => {
            let (accessor, view) = catalog.resolve(indices)?;
            let format = IndexFormat::from_num_type(accessor.num_type)
                .ok_or(StageError::UnsupportedIndexType(accessor.num_type))?;
            let binding = IndexBufferBinding {
                buffer: buffer_resource(buffers, view.buffer)?,
                offset: view.offset as u64 + accessor.offset as u64,
                format,
            };
            (Some(binding), accessor.count)
        }
        None => (None, 0),
    };

    Ok(DerivedLayout {
        input_layout,
        vertex_buffers,
        index_buffer,
        vertex_count,
        index_count,
    })
}

fn buffer_resource(
    buffers: &BufferStore,
    index: BufferIndex,
) -> StageResult<crate::render_graph::ResourceId> {
    buffers
        .get(index)
        .map(|buffer| buffer.resource())
        .ok_or_else(|| StageError::invalid_reference(ReferenceKind::Buffer, index.raw(), buffers.len()))
}

/// Builds and caches primitive layouts and their pipelines.
///
/// Shader modules are created once at construction. Pipelines are cached by
/// vertex input layout, so primitives of the same shape share one pipeline.
pub struct LayoutBuilder {
    compiler: Box<dyn PipelineCompiler>,
    vertex_shader: ShaderModuleHandle,
    fragment_shader: ShaderModuleHandle,
    pipelines: HashMap<VertexInputLayout, PipelineHandle>,
}

impl LayoutBuilder {
    pub fn new(mut compiler: Box<dyn PipelineCompiler>, config: &StageConfig) -> StageResult<Self> {
        let vertex_shader = compiler.create_shader_module(&ShaderModuleDescriptor::new(
            config.vertex_shader.as_str(),
            ShaderStage::Vertex,
        ))?;
        let fragment_shader = compiler.create_shader_module(&ShaderModuleDescriptor::new(
            config.fragment_shader.as_str(),
            ShaderStage::Fragment,
        ))?;
        Ok(Self {
            compiler,
            vertex_shader,
            fragment_shader,
            pipelines: HashMap::new(),
        })
    }

    /// Build the layout of every primitive that has none yet.
    ///
    /// Returns the number of primitives built. A primitive that fails is
    /// logged and left without layout; the others are still built and the
    /// first failure is returned once all were tried.
    pub fn build_all(
        &mut self,
        catalog: &mut GeometryCatalog,
        buffers: &BufferStore,
    ) -> StageResult<usize> {
        let pending: Vec<(usize, usize)> = catalog
            .meshes()
            .iter()
            .enumerate()
            .flat_map(|(m, mesh)| {
                mesh.primitives()
                    .iter()
                    .enumerate()
                    .filter(|(_, primitive)| !primitive.has_layout())
                    .map(move |(p, _)| (m, p))
            })
            .collect();

        let mut built = 0;
        let mut first_error = None;
        for &(mesh, primitive) in &pending {
            match self.build_one(catalog, buffers, mesh, primitive) {
                Ok(()) => built += 1,
                Err(err) => {
                    log::error!(
                        "Failed to build primitive {} of mesh {}: {}",
                        primitive,
                        mesh,
                        err
                    );
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(built),
        }
    }

    fn build_one(
        &mut self,
        catalog: &mut GeometryCatalog,
        buffers: &BufferStore,
        mesh: usize,
        primitive: usize,
    ) -> StageResult<()> {
        let derived = derive_layout(
            &catalog.meshes()[mesh].primitives()[primitive],
            catalog,
            buffers,
        )?;
        let pipeline = self.pipeline_for(&derived.input_layout)?;
        log::debug!(
            "Built primitive {} of mesh {}: {} bindings, {} vertices, {} indices, pipeline {}",
            primitive,
            mesh,
            derived.input_layout.binding_count(),
            derived.vertex_count,
            derived.index_count,
            pipeline.raw()
        );

        let layout = PrimitiveLayout {
            pipeline,
            input_layout: derived.input_layout,
            vertex_buffers: derived.vertex_buffers,
            index_buffer: derived.index_buffer,
        };
        catalog.meshes_mut()[mesh].primitives_mut()[primitive].set_layout(
            layout,
            derived.vertex_count,
            derived.index_count,
        );
        Ok(())
    }

    /// Get the pipeline for a layout, compiling it on first use.
    pub fn pipeline_for(&mut self, layout: &VertexInputLayout) -> StageResult<PipelineHandle> {
        if let Some(pipeline) = self.pipelines.get(layout) {
            return Ok(*pipeline);
        }
        let desc = GraphicsPipelineDescriptor {
            label: Some(format!("stage pipeline {}", self.pipelines.len())),
            vertex_shader: self.vertex_shader,
            fragment_shader: self.fragment_shader,
            vertex_layout: layout.clone(),
        };
        let pipeline = self.compiler.compile_pipeline(&desc)?;
        self.pipelines.insert(layout.clone(), pipeline);
        Ok(pipeline)
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyPipelineCompiler;
    use crate::mesh::{AttributeSemantic, CompoundType, NumType};
    use crate::stage::catalog::{Accessor, BufferView, MeshInfo, PrimitiveInfo};

    struct Fixture {
        buffers: BufferStore,
        catalog: GeometryCatalog,
        buffer: BufferIndex,
    }

    impl Fixture {
        fn new() -> Self {
            let mut buffers = BufferStore::new();
            let buffer = buffers.submit(&[0u8; 256], Some("geometry")).unwrap();
            Self {
                buffers,
                catalog: GeometryCatalog::new(),
                buffer,
            }
        }

        fn view(&mut self, offset: u32, stride: u32) -> crate::stage::BufferViewIndex {
            self.catalog
                .add_buffer_view(
                    BufferView::new(self.buffer, offset, 96).with_stride(stride),
                    &self.buffers,
                )
                .unwrap()
        }

        fn primitive(&mut self, info: PrimitiveInfo) -> &Primitive {
            let mesh = self
                .catalog
                .add_mesh(MeshInfo::new().with_primitive(info))
                .unwrap();
            &self.catalog.mesh(mesh).unwrap().primitives()[0]
        }
    }

    #[test]
    fn test_interleaved_attributes_share_binding() {
        let mut fx = Fixture::new();
        let view = fx.view(16, 0);
        let position = fx
            .catalog
            .add_accessor(Accessor::new(view, NumType::F32, CompoundType::Vec3, 4))
            .unwrap();
        let normal = fx
            .catalog
            .add_accessor(Accessor::new(view, NumType::F32, CompoundType::Vec3, 4).with_offset(12))
            .unwrap();

        let info = PrimitiveInfo::new()
            .with_attribute(AttributeSemantic::Normal, normal)
            .with_attribute(AttributeSemantic::Position, position);
        let primitive = fx.primitive(info).clone();
        let derived = derive_layout(&primitive, &fx.catalog, &fx.buffers).unwrap();

        assert_eq!(derived.input_layout.binding_count(), 1);
        let binding = &derived.input_layout.bindings[0];
        assert_eq!(binding.stride, 24);
        assert_eq!(binding.attributes[0].semantic, AttributeSemantic::Position);
        assert_eq!(binding.attributes[0].location, 0);
        assert_eq!(binding.attributes[1].offset, 12);
        assert_eq!(binding.attributes[1].location, 1);
        assert_eq!(derived.vertex_buffers.len(), 1);
        assert_eq!(derived.vertex_buffers[0].offset, 16);
        assert_eq!(derived.vertex_count, 4);
        assert!(derived.index_buffer.is_none());
    }

    #[test]
    fn test_separate_views_get_separate_bindings() {
        let mut fx = Fixture::new();
        let first = fx.view(0, 0);
        let second = fx.view(96, 0);
        let position = fx
            .catalog
            .add_accessor(Accessor::new(first, NumType::F32, CompoundType::Vec3, 3))
            .unwrap();
        let uv = fx
            .catalog
            .add_accessor(Accessor::new(second, NumType::F32, CompoundType::Vec2, 3))
            .unwrap();

        let primitive = fx
            .primitive(
                PrimitiveInfo::new()
                    .with_attribute(AttributeSemantic::TexCoord, uv)
                    .with_attribute(AttributeSemantic::Position, position),
            )
            .clone();
        let derived = derive_layout(&primitive, &fx.catalog, &fx.buffers).unwrap();

        assert_eq!(derived.input_layout.binding_count(), 2);
        assert_eq!(derived.input_layout.bindings[0].stride, 12);
        assert_eq!(derived.input_layout.bindings[1].stride, 8);
        assert_eq!(
            derived.vertex_buffers.iter().map(|b| b.offset).collect::<Vec<_>>(),
            vec![0, 96]
        );
    }

    #[test]
    fn test_explicit_stride_is_kept() {
        let mut fx = Fixture::new();
        let view = fx.view(0, 32);
        let position = fx
            .catalog
            .add_accessor(Accessor::new(view, NumType::F32, CompoundType::Vec3, 3))
            .unwrap();
        let primitive = fx
            .primitive(PrimitiveInfo::new().with_attribute(AttributeSemantic::Position, position))
            .clone();
        let derived = derive_layout(&primitive, &fx.catalog, &fx.buffers).unwrap();
        assert_eq!(derived.input_layout.bindings[0].stride, 32);
    }

    #[test]
    fn test_explicit_stride_too_small_is_invalid() {
        let mut fx = Fixture::new();
        let view = fx.view(0, 16);
        let position = fx
            .catalog
            .add_accessor(Accessor::new(view, NumType::F32, CompoundType::Vec3, 3))
            .unwrap();
        let normal = fx
            .catalog
            .add_accessor(Accessor::new(view, NumType::F32, CompoundType::Vec3, 3).with_offset(12))
            .unwrap();
        let primitive = fx
            .primitive(
                PrimitiveInfo::new()
                    .with_attribute(AttributeSemantic::Position, position)
                    .with_attribute(AttributeSemantic::Normal, normal),
            )
            .clone();
        assert!(matches!(
            derive_layout(&primitive, &fx.catalog, &fx.buffers),
            Err(StageError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_index_binding() {
        let mut fx = Fixture::new();
        let vertices = fx.view(0, 0);
        let index_view = fx
            .catalog
            .add_buffer_view(BufferView::indices(fx.buffer, 128, 64), &fx.buffers)
            .unwrap();
        let position = fx
            .catalog
            .add_accessor(Accessor::new(vertices, NumType::F32, CompoundType::Vec3, 4))
            .unwrap();
        let indices = fx
            .catalog
            .add_accessor(Accessor::new(index_view, NumType::U16, CompoundType::Scalar, 6).with_offset(4))
            .unwrap();

        let primitive = fx
            .primitive(
                PrimitiveInfo::new()
                    .with_attribute(AttributeSemantic::Position, position)
                    .with_indices(indices),
            )
            .clone();
        let derived = derive_layout(&primitive, &fx.catalog, &fx.buffers).unwrap();

        let index = derived.index_buffer.unwrap();
        assert_eq!(index.offset, 132);
        assert_eq!(index.format, IndexFormat::Uint16);
        assert_eq!(derived.index_count, 6);
        assert_eq!(derived.vertex_count, 4);
    }

    #[test]
    fn test_float_indices_are_rejected() {
        let mut fx = Fixture::new();
        let view = fx.view(0, 0);
        let indices = fx
            .catalog
            .add_accessor(Accessor::new(view, NumType::F32, CompoundType::Scalar, 3))
            .unwrap();
        let primitive = fx.primitive(PrimitiveInfo::new().with_indices(indices)).clone();
        assert!(matches!(
            derive_layout(&primitive, &fx.catalog, &fx.buffers),
            Err(StageError::UnsupportedIndexType(NumType::F32))
        ));
    }

    #[test]
    fn test_zero_attributes_is_degenerate() {
        let mut fx = Fixture::new();
        let primitive = fx.primitive(PrimitiveInfo::new()).clone();
        let derived = derive_layout(&primitive, &fx.catalog, &fx.buffers).unwrap();
        assert_eq!(derived.vertex_count, 0);
        assert_eq!(derived.input_layout.binding_count(), 0);
        assert!(derived.vertex_buffers.is_empty());
    }

    #[test]
    fn test_builder_shares_pipelines_between_equal_layouts() {
        let compiler = DummyPipelineCompiler::new();
        let mut builder =
            LayoutBuilder::new(Box::new(compiler.clone()), &StageConfig::default()).unwrap();
        assert_eq!(compiler.shader_module_count(), 2);

        let mut fx = Fixture::new();
        let view = fx.view(0, 0);
        let position = fx
            .catalog
            .add_accessor(Accessor::new(view, NumType::F32, CompoundType::Vec3, 3))
            .unwrap();
        for _ in 0..2 {
            fx.catalog
                .add_mesh(MeshInfo::new().with_primitive(
                    PrimitiveInfo::new().with_attribute(AttributeSemantic::Position, position),
                ))
                .unwrap();
        }

        assert_eq!(builder.build_all(&mut fx.catalog, &fx.buffers).unwrap(), 2);
        assert_eq!(builder.pipeline_count(), 1);
        assert_eq!(compiler.pipeline_count(), 1);

        let handles: Vec<_> = fx
            .catalog
            .meshes()
            .iter()
            .map(|m| m.primitives()[0].layout().unwrap().pipeline)
            .collect();
        assert_eq!(handles[0], handles[1]);

        assert_eq!(builder.build_all(&mut fx.catalog, &fx.buffers).unwrap(), 0);
        assert_eq!(compiler.pipeline_count(), 1);
    }

    #[test]
    fn test_failed_primitive_does_not_block_later_ones() {
        let compiler = DummyPipelineCompiler::new();
        let mut builder =
            LayoutBuilder::new(Box::new(compiler.clone()), &StageConfig::default()).unwrap();

        let mut fx = Fixture::new();
        let narrow = fx.view(0, 4);
        let packed = fx.view(0, 0);
        let bad = fx
            .catalog
            .add_accessor(Accessor::new(narrow, NumType::F32, CompoundType::Vec3, 3))
            .unwrap();
        let good = fx
            .catalog
            .add_accessor(Accessor::new(packed, NumType::F32, CompoundType::Vec3, 3))
            .unwrap();
        for accessor in [bad, good] {
            fx.catalog
                .add_mesh(MeshInfo::new().with_primitive(
                    PrimitiveInfo::new().with_attribute(AttributeSemantic::Position, accessor),
                ))
                .unwrap();
        }

        for _ in 0..2 {
            assert!(matches!(
                builder.build_all(&mut fx.catalog, &fx.buffers),
                Err(StageError::InvalidLayout(_))
            ));
        }
        let meshes = fx.catalog.meshes();
        assert!(!meshes[0].primitives()[0].has_layout());
        assert!(meshes[1].primitives()[0].has_layout());
        assert_eq!(compiler.pipeline_count(), 1);
    }
}
