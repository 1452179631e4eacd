//! Geometry catalog: buffer views, accessors and meshes.
//!
//! The catalog is append-only. Entities refer to each other by index, and
//! every index is checked when the referring entity is added, so lookups of
//! stored references never fail later on.

use crate::backend::traits::PipelineHandle;
use crate::backend::types::{IndexBufferBinding, VertexBufferBinding};
use crate::error::{ReferenceKind, StageError, StageResult};
use crate::mesh::{AttributeSemantic, CompoundType, NumType, VertexInputLayout};
use crate::stage::buffer_store::{BufferIndex, BufferStore};

/// Maximum number of min/max bound values an accessor carries (one mat4).
pub const MAX_BOUND_COMPONENTS: usize = 16;

macro_rules! catalog_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn raw(self) -> u32 {
                self.0
            }

            pub(crate) fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

catalog_index!(
    /// Index of a buffer view in the catalog
    BufferViewIndex
);
catalog_index!(
    /// Index of an accessor in the catalog
    AccessorIndex
);
catalog_index!(
    /// Index of a mesh in the catalog
    MeshIndex
);

/// What a buffer view holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferViewKind {
    #[default]
    Vertex,
    Index,
}

/// Byte range of a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferView {
    pub buffer: BufferIndex,
    pub offset: u32,
    pub length: u32,
    /// Bytes between elements; 0 means tightly packed
    pub stride: u32,
    pub kind: BufferViewKind,
}

impl BufferView {
    /// Create a vertex data view without explicit stride.
    pub fn new(buffer: BufferIndex, offset: u32, length: u32) -> Self {
        Self {
            buffer,
            offset,
            length,
            stride: 0,
            kind: BufferViewKind::Vertex,
        }
    }

    /// Create an index data view.
    pub fn indices(buffer: BufferIndex, offset: u32, length: u32) -> Self {
        Self::new(buffer, offset, length).with_kind(BufferViewKind::Index)
    }

    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_kind(mut self, kind: BufferViewKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Typed elements within a buffer view
#[derive(Debug, Clone, PartialEq)]
pub struct Accessor {
    pub buffer_view: BufferViewIndex,
    pub num_type: NumType,
    pub compound_type: CompoundType,
    /// Byte offset within the view
    pub offset: u32,
    /// Number of elements
    pub count: u32,
    pub min: Option<[f32; MAX_BOUND_COMPONENTS]>,
    pub max: Option<[f32; MAX_BOUND_COMPONENTS]>,
    pub normalized: bool,
    /// Sparse storage is recorded but not resolved
    pub sparse: bool,
}

impl Accessor {
    pub fn new(
        buffer_view: BufferViewIndex,
        num_type: NumType,
        compound_type: CompoundType,
        count: u32,
    ) -> Self {
        Self {
            buffer_view,
            num_type,
            compound_type,
            offset: 0,
            count,
            min: None,
            max: None,
            normalized: false,
            sparse: false,
        }
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Set min/max bounds. Values beyond 16 are ignored, missing ones are 0.
    pub fn with_bounds(mut self, min: &[f32], max: &[f32]) -> Self {
        self.min = Some(pack_bounds(min));
        self.max = Some(pack_bounds(max));
        self
    }

    pub fn with_normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    pub fn with_sparse(mut self, sparse: bool) -> Self {
        self.sparse = sparse;
        self
    }

    pub fn components(&self) -> u32 {
        self.compound_type.component_count()
    }

    /// Size in bytes of one tightly packed element
    pub fn element_size(&self) -> u32 {
        self.num_type.size() * self.components()
    }
}

fn pack_bounds(values: &[f32]) -> [f32; MAX_BOUND_COMPONENTS] {
    let mut packed = [0.0; MAX_BOUND_COMPONENTS];
    for (slot, value) in packed.iter_mut().zip(values) {
        *slot = *value;
    }
    packed
}

/// Semantic role bound to an accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub semantic: AttributeSemantic,
    /// Instance of the role, e.g. the texture coordinate set
    pub set_index: u32,
    pub accessor: AccessorIndex,
}

impl Attribute {
    pub fn new(semantic: AttributeSemantic, accessor: AccessorIndex) -> Self {
        Self {
            semantic,
            set_index: 0,
            accessor,
        }
    }

    pub fn with_set_index(mut self, set_index: u32) -> Self {
        self.set_index = set_index;
        self
    }
}

/// Description of a primitive passed to [`GeometryCatalog::add_mesh`]
#[derive(Debug, Clone, Default)]
pub struct PrimitiveInfo {
    pub attributes: Vec<Attribute>,
    pub indices: Option<AccessorIndex>,
}

impl PrimitiveInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, semantic: AttributeSemantic, accessor: AccessorIndex) -> Self {
        self.attributes.push(Attribute::new(semantic, accessor));
        self
    }

    pub fn with_indexed_attribute(
        mut self,
        semantic: AttributeSemantic,
        set_index: u32,
        accessor: AccessorIndex,
    ) -> Self {
        self.attributes
            .push(Attribute::new(semantic, accessor).with_set_index(set_index));
        self
    }

    pub fn with_indices(mut self, accessor: AccessorIndex) -> Self {
        self.indices = Some(accessor);
        self
    }
}

/// Description of a mesh passed to [`GeometryCatalog::add_mesh`]
#[derive(Debug, Clone, Default)]
pub struct MeshInfo {
    pub name: Option<String>,
    pub primitives: Vec<PrimitiveInfo>,
}

impl MeshInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_primitive(mut self, primitive: PrimitiveInfo) -> Self {
        self.primitives.push(primitive);
        self
    }
}

/// Derived draw state of a primitive, built once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveLayout {
    pub pipeline: PipelineHandle,
    pub input_layout: VertexInputLayout,
    /// One entry per binding of `input_layout`
    pub vertex_buffers: Vec<VertexBufferBinding>,
    pub index_buffer: Option<IndexBufferBinding>,
}

/// Drawable part of a mesh
#[derive(Debug, Clone)]
pub struct Primitive {
    attributes: Vec<Attribute>,
    indices: Option<AccessorIndex>,
    vertex_count: u32,
    index_count: u32,
    layout: Option<PrimitiveLayout>,
}

impl Primitive {
    /// Attributes in semantic order
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn indices(&self) -> Option<AccessorIndex> {
        self.indices
    }

    pub fn is_indexed(&self) -> bool {
        self.indices.is_some()
    }

    /// Vertex count, known once the layout is built
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Index count, known once the layout is built
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn layout(&self) -> Option<&PrimitiveLayout> {
        self.layout.as_ref()
    }

    pub fn has_layout(&self) -> bool {
        self.layout.is_some()
    }

    pub(crate) fn set_layout(&mut self, layout: PrimitiveLayout, vertex_count: u32, index_count: u32) {
        self.layout = Some(layout);
        self.vertex_count = vertex_count;
        self.index_count = index_count;
    }
}

/// A list of primitives
#[derive(Debug, Clone)]
pub struct Mesh {
    name: Option<String>,
    primitives: Vec<Primitive>,
}

impl Mesh {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub(crate) fn primitives_mut(&mut self) -> &mut [Primitive] {
        &mut self.primitives
    }
}

/// Owns all buffer views, accessors and meshes of a stage
#[derive(Debug, Default)]
pub struct GeometryCatalog {
    buffer_views: Vec<BufferView>,
    accessors: Vec<Accessor>,
    meshes: Vec<Mesh>,
}

impl GeometryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_buffer_view(
        &mut self,
        view: BufferView,
        buffers: &BufferStore,
    ) -> StageResult<BufferViewIndex> {
        if !buffers.contains(view.buffer) {
            return Err(StageError::invalid_reference(
                ReferenceKind::Buffer,
                view.buffer.0,
                buffers.len(),
            ));
        }
        let index = BufferViewIndex(self.buffer_views.len() as u32);
        self.buffer_views.push(view);
        Ok(index)
    }

    pub fn add_accessor(&mut self, accessor: Accessor) -> StageResult<AccessorIndex> {
        self.check_buffer_view(accessor.buffer_view)?;
        let index = AccessorIndex(self.accessors.len() as u32);
        self.accessors.push(accessor);
        Ok(index)
    }

    /// Add a mesh. Attributes of every primitive are sorted by semantic, then
    /// set index; the sort is stable.
    pub fn add_mesh(&mut self, info: MeshInfo) -> StageResult<MeshIndex> {
        let mut primitives = Vec::with_capacity(info.primitives.len());
        for primitive in info.primitives {
            for attribute in &primitive.attributes {
                self.check_accessor(attribute.accessor)?;
            }
            if let Some(indices) = primitive.indices {
                self.check_accessor(indices)?;
            }

            let mut attributes = primitive.attributes;
            attributes.sort_by_key(|a| (a.semantic, a.set_index));
            primitives.push(Primitive {
                attributes,
                indices: primitive.indices,
                vertex_count: 0,
                index_count: 0,
                layout: None,
            });
        }

        let index = MeshIndex(self.meshes.len() as u32);
        self.meshes.push(Mesh {
            name: info.name,
            primitives,
        });
        Ok(index)
    }

    fn check_buffer_view(&self, index: BufferViewIndex) -> StageResult<()> {
        if index.index() < self.buffer_views.len() {
            Ok(())
        } else {
            Err(StageError::invalid_reference(
                ReferenceKind::BufferView,
                index.0,
                self.buffer_views.len(),
            ))
        }
    }

    fn check_accessor(&self, index: AccessorIndex) -> StageResult<()> {
        if index.index() < self.accessors.len() {
            Ok(())
        } else {
            Err(StageError::invalid_reference(
                ReferenceKind::Accessor,
                index.0,
                self.accessors.len(),
            ))
        }
    }

    pub fn buffer_view(&self, index: BufferViewIndex) -> Option<&BufferView> {
        self.buffer_views.get(index.index())
    }

    pub fn accessor(&self, index: AccessorIndex) -> Option<&Accessor> {
        self.accessors.get(index.index())
    }

    pub fn mesh(&self, index: MeshIndex) -> Option<&Mesh> {
        self.meshes.get(index.index())
    }

    /// Resolve an accessor together with its buffer view
    pub fn resolve(&self, index: AccessorIndex) -> StageResult<(&Accessor, &BufferView)> {
        let accessor = self.accessor(index).ok_or_else(|| {
            StageError::invalid_reference(ReferenceKind::Accessor, index.0, self.accessors.len())
        })?;
        let view = self.buffer_view(accessor.buffer_view).ok_or_else(|| {
            StageError::invalid_reference(
                ReferenceKind::BufferView,
                accessor.buffer_view.0,
                self.buffer_views.len(),
            )
        })?;
        Ok((accessor, view))
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub(crate) fn meshes_mut(&mut self) -> &mut [Mesh] {
        &mut self.meshes
    }

    pub fn buffer_view_count(&self) -> usize {
        self.buffer_views.len()
    }

    pub fn accessor_count(&self) -> usize {
        self.accessors.len()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn primitive_count(&self) -> usize {
        self.meshes.iter().map(|m| m.primitives.len()).sum()
    }
}
