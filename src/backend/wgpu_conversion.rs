//! Conversions from stage types to wgpu types.

use crate::backend::types::{BufferUsage, IndexFormat};
use crate::mesh::{NumType, VertexInputAttribute, VertexInputLayout};

/// Convert an attribute's element type to a wgpu vertex format.
///
/// Returns `None` for combinations wgpu cannot express as a single vertex
/// attribute (3-component 8/16-bit data, normalized 32-bit integers, matrices).
pub fn vertex_format(num_type: NumType, components: u32, normalized: bool) -> Option<wgpu::VertexFormat> {
    use wgpu::VertexFormat as F;

    let format = match (num_type, components, normalized) {
        (NumType::F32, 1, _) => F::Float32,
        (NumType::F32, 2, _) => F::Float32x2,
        (NumType::F32, 3, _) => F::Float32x3,
        (NumType::F32, 4, _) => F::Float32x4,
        (NumType::F16, 2, _) => F::Float16x2,
        (NumType::F16, 4, _) => F::Float16x4,
        (NumType::F64, 1, _) => F::Float64,
        (NumType::F64, 2, _) => F::Float64x2,
        (NumType::F64, 3, _) => F::Float64x3,
        (NumType::F64, 4, _) => F::Float64x4,
        (NumType::U8, 2, true) => F::Unorm8x2,
        (NumType::U8, 4, true) => F::Unorm8x4,
        (NumType::U8, 2, false) => F::Uint8x2,
        (NumType::U8, 4, false) => F::Uint8x4,
        (NumType::I8, 2, true) => F::Snorm8x2,
        (NumType::I8, 4, true) => F::Snorm8x4,
        (NumType::I8, 2, false) => F::Sint8x2,
        (NumType::I8, 4, false) => F::Sint8x4,
        (NumType::U16, 2, true) => F::Unorm16x2,
        (NumType::U16, 4, true) => F::Unorm16x4,
        (NumType::U16, 2, false) => F::Uint16x2,
        (NumType::U16, 4, false) => F::Uint16x4,
        (NumType::I16, 2, true) => F::Snorm16x2,
        (NumType::I16, 4, true) => F::Snorm16x4,
        (NumType::I16, 2, false) => F::Sint16x2,
        (NumType::I16, 4, false) => F::Sint16x4,
        (NumType::U32, 1, false) => F::Uint32,
        (NumType::U32, 2, false) => F::Uint32x2,
        (NumType::U32, 3, false) => F::Uint32x3,
        (NumType::U32, 4, false) => F::Uint32x4,
        (NumType::I32, 1, false) => F::Sint32,
        (NumType::I32, 2, false) => F::Sint32x2,
        (NumType::I32, 3, false) => F::Sint32x3,
        (NumType::I32, 4, false) => F::Sint32x4,
        _ => return None,
    };
    Some(format)
}

/// Convert an index format. wgpu has no 8-bit indices.
pub fn index_format(format: IndexFormat) -> Option<wgpu::IndexFormat> {
    match format {
        IndexFormat::Uint8 => None,
        IndexFormat::Uint16 => Some(wgpu::IndexFormat::Uint16),
        IndexFormat::Uint32 => Some(wgpu::IndexFormat::Uint32),
    }
}

/// Convert buffer usage flags.
pub fn buffer_usages(usage: BufferUsage) -> wgpu::BufferUsages {
    let pairs = [
        (BufferUsage::MAP_READ, wgpu::BufferUsages::MAP_READ),
        (BufferUsage::MAP_WRITE, wgpu::BufferUsages::MAP_WRITE),
        (BufferUsage::COPY_SRC, wgpu::BufferUsages::COPY_SRC),
        (BufferUsage::COPY_DST, wgpu::BufferUsages::COPY_DST),
        (BufferUsage::INDEX, wgpu::BufferUsages::INDEX),
        (BufferUsage::VERTEX, wgpu::BufferUsages::VERTEX),
        (BufferUsage::UNIFORM, wgpu::BufferUsages::UNIFORM),
        (BufferUsage::STORAGE, wgpu::BufferUsages::STORAGE),
        (BufferUsage::INDIRECT, wgpu::BufferUsages::INDIRECT),
    ];

    pairs
        .iter()
        .filter(|(ours, _)| usage.contains(*ours))
        .fold(wgpu::BufferUsages::empty(), |acc, (_, theirs)| acc | *theirs)
}

/// A vertex buffer layout owning its attribute list, convertible to the
/// borrowed `wgpu::VertexBufferLayout`.
#[derive(Debug, Clone)]
pub struct OwnedVertexBufferLayout {
    pub array_stride: u64,
    pub step_mode: wgpu::VertexStepMode,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl OwnedVertexBufferLayout {
    pub fn as_wgpu(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }
}

fn vertex_attribute(attr: &VertexInputAttribute) -> Option<wgpu::VertexAttribute> {
    Some(wgpu::VertexAttribute {
        format: vertex_format(attr.num_type, attr.components, attr.normalized)?,
        offset: attr.offset as u64,
        shader_location: attr.location,
    })
}

/// Convert a derived vertex input layout to wgpu buffer layouts.
///
/// Returns `None` if any attribute has no wgpu vertex format.
pub fn vertex_buffer_layouts(layout: &VertexInputLayout) -> Option<Vec<OwnedVertexBufferLayout>> {
    layout
        .bindings
        .iter()
        .map(|binding| {
            let attributes = binding
                .attributes
                .iter()
                .map(vertex_attribute)
                .collect::<Option<Vec<_>>>()?;
            Some(OwnedVertexBufferLayout {
                array_stride: binding.stride as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
        })
        .collect()
}
