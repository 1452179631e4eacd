//! Virtual resources for the render graph

use crate::backend::types::{BufferDescriptor, BufferUsage};

const BUFFER_TAG: u64 = 1 << 32;
const EXTERNAL_TAG: u64 = 2 << 32;

/// Unique identifier for a render graph resource
///
/// Buffer ids are derived from buffer content hashes, so the same buffer has
/// the same id in every frame's graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Id of the buffer resource with the given content hash
    pub const fn buffer(hash: u32) -> Self {
        Self(BUFFER_TAG | hash as u64)
    }

    pub(crate) const fn external(index: u32) -> Self {
        Self(EXTERNAL_TAG | index as u64)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_buffer(&self) -> bool {
        self.0 & !0xffff_ffff == BUFFER_TAG
    }
}

/// Virtual buffer resource in the render graph
#[derive(Debug, Clone)]
pub struct VirtualBuffer {
    pub id: ResourceId,
    pub desc: BufferDescriptor,
}

/// Resource type enumeration
#[derive(Debug, Clone)]
pub enum VirtualResource {
    Buffer(VirtualBuffer),
    /// External resource (like swapchain image)
    External { id: ResourceId, name: String },
}

impl VirtualResource {
    pub fn id(&self) -> ResourceId {
        match self {
            VirtualResource::Buffer(b) => b.id,
            VirtualResource::External { id, .. } => *id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            VirtualResource::Buffer(b) => b.desc.label.as_deref().unwrap_or("buffer"),
            VirtualResource::External { name, .. } => name,
        }
    }
}

/// How a pass uses a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceUsage {
    /// Buffer access with the given usage flags
    Buffer(BufferUsage),
    /// Color render target
    ColorAttachment,
}

/// Resource access declaration for a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAccess {
    pub resource: ResourceId,
    pub usage: ResourceUsage,
}
