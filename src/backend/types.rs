//! Common types shared between the stage and its collaborators

use crate::mesh::{NumType, VertexInputLayout};
use crate::render_graph::ResourceId;

/// Buffer usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferUsage(u32);

impl BufferUsage {
    pub const MAP_READ: Self = Self(1 << 0);
    pub const MAP_WRITE: Self = Self(1 << 1);
    pub const COPY_SRC: Self = Self(1 << 2);
    pub const COPY_DST: Self = Self(1 << 3);
    pub const INDEX: Self = Self(1 << 4);
    pub const VERTEX: Self = Self(1 << 5);
    pub const UNIFORM: Self = Self(1 << 6);
    pub const STORAGE: Self = Self(1 << 7);
    pub const INDIRECT: Self = Self(1 << 8);

    pub const fn empty() -> Self {
        Self(0)
    }

    /// `const` counterpart of `|`
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for BufferUsage {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for BufferUsage {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Buffer descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub size: u64,
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Index format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    Uint8,
    Uint16,
    Uint32,
}

impl IndexFormat {
    /// Index format for accessor data of the given component type, if it
    /// can hold indices at all.
    pub fn from_num_type(num_type: NumType) -> Option<Self> {
        match num_type {
            NumType::U8 => Some(Self::Uint8),
            NumType::U16 => Some(Self::Uint16),
            NumType::U32 => Some(Self::Uint32),
            _ => None,
        }
    }

    pub fn size(&self) -> u32 {
        match self {
            Self::Uint8 => 1,
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }
}

/// Size of the current render pass target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Viewport transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Viewport covering the whole extent with depth range 0..1
    pub fn full(extent: Extent2d) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// A buffer resource bound to a vertex input slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBufferBinding {
    pub buffer: ResourceId,
    pub offset: u64,
}

/// A buffer resource bound as index data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexBufferBinding {
    pub buffer: ResourceId,
    pub offset: u64,
    pub format: IndexFormat,
}

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Shader module descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderModuleDescriptor {
    pub path: String,
    pub stage: ShaderStage,
    /// Preprocessor defines, comma separated
    pub defines: String,
}

impl ShaderModuleDescriptor {
    pub fn new(path: impl Into<String>, stage: ShaderStage) -> Self {
        Self {
            path: path.into(),
            stage,
            defines: String::new(),
        }
    }
}

/// Graphics pipeline descriptor: shader stages plus derived vertex input state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsPipelineDescriptor {
    pub label: Option<String>,
    pub vertex_shader: super::ShaderModuleHandle,
    pub fragment_shader: super::ShaderModuleHandle,
    pub vertex_layout: VertexInputLayout,
}
