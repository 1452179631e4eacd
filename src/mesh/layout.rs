//! Vertex input layout definitions derived from accessor metadata.
//!
//! A [`VertexInputLayout`] describes how a primitive's attributes are fed to
//! the vertex shader:
//!
//! - Each [`VertexInputBinding`] is one vertex buffer slot, bound to one buffer
//!   at one offset with one stride.
//! - A binding carries one attribute when its data lives in its own buffer view,
//!   or several attributes when they are interleaved within a shared view.
//!
//! Layouts are hashable so that primitives with the same shape share one
//! compiled pipeline.
//!
//! # Example
//!
//! ```ignore
//! // Interleaved position + normal (one binding), texcoords in their own view.
//! let layout = VertexInputLayout::new()
//!     .with_binding(
//!         VertexInputBinding::new(24)
//!             .with_attribute(VertexInputAttribute::float(0, AttributeSemantic::Position, 0, 3))
//!             .with_attribute(VertexInputAttribute::float(1, AttributeSemantic::Normal, 12, 3)),
//!     )
//!     .with_binding(
//!         VertexInputBinding::new(8)
//!             .with_attribute(VertexInputAttribute::float(2, AttributeSemantic::TexCoord, 0, 2)),
//!     );
//! ```

use super::types::NumType;

/// Semantic role of a vertex attribute.
///
/// The declaration order is the canonical attribute order: attributes are
/// sorted by it before layouts are derived, which fixes shader locations
/// independently of input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeSemantic {
    /// Vertex position (typically float3).
    Position,
    /// Vertex normal (typically float3).
    Normal,
    /// Vertex tangent (typically float4, w = handedness).
    Tangent,
    /// Texture coordinates (typically float2), one per set index.
    TexCoord,
    /// Vertex color (float3/float4 or normalized integers).
    Color,
    /// Bone indices for skinning.
    Joints,
    /// Bone weights for skinning.
    Weights,
    /// Application specific attribute.
    Custom,
}

impl AttributeSemantic {
    /// Get a unique index for this semantic.
    pub fn index(&self) -> u32 {
        match self {
            Self::Position => 0,
            Self::Normal => 1,
            Self::Tangent => 2,
            Self::TexCoord => 3,
            Self::Color => 4,
            Self::Joints => 5,
            Self::Weights => 6,
            Self::Custom => 7,
        }
    }

    /// Name as used by shader preprocessor defines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Position => "POSITION",
            Self::Normal => "NORMAL",
            Self::Tangent => "TANGENT",
            Self::TexCoord => "TEXCOORD",
            Self::Color => "COLOR",
            Self::Joints => "JOINTS",
            Self::Weights => "WEIGHTS",
            Self::Custom => "CUSTOM",
        }
    }
}

/// A single attribute within a vertex buffer binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexInputAttribute {
    /// Shader input location.
    pub location: u32,
    /// Semantic this attribute was derived from.
    pub semantic: AttributeSemantic,
    /// Byte offset of the attribute within one vertex of the binding.
    pub offset: u32,
    /// Component scalar type.
    pub num_type: NumType,
    /// Number of components per element.
    pub components: u32,
    /// Whether integer data is normalized to [0, 1] / [-1, 1].
    pub normalized: bool,
}

impl VertexInputAttribute {
    /// Create a new vertex input attribute.
    pub fn new(
        location: u32,
        semantic: AttributeSemantic,
        offset: u32,
        num_type: NumType,
        components: u32,
        normalized: bool,
    ) -> Self {
        Self {
            location,
            semantic,
            offset,
            num_type,
            components,
            normalized,
        }
    }

    /// Create a 32-bit float attribute with `components` components.
    pub fn float(location: u32, semantic: AttributeSemantic, offset: u32, components: u32) -> Self {
        Self::new(location, semantic, offset, NumType::F32, components, false)
    }

    /// Size in bytes of one element of this attribute.
    pub fn size(&self) -> u32 {
        self.num_type.size() * self.components
    }
}

/// One vertex buffer binding and the attributes it feeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexInputBinding {
    /// Stride in bytes between consecutive vertices.
    pub stride: u32,
    /// Attributes read from this binding.
    pub attributes: Vec<VertexInputAttribute>,
}

impl VertexInputBinding {
    /// Create a binding with the given stride (0 until resolved).
    pub fn new(stride: u32) -> Self {
        Self {
            stride,
            attributes: Vec::new(),
        }
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, attribute: VertexInputAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn add_attribute(&mut self, attribute: VertexInputAttribute) {
        self.attributes.push(attribute);
    }

    pub fn set_stride(&mut self, stride: u32) {
        self.stride = stride;
    }

    /// Sum of attribute sizes, i.e. the stride of a tightly packed binding.
    pub fn packed_size(&self) -> u32 {
        self.attributes.iter().map(VertexInputAttribute::size).sum()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }
}

/// Describes the vertex input state of a primitive across all its bindings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexInputLayout {
    /// Bindings in slot order.
    pub bindings: Vec<VertexInputBinding>,
}

impl VertexInputLayout {
    /// Create a new empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding.
    pub fn with_binding(mut self, binding: VertexInputBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn push_binding(&mut self, binding: VertexInputBinding) {
        self.bindings.push(binding);
    }

    /// Get the number of bindings.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Get the total number of attributes over all bindings.
    pub fn attribute_count(&self) -> usize {
        self.bindings.iter().map(|b| b.attributes.len()).sum()
    }

    /// Iterate over all attributes in location order.
    pub fn attributes(&self) -> impl Iterator<Item = &VertexInputAttribute> {
        self.bindings.iter().flat_map(|b| b.attributes.iter())
    }

    /// Check if this layout feeds a specific semantic.
    pub fn has_semantic(&self, semantic: AttributeSemantic) -> bool {
        self.attributes().any(|attr| attr.semantic == semantic)
    }

    /// Shader preprocessor defines announcing the attributes present.
    pub fn shader_defines(&self) -> Vec<String> {
        let mut defines: Vec<String> = self
            .attributes()
            .map(|attr| format!("HAS_{}", attr.semantic.name()))
            .collect();
        defines.dedup();
        defines
    }

    /// Validate the layout: every binding must be wide enough for the
    /// attributes it carries.
    pub fn validate(&self) -> Result<(), String> {
        for (slot, binding) in self.bindings.iter().enumerate() {
            let packed = binding.packed_size();
            if binding.stride < packed {
                return Err(format!(
                    "binding {slot} has stride {} but its attributes need {packed} bytes",
                    binding.stride
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_order() {
        let mut semantics = vec![
            AttributeSemantic::Color,
            AttributeSemantic::Position,
            AttributeSemantic::Normal,
        ];
        semantics.sort();
        assert_eq!(
            semantics,
            vec![
                AttributeSemantic::Position,
                AttributeSemantic::Normal,
                AttributeSemantic::Color
            ]
        );
        assert!(AttributeSemantic::Position.index() < AttributeSemantic::Weights.index());
    }

    #[test]
    fn test_attribute_size() {
        let attr = VertexInputAttribute::float(0, AttributeSemantic::Position, 0, 3);
        assert_eq!(attr.size(), 12);

        let color = VertexInputAttribute::new(1, AttributeSemantic::Color, 12, NumType::U8, 4, true);
        assert_eq!(color.size(), 4);
    }

    #[test]
    fn test_binding_packed_size() {
        let binding = VertexInputBinding::new(0)
            .with_attribute(VertexInputAttribute::float(0, AttributeSemantic::Position, 0, 3))
            .with_attribute(VertexInputAttribute::float(1, AttributeSemantic::Normal, 12, 3));
        assert_eq!(binding.packed_size(), 24);
        assert_eq!(binding.attribute_count(), 2);
    }

    #[test]
    fn test_layout_queries() {
        let layout = VertexInputLayout::new()
            .with_binding(
                VertexInputBinding::new(24)
                    .with_attribute(VertexInputAttribute::float(0, AttributeSemantic::Position, 0, 3))
                    .with_attribute(VertexInputAttribute::float(1, AttributeSemantic::Normal, 12, 3)),
            )
            .with_binding(
                VertexInputBinding::new(8)
                    .with_attribute(VertexInputAttribute::float(2, AttributeSemantic::TexCoord, 0, 2)),
            );

        assert_eq!(layout.binding_count(), 2);
        assert_eq!(layout.attribute_count(), 3);
        assert!(layout.has_semantic(AttributeSemantic::TexCoord));
        assert!(!layout.has_semantic(AttributeSemantic::Color));
        assert_eq!(
            layout.shader_defines(),
            vec!["HAS_POSITION", "HAS_NORMAL", "HAS_TEXCOORD"]
        );
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn test_layout_validation() {
        let layout = VertexInputLayout::new().with_binding(
            VertexInputBinding::new(12)
                .with_attribute(VertexInputAttribute::float(0, AttributeSemantic::Position, 0, 3))
                .with_attribute(VertexInputAttribute::float(1, AttributeSemantic::Normal, 12, 3)),
        );
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_layout_equality_for_caching() {
        let make = || {
            VertexInputLayout::new().with_binding(
                VertexInputBinding::new(12)
                    .with_attribute(VertexInputAttribute::float(0, AttributeSemantic::Position, 0, 3)),
            )
        };
        let mut set = std::collections::HashSet::new();
        set.insert(make());
        assert!(set.contains(&make()));
    }
}
