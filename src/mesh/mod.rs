//! Mesh attribute types shared by the catalog and the layout builder.
//!
//! - [`NumType`] / [`CompoundType`] - element type of accessor data
//! - [`AttributeSemantic`] - role of a vertex attribute, in canonical order
//! - [`VertexInputLayout`] - derived vertex-buffer bindings of a primitive

mod layout;
mod types;

pub use layout::{AttributeSemantic, VertexInputAttribute, VertexInputBinding, VertexInputLayout};
pub use types::{CompoundType, NumType};
