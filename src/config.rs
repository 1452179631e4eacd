//! Stage configuration.

/// Configuration for a [`Stage`](crate::Stage).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageConfig {
    /// Vertex shader source path
    pub vertex_shader: String,
    /// Fragment shader source path
    pub fragment_shader: String,
    /// Name of the external color attachment the draw pass renders into
    pub color_target: String,
    /// Shader argument receiving the projection matrix
    pub projection_argument: String,
    /// Name of the pass uploading pending buffers
    pub transfer_pass_name: String,
    /// Name of the pass drawing all meshes
    pub draw_pass_name: String,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            vertex_shader: "./local_resources/shaders/gltf.vert".to_string(),
            fragment_shader: "./local_resources/shaders/gltf.frag".to_string(),
            color_target: "swapchain".to_string(),
            projection_argument: "MvpUbo".to_string(),
            transfer_pass_name: "Stage Xfer".to_string(),
            draw_pass_name: "Stage Draw".to_string(),
        }
    }
}

impl StageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both shader source paths.
    pub fn with_shaders(mut self, vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        self.vertex_shader = vertex.into();
        self.fragment_shader = fragment.into();
        self
    }

    pub fn with_color_target(mut self, name: impl Into<String>) -> Self {
        self.color_target = name.into();
        self
    }

    pub fn with_projection_argument(mut self, name: impl Into<String>) -> Self {
        self.projection_argument = name.into();
        self
    }

    /// Set the names the two contributed passes appear under in the graph.
    pub fn with_pass_names(mut self, transfer: impl Into<String>, draw: impl Into<String>) -> Self {
        self.transfer_pass_name = transfer.into();
        self.draw_pass_name = draw.into();
        self
    }
}
