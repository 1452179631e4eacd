//! Recording command encoder.
//!
//! Captures every command instead of sending it to a GPU, so frames can be
//! produced headlessly and inspected in tests.

use crate::backend::traits::{CommandEncoder, PipelineHandle};
use crate::backend::types::{IndexFormat, VertexBufferBinding, Viewport};
use crate::render_graph::ResourceId;

/// A command captured by [`RecordingEncoder`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    WriteBuffer {
        resource: ResourceId,
        offset: u64,
        data: Vec<u8>,
    },
    BindPipeline(PipelineHandle),
    SetArgumentData {
        name: String,
        data: Vec<u8>,
    },
    SetViewports {
        first: u32,
        viewports: Vec<Viewport>,
    },
    BindVertexBuffers {
        first_binding: u32,
        bindings: Vec<VertexBufferBinding>,
    },
    BindIndexBuffer {
        resource: ResourceId,
        offset: u64,
        format: IndexFormat,
    },
    Draw {
        vertex_count: u32,
    },
    DrawIndexed {
        index_count: u32,
    },
}

impl RecordedCommand {
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::Draw { .. } | Self::DrawIndexed { .. })
    }
}

/// Command encoder that records commands into a list.
#[derive(Debug, Default)]
pub struct RecordingEncoder {
    commands: Vec<RecordedCommand>,
}

impl RecordingEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands recorded so far, in order.
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the encoder empty.
    pub fn take_commands(&mut self) -> Vec<RecordedCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Number of buffer writes recorded.
    pub fn write_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RecordedCommand::WriteBuffer { .. }))
            .count()
    }

    /// Number of draw calls (indexed or not) recorded.
    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_draw()).count()
    }

    fn record(&mut self, command: RecordedCommand) {
        log::trace!("RecordingEncoder: {:?}", command);
        self.commands.push(command);
    }
}

impl CommandEncoder for RecordingEncoder {
    fn write_buffer(&mut self, resource: ResourceId, offset: u64, data: &[u8]) {
        self.record(RecordedCommand::WriteBuffer {
            resource,
            offset,
            data: data.to_vec(),
        });
    }

    fn bind_pipeline(&mut self, pipeline: PipelineHandle) {
        self.record(RecordedCommand::BindPipeline(pipeline));
    }

    fn set_argument_data(&mut self, name: &str, data: &[u8]) {
        self.record(RecordedCommand::SetArgumentData {
            name: name.to_string(),
            data: data.to_vec(),
        });
    }

    fn set_viewports(&mut self, first: u32, viewports: &[Viewport]) {
        self.record(RecordedCommand::SetViewports {
            first,
            viewports: viewports.to_vec(),
        });
    }

    fn bind_vertex_buffers(&mut self, first_binding: u32, bindings: &[VertexBufferBinding]) {
        self.record(RecordedCommand::BindVertexBuffers {
            first_binding,
            bindings: bindings.to_vec(),
        });
    }

    fn bind_index_buffer(&mut self, resource: ResourceId, offset: u64, format: IndexFormat) {
        self.record(RecordedCommand::BindIndexBuffer {
            resource,
            offset,
            format,
        });
    }

    fn draw(&mut self, vertex_count: u32) {
        self.record(RecordedCommand::Draw { vertex_count });
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.record(RecordedCommand::DrawIndexed { index_count });
    }
}
