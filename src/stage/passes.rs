//! Render passes a stage contributes to a render graph.

use std::sync::Arc;

use glam::Mat4;
use parking_lot::Mutex;

use crate::backend::types::{BufferUsage, Viewport};
use crate::render_graph::{PassExecuteContext, PassSetupContext, RenderPass, ResourceId};
use crate::stage::StageData;

/// Uploads every buffer not yet on the GPU.
///
/// Setup reports work only while uploads are pending, so frames without new
/// buffers skip this pass entirely. When it has work the pass is a root, so
/// it runs even if nothing in the graph reads the buffers yet.
pub struct StageTransferPass {
    name: String,
    data: Arc<Mutex<StageData>>,
}

impl StageTransferPass {
    pub(crate) fn new(name: String, data: Arc<Mutex<StageData>>) -> Self {
        Self { name, data }
    }
}

impl RenderPass for StageTransferPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, ctx: &mut PassSetupContext) -> bool {
        let data = self.data.lock();
        let mut has_work = false;
        for (_, buffer) in data.buffers.iter().filter(|(_, b)| !b.is_uploaded()) {
            ctx.declare_buffer(buffer.resource(), buffer.descriptor().clone());
            ctx.write(buffer.resource(), BufferUsage::COPY_DST);
            has_work = true;
        }
        ctx.set_root(has_work);
        has_work
    }

    fn execute(&self, ctx: &mut PassExecuteContext) {
        let mut data = self.data.lock();
        let uploaded = data.buffers.upload_pending(ctx.encoder());
        log::debug!("{}: uploaded {} buffers", self.name, uploaded);
    }
}

/// Draws every primitive of every mesh into the color target.
///
/// Always scheduled: the pass is a root of the graph.
pub struct StageDrawPass {
    name: String,
    data: Arc<Mutex<StageData>>,
    color_target: ResourceId,
    projection_argument: String,
}

impl StageDrawPass {
    pub(crate) fn new(
        name: String,
        data: Arc<Mutex<StageData>>,
        color_target: ResourceId,
        projection_argument: String,
    ) -> Self {
        Self {
            name,
            data,
            color_target,
            projection_argument,
        }
    }

    pub fn color_target(&self) -> ResourceId {
        self.color_target
    }
}

impl RenderPass for StageDrawPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, ctx: &mut PassSetupContext) -> bool {
        let data = self.data.lock();
        for (_, buffer) in data.buffers.iter() {
            ctx.declare_buffer(buffer.resource(), buffer.descriptor().clone());
            ctx.read(buffer.resource(), BufferUsage::INDEX | BufferUsage::VERTEX);
        }
        ctx.add_color_attachment(self.color_target);
        ctx.set_root(true);
        true
    }

    fn execute(&self, ctx: &mut PassExecuteContext) {
        let data = self.data.lock();
        let extent = ctx.extent;
        let projection = Mat4::orthographic_rh(
            0.0,
            extent.width as f32,
            0.0,
            extent.height as f32,
            -1.0,
            1.0,
        );

        let encoder = ctx.encoder();
        encoder.set_viewports(0, &[Viewport::full(extent)]);

        for (mesh_index, mesh) in data.catalog.meshes().iter().enumerate() {
            for (primitive_index, primitive) in mesh.primitives().iter().enumerate() {
                let Some(layout) = primitive.layout() else {
                    log::error!(
                        "Primitive {} of mesh {} has no pipeline, call setup_pipelines() first; skipping",
                        primitive_index,
                        mesh_index
                    );
                    continue;
                };
                if primitive.vertex_count() == 0 {
                    log::trace!(
                        "Primitive {} of mesh {} has no vertices; skipping",
                        primitive_index,
                        mesh_index
                    );
                    continue;
                }

                encoder.bind_pipeline(layout.pipeline);
                encoder.set_argument_data(&self.projection_argument, bytemuck::bytes_of(&projection));
                encoder.bind_vertex_buffers(0, &layout.vertex_buffers);

                match layout.index_buffer {
                    Some(index) => {
                        encoder.bind_index_buffer(index.buffer, index.offset, index.format);
                        encoder.draw_indexed(primitive.index_count());
                    }
                    None => encoder.draw(primitive.vertex_count()),
                }
            }
        }
    }
}
