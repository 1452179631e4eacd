//! Render pass definitions for the render graph

use crate::backend::traits::CommandEncoder;
use crate::backend::types::{BufferDescriptor, BufferUsage, Extent2d};
use crate::render_graph::resource::*;

/// Unique identifier for a render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub(crate) u32);

impl PassId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Context for declaring pass resources
///
/// Only resource intent is recorded here; no GPU commands can be issued
/// during setup.
pub struct PassSetupContext<'a> {
    pub(crate) resources: &'a mut Vec<VirtualResource>,
    pub(crate) inputs: &'a mut Vec<ResourceAccess>,
    pub(crate) outputs: &'a mut Vec<ResourceAccess>,
    pub(crate) is_root: &'a mut bool,
    pub(crate) extent: Extent2d,
}

impl<'a> PassSetupContext<'a> {
    /// Declare a buffer resource. Declaring the same id again is a no-op.
    pub fn declare_buffer(&mut self, id: ResourceId, desc: BufferDescriptor) {
        if self.resources.iter().any(|r| r.id() == id) {
            return;
        }
        self.resources
            .push(VirtualResource::Buffer(VirtualBuffer { id, desc }));
    }

    /// Declare that this pass reads from a buffer
    pub fn read(&mut self, resource: ResourceId, usage: BufferUsage) {
        self.inputs.push(ResourceAccess {
            resource,
            usage: ResourceUsage::Buffer(usage),
        });
    }

    /// Declare that this pass writes to a buffer
    pub fn write(&mut self, resource: ResourceId, usage: BufferUsage) {
        self.outputs.push(ResourceAccess {
            resource,
            usage: ResourceUsage::Buffer(usage),
        });
    }

    /// Declare a color attachment this pass renders into
    pub fn add_color_attachment(&mut self, resource: ResourceId) {
        self.outputs.push(ResourceAccess {
            resource,
            usage: ResourceUsage::ColorAttachment,
        });
    }

    /// Mark the pass as root: it is always scheduled, even if nothing
    /// downstream consumes its outputs
    pub fn set_root(&mut self, is_root: bool) {
        *self.is_root = is_root;
    }

    /// Get the frame extent
    pub fn extent(&self) -> Extent2d {
        self.extent
    }
}

/// Context for executing a render pass
pub struct PassExecuteContext<'a> {
    pub encoder: &'a mut dyn CommandEncoder,
    pub extent: Extent2d,
}

impl<'a> PassExecuteContext<'a> {
    pub fn encoder(&mut self) -> &mut dyn CommandEncoder {
        &mut *self.encoder
    }
}

/// Trait for render passes
///
/// The graph may call `setup` for scheduling without ever calling `execute`;
/// `execute` only runs for passes whose `setup` returned `true` and that
/// survived culling, and must not declare resources.
pub trait RenderPass: Send + Sync {
    /// Get the pass name for debugging
    fn name(&self) -> &str;

    /// Setup phase - declare resources and dependencies.
    ///
    /// Returning `false` tells the graph there is no work this frame.
    fn setup(&mut self, ctx: &mut PassSetupContext) -> bool;

    /// Execute phase - record commands
    fn execute(&self, ctx: &mut PassExecuteContext);
}

/// Type of render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassType {
    /// Graphics render pass
    Graphics,
    /// Transfer/copy pass
    Transfer,
}

/// Metadata about a pass in the graph, refreshed on every compile
#[derive(Debug)]
pub struct PassNode {
    pub id: PassId,
    pub name: String,
    pub pass_type: PassType,
    pub inputs: Vec<ResourceAccess>,
    pub outputs: Vec<ResourceAccess>,
    pub is_root: bool,
    /// Result of the last setup call
    pub has_work: bool,
}

impl PassNode {
    pub fn reads_resource(&self, resource: ResourceId) -> bool {
        self.inputs.iter().any(|a| a.resource == resource)
    }

    pub fn writes_resource(&self, resource: ResourceId) -> bool {
        self.outputs.iter().any(|a| a.resource == resource)
    }
}
