//! Render graph definition, compilation and execution

use crate::backend::traits::CommandEncoder;
use crate::backend::types::Extent2d;
use crate::render_graph::pass::*;
use crate::render_graph::resource::*;
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// Render graph error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Cyclic dependency between passes: {0:?}")]
    CyclicDependency(Vec<String>),
}

/// The main render graph structure
///
/// Passes are added once and then set up again on every compile, so the
/// graph always reflects the current resource intent of its passes.
pub struct RenderGraph {
    passes: Vec<Box<dyn RenderPass>>,
    pass_nodes: Vec<PassNode>,
    resources: Vec<VirtualResource>,
    next_external_id: u32,
    extent: Extent2d,

    /// External resources (like swapchain)
    external_resources: HashMap<String, ResourceId>,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            pass_nodes: Vec::new(),
            resources: Vec::new(),
            next_external_id: 0,
            extent: Extent2d::default(),
            external_resources: HashMap::new(),
        }
    }

    /// Create a graph rendering into targets of the given size
    pub fn with_extent(width: u32, height: u32) -> Self {
        let mut graph = Self::new();
        graph.extent = Extent2d::new(width, height);
        graph
    }

    pub fn set_extent(&mut self, width: u32, height: u32) {
        self.extent = Extent2d::new(width, height);
    }

    pub fn extent(&self) -> Extent2d {
        self.extent
    }

    /// Register an external resource (like swapchain image).
    ///
    /// Registering a name twice returns the existing id.
    pub fn register_external(&mut self, name: &str) -> ResourceId {
        if let Some(id) = self.get_external(name) {
            return id;
        }
        let id = ResourceId::external(self.next_external_id);
        self.next_external_id += 1;
        self.resources.push(VirtualResource::External {
            id,
            name: name.to_string(),
        });
        self.external_resources.insert(name.to_string(), id);
        id
    }

    /// Get external resource by name
    pub fn get_external(&self, name: &str) -> Option<ResourceId> {
        self.external_resources.get(name).copied()
    }

    /// Add a render pass to the graph
    pub fn add_pass<P: RenderPass + 'static>(&mut self, pass: P, pass_type: PassType) -> PassId {
        let id = PassId(self.passes.len() as u32);
        self.pass_nodes.push(PassNode {
            id,
            name: pass.name().to_string(),
            pass_type,
            inputs: Vec::new(),
            outputs: Vec::new(),
            is_root: false,
            has_work: false,
        });
        self.passes.push(Box::new(pass));
        id
    }

    /// Compile the graph.
    ///
    /// Runs every pass's setup, drops passes without work, culls passes no
    /// root pass depends on, and orders the rest so that writers of a
    /// resource run before its readers. Ties keep insertion order.
    pub fn compile(&mut self) -> Result<CompiledGraph, GraphError> {
        self.resources
            .retain(|r| matches!(r, VirtualResource::External { .. }));

        let extent = self.extent;
        for (pass, node) in self.passes.iter_mut().zip(self.pass_nodes.iter_mut()) {
            node.inputs.clear();
            node.outputs.clear();
            node.is_root = false;
            let mut ctx = PassSetupContext {
                resources: &mut self.resources,
                inputs: &mut node.inputs,
                outputs: &mut node.outputs,
                is_root: &mut node.is_root,
                extent,
            };
            node.has_work = pass.setup(&mut ctx);
        }

        let nodes = &self.pass_nodes;
        let count = nodes.len();

        // Keep roots, then everything that writes what a kept pass reads
        let mut kept = vec![false; count];
        let mut stack: Vec<usize> = (0..count)
            .filter(|&i| nodes[i].has_work && nodes[i].is_root)
            .collect();
        for &i in &stack {
            kept[i] = true;
        }
        while let Some(reader) = stack.pop() {
            for input in &nodes[reader].inputs {
                for (writer, node) in nodes.iter().enumerate() {
                    if writer != reader
                        && !kept[writer]
                        && node.has_work
                        && node.writes_resource(input.resource)
                    {
                        kept[writer] = true;
                        stack.push(writer);
                    }
                }
            }
        }

        // A pass depends on another if it reads a resource that the other writes
        let mut dependencies: Vec<HashSet<usize>> = vec![HashSet::new(); count];
        for reader in (0..count).filter(|&i| kept[i]) {
            for writer in (0..count).filter(|&i| kept[i] && i != reader) {
                if nodes[reader]
                    .inputs
                    .iter()
                    .any(|input| nodes[writer].writes_resource(input.resource))
                {
                    dependencies[reader].insert(writer);
                }
            }
        }

        // Topological sort using Kahn's algorithm
        let mut in_degree: Vec<usize> = dependencies.iter().map(HashSet::len).collect();
        let mut ready: BTreeSet<usize> = (0..count)
            .filter(|&i| kept[i] && in_degree[i] == 0)
            .collect();
        let mut pass_order = Vec::new();

        while let Some(pass) = ready.pop_first() {
            pass_order.push(PassId(pass as u32));
            for dependent in 0..count {
                if dependencies[dependent].contains(&pass) {
                    in_degree[dependent] -= 1;
                    if in_degree[dependent] == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        let kept_count = kept.iter().filter(|&&k| k).count();
        if pass_order.len() != kept_count {
            let stuck = (0..count)
                .filter(|&i| kept[i] && !pass_order.contains(&PassId(i as u32)))
                .map(|i| nodes[i].name.clone())
                .collect();
            return Err(GraphError::CyclicDependency(stuck));
        }

        let skipped = nodes
            .iter()
            .filter(|n| !n.has_work)
            .map(|n| n.id)
            .collect();
        let culled = nodes
            .iter()
            .filter(|n| n.has_work && !kept[n.id.index()])
            .map(|n| n.id)
            .collect();

        log::trace!(
            "Compiled render graph: {} passes scheduled, {} resources",
            pass_order.len(),
            self.resources.len()
        );

        Ok(CompiledGraph {
            pass_order,
            skipped,
            culled,
        })
    }

    /// Execute the scheduled passes in order
    pub fn execute(&self, compiled: &CompiledGraph, encoder: &mut dyn CommandEncoder) {
        for &pass_id in &compiled.pass_order {
            let Some(pass) = self.passes.get(pass_id.index()) else {
                continue;
            };
            let mut ctx = PassExecuteContext {
                encoder: &mut *encoder,
                extent: self.extent,
            };
            pass.execute(&mut ctx);
        }
    }

    /// Compile and execute in one go
    pub fn run_frame(
        &mut self,
        encoder: &mut dyn CommandEncoder,
    ) -> Result<CompiledGraph, GraphError> {
        let compiled = self.compile()?;
        self.execute(&compiled, encoder);
        Ok(compiled)
    }

    /// Get all passes
    pub fn passes(&self) -> &[Box<dyn RenderPass>] {
        &self.passes
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Get pass nodes (metadata)
    pub fn pass_nodes(&self) -> &[PassNode] {
        &self.pass_nodes
    }

    /// Get pass node by ID
    pub fn get_pass_node(&self, id: PassId) -> Option<&PassNode> {
        self.pass_nodes.get(id.index())
    }

    /// Get all resources declared by the last compile, plus externals
    pub fn resources(&self) -> &[VirtualResource] {
        &self.resources
    }
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Compiled render graph with execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledGraph {
    pub pass_order: Vec<PassId>,
    /// Passes whose setup reported no work
    pub skipped: Vec<PassId>,
    /// Passes with work that no root pass depends on
    pub culled: Vec<PassId>,
}

impl CompiledGraph {
    pub fn pass_order(&self) -> &[PassId] {
        &self.pass_order
    }

    /// Check if a pass will execute
    pub fn is_scheduled(&self, pass: PassId) -> bool {
        self.pass_order.contains(&pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{RecordedCommand, RecordingEncoder};
    use crate::backend::types::{BufferDescriptor, BufferUsage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Writes or reads one buffer; counts its callbacks.
    struct TestPass {
        name: &'static str,
        buffer: ResourceId,
        writes: bool,
        root: bool,
        has_work: bool,
        executions: Arc<AtomicUsize>,
    }

    impl TestPass {
        fn new(name: &'static str, writes: bool, root: bool) -> Self {
            Self {
                name,
                buffer: ResourceId::buffer(7),
                writes,
                root,
                has_work: true,
                executions: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl RenderPass for TestPass {
        fn name(&self) -> &str {
            self.name
        }

        fn setup(&mut self, ctx: &mut PassSetupContext) -> bool {
            ctx.declare_buffer(self.buffer, BufferDescriptor::new(4, BufferUsage::VERTEX));
            if self.writes {
                ctx.write(self.buffer, BufferUsage::COPY_DST);
            } else {
                ctx.read(self.buffer, BufferUsage::VERTEX);
            }
            ctx.set_root(self.root);
            self.has_work
        }

        fn execute(&self, ctx: &mut PassExecuteContext) {
            self.executions.fetch_add(1, Ordering::SeqCst);
            ctx.encoder().draw(self.executions.load(Ordering::SeqCst) as u32);
        }
    }

    #[test]
    fn test_render_graph_creation() {
        let graph = RenderGraph::new();
        assert!(graph.passes().is_empty());
        assert_eq!(graph.extent(), Extent2d::default());
    }

    #[test]
    fn test_register_external_is_idempotent() {
        let mut graph = RenderGraph::new();
        let a = graph.register_external("swapchain");
        let b = graph.register_external("swapchain");
        let c = graph.register_external("shadow");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(graph.get_external("swapchain"), Some(a));
        assert_eq!(graph.resources().len(), 2);
    }

    #[test]
    fn test_writer_runs_before_reader() {
        let mut graph = RenderGraph::new();
        let reader = graph.add_pass(TestPass::new("reader", false, true), PassType::Graphics);
        let writer = graph.add_pass(TestPass::new("writer", true, false), PassType::Transfer);

        let compiled = graph.compile().unwrap();
        assert_eq!(compiled.pass_order(), &[writer, reader]);
        assert!(compiled.culled.is_empty());
    }

    #[test]
    fn test_non_root_without_consumer_is_culled() {
        let mut graph = RenderGraph::new();
        let orphan = graph.add_pass(TestPass::new("orphan", true, false), PassType::Transfer);

        let compiled = graph.compile().unwrap();
        assert!(compiled.pass_order().is_empty());
        assert_eq!(compiled.culled, vec![orphan]);
    }

    #[test]
    fn test_pass_without_work_is_not_executed() {
        let mut pass = TestPass::new("idle", true, true);
        pass.has_work = false;
        let executions = pass.executions.clone();

        let mut graph = RenderGraph::new();
        let id = graph.add_pass(pass, PassType::Transfer);

        let mut encoder = RecordingEncoder::new();
        let compiled = graph.run_frame(&mut encoder).unwrap();

        assert_eq!(compiled.skipped, vec![id]);
        assert!(!compiled.is_scheduled(id));
        assert_eq!(executions.load(Ordering::SeqCst), 0);
        assert!(encoder.commands().is_empty());
    }

    #[test]
    fn test_execute_records_commands() {
        let pass = TestPass::new("root", true, true);
        let executions = pass.executions.clone();

        let mut graph = RenderGraph::with_extent(64, 64);
        graph.add_pass(pass, PassType::Transfer);

        let mut encoder = RecordingEncoder::new();
        graph.run_frame(&mut encoder).unwrap();
        graph.run_frame(&mut encoder).unwrap();

        assert_eq!(executions.load(Ordering::SeqCst), 2);
        assert_eq!(
            encoder.commands(),
            &[
                RecordedCommand::Draw { vertex_count: 1 },
                RecordedCommand::Draw { vertex_count: 2 }
            ]
        );
    }

    #[test]
    fn test_compile_redeclares_resources() {
        let mut graph = RenderGraph::new();
        graph.register_external("swapchain");
        graph.add_pass(TestPass::new("a", true, true), PassType::Transfer);
        graph.add_pass(TestPass::new("b", false, true), PassType::Graphics);

        graph.compile().unwrap();
        graph.compile().unwrap();

        // one external plus the shared buffer, declared once
        assert_eq!(graph.resources().len(), 2);
        let node = graph.get_pass_node(PassId(1)).unwrap();
        assert!(node.reads_resource(ResourceId::buffer(7)));
        assert!(!node.writes_resource(ResourceId::buffer(7)));
    }

    #[test]
    fn test_cycle_is_reported() {
        struct ReadWrite(&'static str);
        impl RenderPass for ReadWrite {
            fn name(&self) -> &str {
                self.0
            }
            fn setup(&mut self, ctx: &mut PassSetupContext) -> bool {
                let (a, b) = (ResourceId::buffer(1), ResourceId::buffer(2));
                let (read, write) = if self.0 == "first" { (a, b) } else { (b, a) };
                ctx.read(read, BufferUsage::VERTEX);
                ctx.write(write, BufferUsage::COPY_DST);
                ctx.set_root(true);
                true
            }
            fn execute(&self, _ctx: &mut PassExecuteContext) {}
        }

        let mut graph = RenderGraph::new();
        graph.add_pass(ReadWrite("first"), PassType::Graphics);
        graph.add_pass(ReadWrite("second"), PassType::Graphics);

        let err = graph.compile().unwrap_err();
        assert_eq!(
            err,
            GraphError::CyclicDependency(vec!["first".into(), "second".into()])
        );
    }
}
