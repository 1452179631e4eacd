//! # Stage Demo
//!
//! Builds a small scene on a [`Stage`], then renders a few frames headlessly
//! through a render graph with the recording encoder and prints what each
//! frame recorded.
//!
//! ```bash
//! cargo run --example stage_demo -- --frames 3 --quads 4
//! RUST_LOG=debug cargo run --example stage_demo
//! ```

use clap::Parser;

use redlilium_stage::{
    Accessor, AttributeSemantic, BufferView, CompoundType, DummyPipelineCompiler, MeshIndex, MeshInfo,
    NumType, PrimitiveInfo, RecordedCommand, RecordingEncoder, RenderGraph, Stage, StageConfig,
    StageResult,
};

/// Headless stage demo.
#[derive(Parser, Debug)]
#[command(name = "stage_demo", about = "Render a small scene through the stage headlessly", version)]
struct Args {
    /// Target width in pixels.
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Target height in pixels.
    #[arg(long, default_value = "720")]
    height: u32,

    /// Number of frames to record.
    #[arg(long, default_value = "3")]
    frames: u32,

    /// Number of quad meshes. All share one vertex buffer.
    #[arg(long, default_value = "2")]
    quads: u32,
}

/// Interleaved quad vertex: position followed by a normalized RGBA8 color.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [u8; 4],
}

const QUAD_VERTICES: [Vertex; 4] = [
    Vertex { position: [0.0, 0.0, 0.0], color: [255, 0, 0, 255] },
    Vertex { position: [100.0, 0.0, 0.0], color: [0, 255, 0, 255] },
    Vertex { position: [100.0, 100.0, 0.0], color: [0, 0, 255, 255] },
    Vertex { position: [0.0, 100.0, 0.0], color: [255, 255, 255, 255] },
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Positions and texture coordinates in separate regions of one buffer.
const TRIANGLE_DATA: [f32; 15] = [
    // positions
    200.0, 200.0, 0.0, //
    300.0, 200.0, 0.0, //
    250.0, 300.0, 0.0, //
    // texcoords
    0.0, 0.0, //
    1.0, 0.0, //
    0.5, 1.0, //
];

fn build_scene(stage: &mut Stage, quads: u32) -> StageResult<Vec<MeshIndex>> {
    let mut meshes = Vec::new();
    let vertex_bytes: &[u8] = bytemuck::cast_slice(&QUAD_VERTICES);
    let index_bytes: &[u8] = bytemuck::cast_slice(&QUAD_INDICES);
    let stride = std::mem::size_of::<Vertex>() as u32;

    for i in 0..quads {
        // identical content each time: stored and uploaded once
        let vertices = stage.create_buffer(vertex_bytes, Some("quad vertices"))?;
        let indices = stage.create_buffer(index_bytes, Some("quad indices"))?;

        let vertex_view = stage.create_buffer_view(
            BufferView::new(vertices, 0, vertex_bytes.len() as u32).with_stride(stride),
        )?;
        let index_view =
            stage.create_buffer_view(BufferView::indices(indices, 0, index_bytes.len() as u32))?;

        let color = stage.create_accessor(
            Accessor::new(vertex_view, NumType::U8, CompoundType::Vec4, 4)
                .with_offset(12)
                .with_normalized(true),
        )?;
        let position = stage.create_accessor(
            Accessor::new(vertex_view, NumType::F32, CompoundType::Vec3, 4)
                .with_bounds(&[0.0, 0.0, 0.0], &[100.0, 100.0, 0.0]),
        )?;
        let index = stage.create_accessor(Accessor::new(
            index_view,
            NumType::U16,
            CompoundType::Scalar,
            QUAD_INDICES.len() as u32,
        ))?;

        meshes.push(stage.create_mesh(
            MeshInfo::new().with_name(format!("quad {i}")).with_primitive(
                PrimitiveInfo::new()
                    .with_attribute(AttributeSemantic::Color, color)
                    .with_attribute(AttributeSemantic::Position, position)
                    .with_indices(index),
            ),
        )?);
    }

    let data = stage.create_buffer(bytemuck::cast_slice(&TRIANGLE_DATA), Some("triangle"))?;
    let positions = stage.create_buffer_view(BufferView::new(data, 0, 36))?;
    let texcoords = stage.create_buffer_view(BufferView::new(data, 36, 24))?;
    let position = stage.create_accessor(
        Accessor::new(positions, NumType::F32, CompoundType::Vec3, 3)
            .with_bounds(&[200.0, 200.0, 0.0], &[300.0, 300.0, 0.0]),
    )?;
    let uv = stage.create_accessor(Accessor::new(texcoords, NumType::F32, CompoundType::Vec2, 3))?;
    meshes.push(stage.create_mesh(
        MeshInfo::new().with_name("triangle").with_primitive(
            PrimitiveInfo::new()
                .with_attribute(AttributeSemantic::TexCoord, uv)
                .with_attribute(AttributeSemantic::Position, position),
        ),
    )?);

    Ok(meshes)
}

#[cfg(feature = "wgpu-backend")]
fn print_wgpu_layouts(stage: &Stage) {
    use redlilium_stage::backend::wgpu_conversion;

    let data = stage.lock();
    for mesh in data.catalog.meshes() {
        for primitive in mesh.primitives() {
            let Some(layout) = primitive.layout() else {
                continue;
            };
            match wgpu_conversion::vertex_buffer_layouts(&layout.input_layout) {
                Some(buffers) => {
                    for (slot, buffer) in buffers.iter().enumerate() {
                        println!(
                            "  {:<10} slot {}: stride {:>3}, {:?}",
                            mesh.name().unwrap_or("<unnamed>"),
                            slot,
                            buffer.array_stride,
                            buffer.attributes.iter().map(|a| a.format).collect::<Vec<_>>()
                        );
                    }
                }
                None => println!("  {:<10} has no wgpu equivalent", mesh.name().unwrap_or("<unnamed>")),
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let compiler = DummyPipelineCompiler::new();
    let mut stage = Stage::new(StageConfig::default(), Box::new(compiler.clone()))?;
    let meshes = build_scene(&mut stage, args.quads)?;
    stage.setup_pipelines()?;

    println!(
        "Scene: {} buffers, {} views, {} accessors, {} meshes, {} primitives, {} pipelines",
        stage.buffer_count(),
        stage.buffer_view_count(),
        stage.accessor_count(),
        stage.mesh_count(),
        stage.primitive_count(),
        compiler.pipeline_count()
    );
    #[cfg(feature = "wgpu-backend")]
    print_wgpu_layouts(&stage);

    let mut graph = RenderGraph::with_extent(args.width, args.height);
    stage.contribute_transfer(&mut graph);
    stage.contribute_draw(&mut graph);

    let mut encoder = RecordingEncoder::new();
    for frame in 0..args.frames {
        let compiled = graph.run_frame(&mut encoder)?;
        let commands = encoder.take_commands();
        let uploaded: usize = commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::WriteBuffer { data, .. } => Some(data.len()),
                _ => None,
            })
            .sum();
        println!(
            "Frame {}: {} passes, {} commands, {} draws, {} bytes uploaded",
            frame,
            compiled.pass_order().len(),
            commands.len(),
            commands.iter().filter(|c| c.is_draw()).count(),
            uploaded
        );
    }

    for mesh in meshes {
        if let Some((min, max)) = stage.mesh_bounds(mesh)? {
            println!("Mesh {} bounds: {min} .. {max}", mesh.raw());
        }
    }

    stage.destroy();
    Ok(())
}
