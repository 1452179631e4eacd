//! Common utilities for stage integration tests.

#![allow(dead_code)]

use redlilium_stage::{
    Accessor, AccessorIndex, AttributeSemantic, BufferIndex, BufferView, CompoundType,
    DummyPipelineCompiler, MeshIndex, MeshInfo, NumType, PrimitiveInfo, Stage, StageConfig,
};

/// Install a test logger once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Create a stage over a dummy compiler, returning a clone of the compiler
/// to inspect what the stage requested.
pub fn new_stage() -> (Stage, DummyPipelineCompiler) {
    init_logging();
    let compiler = DummyPipelineCompiler::new();
    let stage = Stage::new(StageConfig::default(), Box::new(compiler.clone()))
        .expect("dummy compiler never fails");
    (stage, compiler)
}

/// Three vec4 positions, 12 floats.
pub const TRIANGLE_POSITIONS: [f32; 12] = [
    0.0, 0.0, 0.0, 1.0, //
    1.0, 0.0, 0.0, 1.0, //
    0.0, 1.0, 0.0, 1.0, //
];

pub fn bytes_of(values: &[f32]) -> &[u8] {
    bytemuck::cast_slice(values)
}

/// A stage-side triangle: buffer, position accessor and the mesh using it.
pub struct Triangle {
    pub buffer: BufferIndex,
    pub position: AccessorIndex,
    pub mesh: MeshIndex,
}

/// Add a non-indexed triangle whose positions are `TRIANGLE_POSITIONS`.
pub fn add_triangle(stage: &mut Stage) -> Triangle {
    let buffer = stage
        .create_buffer(bytes_of(&TRIANGLE_POSITIONS), Some("triangle"))
        .unwrap();
    let view = stage.create_buffer_view(BufferView::new(buffer, 0, 48)).unwrap();
    let position = stage
        .create_accessor(Accessor::new(view, NumType::F32, CompoundType::Vec4, 3))
        .unwrap();
    let mesh = stage
        .create_mesh(
            MeshInfo::new()
                .with_name("triangle")
                .with_primitive(PrimitiveInfo::new().with_attribute(AttributeSemantic::Position, position)),
        )
        .unwrap();
    Triangle {
        buffer,
        position,
        mesh,
    }
}
