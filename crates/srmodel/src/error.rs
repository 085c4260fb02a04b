use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(code(srmodel::read))]
    Read(#[from] common::error::Error),

    #[error("model data pointer {pointer:#x} is outside the buffer ({len} bytes)")]
    #[diagnostic(code(srmodel::model_out_of_bounds))]
    ModelOutOfBounds { pointer: u64, len: usize },

    #[error("polygon {polygon} references vertex {vertex}, but the model has {vertex_count}")]
    #[diagnostic(code(srmodel::vertex_index_out_of_range))]
    VertexIndexOutOfRange {
        polygon: usize,
        vertex: u32,
        vertex_count: usize,
    },

    #[error("strip index {index} at {offset:#x} exceeds the strip vertex list ({len})")]
    #[diagnostic(code(srmodel::strip_index_out_of_range))]
    StripIndexOutOfRange { offset: u64, index: u16, len: usize },

    #[error("strip record at {offset:#x} links to {next:#x}, which does not move forward")]
    #[diagnostic(code(srmodel::non_advancing_strip))]
    NonAdvancingStrip { offset: u64, next: u64 },

    #[error("octree node at {pointer:#x} has invalid subtree count {count}")]
    #[diagnostic(code(srmodel::invalid_subtree_count))]
    InvalidSubtreeCount { pointer: u64, count: i32 },

    #[error("octree node at {pointer:#x} is reached twice")]
    #[diagnostic(code(srmodel::octree_cycle))]
    OctreeCycle { pointer: u64 },

    #[error("octree deeper than {max} levels at node {pointer:#x}")]
    #[diagnostic(code(srmodel::octree_too_deep))]
    OctreeTooDeep { pointer: u64, max: u32 },

    #[error("octree expands to more than {max} nodes at {pointer:#x}")]
    #[diagnostic(code(srmodel::octree_too_large))]
    OctreeTooLarge { pointer: u64, max: usize },

    #[error("spectral vertex index {index} out of range (vertex count {vertex_count})")]
    #[diagnostic(code(srmodel::spectral_index_out_of_range))]
    SpectralIndexOutOfRange { index: i32, vertex_count: usize },

    #[error("integer overflow")]
    #[diagnostic(code(srmodel::integer_overflow))]
    IntegerOverflow,
}
