//! Stage error types.

use crate::backend::BackendError;
use crate::mesh::NumType;
use crate::stage::BufferIndex;
use thiserror::Error;

/// Kind of catalog entity a failed cross-reference pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Buffer,
    BufferView,
    Accessor,
    Mesh,
    Primitive,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Buffer => "buffer",
            Self::BufferView => "buffer view",
            Self::Accessor => "accessor",
            Self::Mesh => "mesh",
            Self::Primitive => "primitive",
        };
        f.write_str(name)
    }
}

/// Errors returned by stage operations.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("out of memory while allocating {size} bytes")]
    OutOfMemory { size: usize },
    #[error("buffer data must not be empty")]
    EmptyBuffer,
    #[error("invalid {kind} reference {index} (only {len} registered)")]
    InvalidReference {
        kind: ReferenceKind,
        index: u32,
        len: usize,
    },
    #[error("invalid vertex layout: {0}")]
    InvalidLayout(String),
    #[error("accessor component type {0:?} cannot be used for index data")]
    UnsupportedIndexType(NumType),
    #[error("buffer {0:?} was already uploaded")]
    AlreadyUploaded(BufferIndex),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type StageResult<T> = Result<T, StageError>;

impl StageError {
    pub(crate) fn invalid_reference(kind: ReferenceKind, index: u32, len: usize) -> Self {
        Self::InvalidReference { kind, index, len }
    }
}
