//! Content-addressed buffer storage.
//!
//! Buffers are identified by a 32-bit hash of their bytes. Submitting the same
//! content twice yields the same [`BufferIndex`] and keeps a single copy. Each
//! buffer is uploaded at most once, after which its CPU-side memory is
//! released.

use std::sync::Arc;

use xxhash_rust::xxh32::xxh32;

use crate::backend::traits::CommandEncoder;
use crate::backend::types::{BufferDescriptor, BufferUsage};
use crate::error::{ReferenceKind, StageError, StageResult};
use crate::render_graph::ResourceId;

/// Usage every stage buffer is created with, whatever role its views play.
pub const DEFAULT_BUFFER_USAGE: BufferUsage = BufferUsage::COPY_DST
    .union(BufferUsage::INDEX)
    .union(BufferUsage::VERTEX);

/// Index of a buffer in a [`BufferStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferIndex(pub(crate) u32);

impl BufferIndex {
    pub fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Hash identifying buffer content.
pub fn content_hash(bytes: &[u8]) -> u32 {
    xxh32(bytes, 0)
}

/// CPU-side memory backing a buffer until it is uploaded.
#[derive(Debug, Clone)]
pub enum BufferMemory {
    /// Copied into the store; freed on upload
    Owned(Vec<u8>),
    /// Referenced memory the caller shares with the store
    Shared(Arc<[u8]>),
    /// Nothing held any more
    Released,
}

/// A deduplicated geometry buffer
#[derive(Debug)]
pub struct Buffer {
    hash: u32,
    resource: ResourceId,
    descriptor: BufferDescriptor,
    memory: BufferMemory,
    uploaded: bool,
}

impl Buffer {
    fn new(hash: u32, size: usize, label: Option<&str>, memory: BufferMemory) -> Self {
        let mut descriptor = BufferDescriptor::new(size as u64, DEFAULT_BUFFER_USAGE);
        if let Some(label) = label {
            descriptor = descriptor.with_label(label);
        }
        Self {
            hash,
            resource: ResourceId::buffer(hash),
            descriptor,
            memory,
            uploaded: false,
        }
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Graph resource this buffer is declared as
    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Whether the store holds its own copy of the bytes
    pub fn owns_memory(&self) -> bool {
        matches!(self.memory, BufferMemory::Owned(_))
    }

    pub fn is_uploaded(&self) -> bool {
        self.uploaded
    }

    /// Buffer content, available until the buffer is uploaded
    pub fn data(&self) -> Option<&[u8]> {
        match &self.memory {
            BufferMemory::Owned(bytes) => Some(bytes),
            BufferMemory::Shared(bytes) => Some(bytes),
            BufferMemory::Released => None,
        }
    }

    pub fn memory(&self) -> &BufferMemory {
        &self.memory
    }

    fn release(&mut self) {
        self.memory = BufferMemory::Released;
        self.uploaded = true;
    }
}

/// Owns all buffers of a stage
#[derive(Debug, Default)]
pub struct BufferStore {
    buffers: Vec<Buffer>,
}

impl BufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `bytes` into the store, or return the index of a buffer with the
    /// same content hash.
    pub fn submit(&mut self, bytes: &[u8], label: Option<&str>) -> StageResult<BufferIndex> {
        if bytes.is_empty() {
            return Err(StageError::EmptyBuffer);
        }
        let hash = content_hash(bytes);
        if let Some(index) = self.reuse(hash, bytes.len(), label) {
            return Ok(index);
        }

        let mut owned = Vec::new();
        owned
            .try_reserve_exact(bytes.len())
            .map_err(|_| StageError::OutOfMemory { size: bytes.len() })?;
        owned.extend_from_slice(bytes);

        Ok(self.insert(hash, bytes.len(), label, BufferMemory::Owned(owned)))
    }

    /// Register memory shared with the caller without copying it.
    pub fn submit_shared(&mut self, bytes: Arc<[u8]>, label: Option<&str>) -> StageResult<BufferIndex> {
        if bytes.is_empty() {
            return Err(StageError::EmptyBuffer);
        }
        let hash = content_hash(&bytes);
        if let Some(index) = self.reuse(hash, bytes.len(), label) {
            return Ok(index);
        }
        let size = bytes.len();
        Ok(self.insert(hash, size, label, BufferMemory::Shared(bytes)))
    }

    /// Find a buffer by content hash
    pub fn find(&self, hash: u32) -> Option<BufferIndex> {
        self.buffers
            .iter()
            .position(|b| b.hash == hash)
            .map(|i| BufferIndex(i as u32))
    }

    fn reuse(&self, hash: u32, size: usize, label: Option<&str>) -> Option<BufferIndex> {
        let index = self.find(hash)?;
        let existing = &self.buffers[index.index()];
        if existing.size() != size as u64 {
            log::warn!(
                "Buffer {:?} hash {:08x} matches buffer {} of different size ({} vs {} bytes), reusing it",
                label,
                hash,
                index.0,
                size,
                existing.size()
            );
        } else {
            log::debug!(
                "Buffer {:?} ({} bytes) deduplicated to buffer {}",
                label,
                size,
                index.0
            );
        }
        Some(index)
    }

    fn insert(&mut self, hash: u32, size: usize, label: Option<&str>, memory: BufferMemory) -> BufferIndex {
        let index = BufferIndex(self.buffers.len() as u32);
        log::debug!(
            "Created buffer {} {:?}: {} bytes, hash {:08x}",
            index.0,
            label,
            size,
            hash
        );
        self.buffers.push(Buffer::new(hash, size, label, memory));
        index
    }

    /// Buffers not uploaded yet
    pub fn pending_uploads(&self) -> Vec<BufferIndex> {
        self.iter()
            .filter(|(_, buffer)| !buffer.uploaded)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn has_pending_uploads(&self) -> bool {
        self.buffers.iter().any(|b| !b.uploaded)
    }

    /// Flag a buffer as uploaded and drop its CPU-side memory.
    pub fn mark_uploaded(&mut self, index: BufferIndex) -> StageResult<()> {
        let len = self.buffers.len();
        let buffer = self
            .buffers
            .get_mut(index.index())
            .ok_or_else(|| StageError::invalid_reference(ReferenceKind::Buffer, index.0, len))?;
        if buffer.uploaded {
            return Err(StageError::AlreadyUploaded(index));
        }
        buffer.release();
        Ok(())
    }

    /// Write every pending buffer through `encoder`, then mark it uploaded.
    ///
    /// Returns the number of buffers written.
    pub fn upload_pending(&mut self, encoder: &mut dyn CommandEncoder) -> usize {
        let mut uploaded = 0;
        for buffer in self.buffers.iter_mut().filter(|b| !b.uploaded) {
            if let Some(data) = buffer.data() {
                encoder.write_buffer(buffer.resource, 0, data);
            }
            buffer.release();
            uploaded += 1;
        }
        uploaded
    }

    pub fn get(&self, index: BufferIndex) -> Option<&Buffer> {
        self.buffers.get(index.index())
    }

    pub fn contains(&self, index: BufferIndex) -> bool {
        index.index() < self.buffers.len()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BufferIndex, &Buffer)> {
        self.buffers
            .iter()
            .enumerate()
            .map(|(i, buffer)| (BufferIndex(i as u32), buffer))
    }
}
