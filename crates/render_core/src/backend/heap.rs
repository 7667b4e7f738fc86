//! The heap/memory-allocator collaborator interface (spec §6).
//!
//! Out of scope for this crate: buffer/image memory allocation strategy
//! itself (sub-allocation, defragmentation, …). `HeapAllocator` is the
//! narrow surface the transfer engine and pass builder need from it.

use ash::vk;

use crate::graph::GraphResult;

/// Host-visible mapping/flush semantics requested alongside an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryFlags {
    /// Memory must be host-visible (mappable).
    pub host_visible: bool,
    /// Memory should be allocated lazily (transient attachments, spec §4.A).
    pub lazily_allocated: bool,
    /// Memory may be accessed concurrently by async transfer queues.
    pub async_concurrent: bool,
}

impl Default for MemoryFlags {
    fn default() -> Self {
        Self {
            host_visible: false,
            lazily_allocated: false,
            async_concurrent: false,
        }
    }
}

/// A description of an image allocation request.
#[derive(Debug, Clone, Copy)]
pub struct ImageDesc {
    /// Image width in texels.
    pub width: u32,
    /// Image height in texels.
    pub height: u32,
    /// Image depth (1 for 2D images).
    pub depth: u32,
    /// Array layer count.
    pub layers: u32,
    /// Pixel format.
    pub format: vk::Format,
    /// Sample count for multisampling.
    pub samples: vk::SampleCountFlags,
    /// Usage flags (color attachment, transfer src/dst, sampled, …).
    pub usage: vk::ImageUsageFlags,
}

/// An opaque handle to a device-memory allocation owned by the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationId(pub u64);

/// Buffer/image allocation, freeing, and host-visible mapping (spec §6).
pub trait HeapAllocator: Send + Sync {
    /// Allocate a buffer of `size` bytes with the given usage and memory flags.
    fn alloc_buffer(
        &self,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        flags: MemoryFlags,
    ) -> GraphResult<(vk::Buffer, AllocationId)>;

    /// Allocate an image per `desc`.
    fn alloc_image(&self, desc: ImageDesc, flags: MemoryFlags) -> GraphResult<(vk::Image, AllocationId)>;

    /// Free a buffer allocation.
    fn free_buffer(&self, buffer: vk::Buffer, allocation: AllocationId);

    /// Free an image allocation.
    fn free_image(&self, image: vk::Image, allocation: AllocationId);

    /// Map a host-visible allocation, returning a pointer to its memory.
    fn map(&self, allocation: AllocationId) -> GraphResult<*mut u8>;

    /// Unmap a previously mapped allocation.
    fn unmap(&self, allocation: AllocationId);

    /// Flush host writes to `allocation` so the device observes them.
    fn flush(&self, allocation: AllocationId);

    /// Block the calling thread until `allocation`'s pending device work
    /// completes (used for host-visible reads).
    fn block(&self, allocation: AllocationId);

    /// Whether `flags` admits concurrent access from async transfer queues.
    fn supports_async_concurrent(&self, flags: MemoryFlags) -> bool {
        flags.async_concurrent
    }
}
