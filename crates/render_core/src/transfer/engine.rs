//! Transfer Engine (spec §4.F): staged host↔device copies across the
//! Graphics and (dedicated, if available) Transfer pools.

use std::sync::Arc;

use ash::vk;
use bitflags::bitflags;
use log::warn;

use crate::backend::{AllocationId, CommandRecorder, CopyCommand, DependencyObject, HeapAllocator, ImageDesc, Injection, MemoryFlags};

use super::error::{TransferError, TransferResult};
use super::operation::StagingBuffer;
use super::pool::TransferPool;
use super::stage::{compact_regions, true_image_byte_size, StageRegion};

bitflags! {
    /// Blocking semantics requested of a transfer call (spec §4.F).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TransferFlags: u8 {
        /// Host-wait on the operation's completion fence after submission.
        const BLOCK = 1 << 0;
        /// Submit immediately without blocking.
        const FLUSH = 1 << 1;
    }
}

/// A reference to a device resource participating in a transfer.
#[derive(Debug, Clone, Copy)]
pub enum DeviceRef {
    /// A buffer resource.
    Buffer {
        /// The buffer handle.
        buffer: vk::Buffer,
        /// The heap allocation backing it, needed to map it directly when
        /// it is host-visible.
        allocation: AllocationId,
        /// Memory flags describing its allocation.
        flags: MemoryFlags,
    },
    /// An image resource.
    Image {
        /// The image handle.
        image: vk::Image,
        /// The heap allocation backing it.
        allocation: AllocationId,
        /// Its allocation description, for block-size/aspect accounting.
        desc: ImageDesc,
        /// Memory flags describing its allocation.
        flags: MemoryFlags,
    },
}

impl DeviceRef {
    fn memory_flags(&self) -> MemoryFlags {
        match self {
            Self::Buffer { flags, .. } => *flags,
            Self::Image { flags, .. } => *flags,
        }
    }
}

/// A single copy region: byte size plus, for buffers, the device offset
/// (spec §4.F stage compaction).
#[derive(Debug, Clone, Copy)]
pub struct CopyRegion {
    /// True byte size of this region.
    pub byte_size: u64,
    /// Device byte offset, for buffer-shaped resources.
    pub device_offset: Option<u64>,
}

/// Which pool a call should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    /// The graphics queue's transfer pool.
    Graphics,
    /// The dedicated transfer queue's pool, if present.
    Transfer,
}

/// Stages host↔device copies through two queue-specialized pools (spec §4.F).
pub struct TransferEngine {
    graphics: TransferPool,
    transfer: TransferPool,
    heap: Arc<dyn HeapAllocator>,
    recorder: Arc<dyn CommandRecorder>,
}

impl TransferEngine {
    /// Construct an engine with a Graphics pool and, if `transfer_queue_family`
    /// is `Some`, a dedicated Transfer pool; otherwise the transfer pool
    /// aliases the graphics queue family.
    pub fn new(
        heap: Arc<dyn HeapAllocator>,
        recorder: Arc<dyn CommandRecorder>,
        graphics_queue_family: u32,
        transfer_queue_family: Option<u32>,
    ) -> Self {
        Self {
            graphics: TransferPool::new(graphics_queue_family),
            transfer: TransferPool::new(transfer_queue_family.unwrap_or(graphics_queue_family)),
            heap,
            recorder,
        }
    }

    fn pool(&self, kind: PoolKind) -> &TransferPool {
        match kind {
            PoolKind::Graphics => &self.graphics,
            PoolKind::Transfer => &self.transfer,
        }
    }

    /// Free staging buffers recycled by a `TransferPool::claim` call.
    fn free_stagings(&self, stagings: Vec<StagingBuffer>) {
        for staging in stagings {
            self.heap.free_buffer(staging.buffer, staging.allocation);
        }
    }

    /// Forced-blocking host read: maps a host-visible buffer directly, or
    /// stages through a device copy and blocks on its completion fence.
    pub fn read(
        &self,
        pool_kind: PoolKind,
        src: DeviceRef,
        dst_ptr: *mut u8,
        regions: &[CopyRegion],
        deps: &[Injection],
    ) -> TransferResult<()> {
        if let DeviceRef::Buffer { flags, allocation, .. } = src {
            if flags.host_visible {
                if !deps.is_empty() {
                    warn!("read: {} dependencies passed for a host-visible map; they cannot be honored", deps.len());
                }
                self.heap.block(allocation);
                let ptr = self.heap.map(allocation).map_err(TransferError::from)?;
                let len = regions.iter().map(|r| r.byte_size).sum::<u64>() as usize;
                unsafe {
                    std::ptr::copy_nonoverlapping(ptr, dst_ptr, len);
                }
                self.heap.unmap(allocation);
                return Ok(());
            }
        }

        let pool = self.pool(pool_kind);
        let (staged, total) = compact_regions(&stage_regions_for(regions, device_ref_image_desc(&src)));
        let (buffer, allocation) = self
            .heap
            .alloc_buffer(total.max(1), vk::BufferUsageFlags::TRANSFER_DST, MemoryFlags { host_visible: true, ..Default::default() })
            .map_err(TransferError::from)?;

        pool.begin_block();
        let (cb, freed) = pool.claim(self.recorder.as_ref())?;
        self.free_stagings(freed);
        record_device_copy(self.recorder.as_ref(), cb, &src, buffer, regions, &staged);
        for injection in deps {
            pool.record_injection(*injection);
        }
        pool.flush(self.recorder.as_ref(), &[], &[])?;

        let fence = pool.tail_fence();
        if let Some(fence) = fence {
            self.recorder.wait_fence(fence).map_err(TransferError::from)?;
        }
        pool.end_block();

        self.heap.map(allocation).map_err(TransferError::from).map(|ptr| {
            let len = total as usize;
            unsafe {
                std::ptr::copy_nonoverlapping(ptr, dst_ptr, len);
            }
        })?;
        self.heap.unmap(allocation);
        self.heap.free_buffer(buffer, allocation);
        Ok(())
    }

    /// Host write: stages into a transfer-src staging buffer, whose lifetime
    /// becomes the enclosing operation's unless `Block` is requested.
    pub fn write(
        &self,
        pool_kind: PoolKind,
        src_ptr: *const u8,
        dst: DeviceRef,
        flags: TransferFlags,
        regions: &[CopyRegion],
        deps: &[Injection],
    ) -> TransferResult<()> {
        let pool = self.pool(pool_kind);
        let (staged, total) = compact_regions(&stage_regions_for(regions, device_ref_image_desc(&dst)));

        if let DeviceRef::Buffer { flags: mem_flags, allocation, .. } = dst {
            if mem_flags.host_visible {
                let ptr = self.heap.map(allocation).map_err(TransferError::from)?;
                unsafe {
                    std::ptr::copy_nonoverlapping(src_ptr, ptr, total as usize);
                }
                self.heap.flush(allocation);
                self.heap.unmap(allocation);
                if !deps.is_empty() {
                    warn!("write: {} dependencies passed for a host-visible map; they cannot be honored", deps.len());
                }
                return Ok(());
            }
        }

        let (buffer, allocation) = self
            .heap
            .alloc_buffer(total.max(1), vk::BufferUsageFlags::TRANSFER_SRC, MemoryFlags { host_visible: true, ..Default::default() })
            .map_err(TransferError::from)?;
        let ptr = self.heap.map(allocation).map_err(TransferError::from)?;
        unsafe {
            std::ptr::copy_nonoverlapping(src_ptr, ptr, total as usize);
        }
        self.heap.flush(allocation);

        if flags.contains(TransferFlags::BLOCK) {
            pool.begin_block();
        }
        let (cb, freed) = pool.claim(self.recorder.as_ref())?;
        self.free_stagings(freed);
        record_device_copy_from_staging(self.recorder.as_ref(), cb, buffer, &dst, regions, &staged);
        for injection in deps {
            pool.record_injection(*injection);
        }

        if flags.intersects(TransferFlags::BLOCK | TransferFlags::FLUSH) {
            pool.flush(self.recorder.as_ref(), &[], &[])?;
        }

        if flags.contains(TransferFlags::BLOCK) {
            if let Some(fence) = pool.tail_fence() {
                self.recorder.wait_fence(fence).map_err(TransferError::from)?;
            }
            pool.end_block();
            self.heap.unmap(allocation);
            self.heap.free_buffer(buffer, allocation);
        } else {
            // Unmap now (writes are already flushed to the device), but keep
            // the allocation alive on the operation until its fence signals.
            self.heap.unmap(allocation);
            pool.attach_staging(StagingBuffer { buffer, allocation });
        }

        Ok(())
    }

    /// Device-to-device copy; both refs must share a device context and at
    /// least one side supplies the heap (enforced by the caller owning both).
    pub fn copy(
        &self,
        pool_kind: PoolKind,
        src: DeviceRef,
        dst: DeviceRef,
        flags: TransferFlags,
        regions: &[CopyRegion],
        deps: &[Injection],
    ) -> TransferResult<()> {
        if !self.heap.supports_async_concurrent(src.memory_flags()) || !self.heap.supports_async_concurrent(dst.memory_flags()) {
            warn!("copy: one side's memory flags do not admit async-concurrent transfer");
        }

        let pool = self.pool(pool_kind);
        let image_desc = device_ref_image_desc(&src).or_else(|| device_ref_image_desc(&dst));
        let (staged, _total) = compact_regions(&stage_regions_for(regions, image_desc));

        if flags.contains(TransferFlags::BLOCK) {
            pool.begin_block();
        }
        let (cb, freed) = pool.claim(self.recorder.as_ref())?;
        self.free_stagings(freed);
        record_copy(self.recorder.as_ref(), cb, &src, &dst, regions, &staged);
        for injection in deps {
            pool.record_injection(*injection);
        }

        if flags.intersects(TransferFlags::BLOCK | TransferFlags::FLUSH) {
            pool.flush(self.recorder.as_ref(), &[], &[])?;
        }
        if flags.contains(TransferFlags::BLOCK) {
            if let Some(fence) = pool.tail_fence() {
                self.recorder.wait_fence(fence).map_err(TransferError::from)?;
            }
            pool.end_block();
        }
        Ok(())
    }

    /// Flush `pool_kind`'s currently open operation: end recording, submit
    /// with the given dependency object's collected waits/signals, and
    /// finalize the dependency list.
    pub fn flush(&self, pool_kind: PoolKind, dependency_object: Option<&dyn DependencyObject>) -> TransferResult<()> {
        let pool = self.pool(pool_kind);
        let injections = pool.take_injections();

        if let (Some(dep), Some(cb)) = (dependency_object, pool.tail_command_buffer()) {
            dep.catch(cb, &injections).map_err(TransferError::from)?;
            dep.prepare(&injections).map_err(TransferError::from)?;
        }

        pool.flush(self.recorder.as_ref(), &[], &[])?;

        if let Some(dep) = dependency_object {
            dep.finish().map_err(TransferError::from)?;
        }
        Ok(())
    }

    /// Roll back the current unflushed transfer on `pool_kind`: free its
    /// staging buffers and destroy its command buffer/fence (spec §7).
    pub fn abort(&self, pool_kind: PoolKind, dependency_object: Option<&dyn DependencyObject>) {
        let pool = self.pool(pool_kind);
        let stagings = pool.abort(self.recorder.as_ref());
        for staging in stagings {
            self.heap.free_buffer(staging.buffer, staging.allocation);
        }
        if let Some(dep) = dependency_object {
            dep.abort();
        }
    }
}

/// The image description of a `DeviceRef`, if it refers to an image.
fn device_ref_image_desc(r: &DeviceRef) -> Option<&ImageDesc> {
    match r {
        DeviceRef::Image { desc, .. } => Some(desc),
        DeviceRef::Buffer { .. } => None,
    }
}

/// Build staging regions for `regions`, recomputing each one's byte size
/// from `image`'s format/dimensions when present (spec §4.F, §8) rather
/// than trusting the caller's `byte_size` for image-shaped resources. A
/// mismatch is logged rather than rejected, since the caller may legitimately
/// be staging a sub-image region smaller than the whole resource.
fn stage_regions_for(regions: &[CopyRegion], image: Option<&ImageDesc>) -> Vec<StageRegion> {
    let whole_image_size = image.map(|desc| true_image_byte_size(desc.format, desc.width, desc.height, desc.depth, desc.layers));

    regions
        .iter()
        .map(|r| {
            let byte_size = match whole_image_size {
                Some(true_size) => {
                    if r.byte_size != true_size {
                        warn!(
                            "stage region byte_size {} disagrees with true image size {} computed from format/dimensions; using the computed size",
                            r.byte_size, true_size
                        );
                    }
                    true_size
                }
                None => r.byte_size,
            };
            StageRegion { byte_size, device_offset: r.device_offset }
        })
        .collect()
}

fn aspect_mask_for_format(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D16_UNORM | vk::Format::D32_SFLOAT => vk::ImageAspectFlags::DEPTH,
        vk::Format::D16_UNORM_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        _ => vk::ImageAspectFlags::COLOR,
    }
}

fn buffer_image_regions(
    desc: &ImageDesc,
    buffer_offsets: impl Iterator<Item = u64>,
) -> Vec<vk::BufferImageCopy> {
    let aspect_mask = aspect_mask_for_format(desc.format);
    buffer_offsets
        .map(|buffer_offset| vk::BufferImageCopy {
            buffer_offset,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: desc.layers,
            },
            image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
            image_extent: vk::Extent3D { width: desc.width, height: desc.height, depth: desc.depth },
        })
        .collect()
}

/// Read path: device resource → staging buffer (spec §4.F, "Copy device").
fn record_device_copy(
    recorder: &dyn CommandRecorder,
    cb: vk::CommandBuffer,
    src: &DeviceRef,
    staging: vk::Buffer,
    regions: &[CopyRegion],
    staged: &[super::stage::CompactedRegion],
) {
    let command = match src {
        DeviceRef::Buffer { buffer, .. } => CopyCommand::BufferToBuffer {
            src: *buffer,
            dst: staging,
            regions: regions
                .iter()
                .zip(staged)
                .map(|(r, s)| vk::BufferCopy { src_offset: r.device_offset.unwrap_or(0), dst_offset: s.staging_offset, size: s.byte_size })
                .collect(),
        },
        DeviceRef::Image { image, desc, .. } => CopyCommand::ImageToBuffer {
            src: *image,
            src_layout: vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            dst: staging,
            regions: buffer_image_regions(desc, staged.iter().map(|s| s.staging_offset)),
        },
    };
    recorder.record_copy(cb, &command);
}

/// Write path: staging buffer → device resource (spec §4.F, "Copy device").
fn record_device_copy_from_staging(
    recorder: &dyn CommandRecorder,
    cb: vk::CommandBuffer,
    staging: vk::Buffer,
    dst: &DeviceRef,
    regions: &[CopyRegion],
    staged: &[super::stage::CompactedRegion],
) {
    let command = match dst {
        DeviceRef::Buffer { buffer, .. } => CopyCommand::BufferToBuffer {
            src: staging,
            dst: *buffer,
            regions: regions
                .iter()
                .zip(staged)
                .map(|(r, s)| vk::BufferCopy { src_offset: s.staging_offset, dst_offset: r.device_offset.unwrap_or(0), size: s.byte_size })
                .collect(),
        },
        DeviceRef::Image { image, desc, .. } => CopyCommand::BufferToImage {
            src: staging,
            dst: *image,
            dst_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            regions: buffer_image_regions(desc, staged.iter().map(|s| s.staging_offset)),
        },
    };
    recorder.record_copy(cb, &command);
}

/// Device-to-device path: selects buffer-to-buffer, image-to-image,
/// buffer-to-image, or image-to-buffer by `src`/`dst` variant (spec §4.F,
/// "Copy device").
fn record_copy(
    recorder: &dyn CommandRecorder,
    cb: vk::CommandBuffer,
    src: &DeviceRef,
    dst: &DeviceRef,
    regions: &[CopyRegion],
    staged: &[super::stage::CompactedRegion],
) {
    let command = match (src, dst) {
        (DeviceRef::Buffer { buffer: src, .. }, DeviceRef::Buffer { buffer: dst, .. }) => CopyCommand::BufferToBuffer {
            src: *src,
            dst: *dst,
            regions: regions
                .iter()
                .zip(staged)
                .map(|(r, s)| {
                    let offset = r.device_offset.unwrap_or(s.staging_offset);
                    vk::BufferCopy { src_offset: offset, dst_offset: offset, size: s.byte_size }
                })
                .collect(),
        },
        (DeviceRef::Image { image: src, desc: src_desc, .. }, DeviceRef::Image { image: dst, .. }) => {
            let aspect_mask = aspect_mask_for_format(src_desc.format);
            CopyCommand::ImageToImage {
                src: *src,
                src_layout: vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst: *dst,
                dst_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                regions: staged
                    .iter()
                    .map(|_| vk::ImageCopy {
                        src_subresource: vk::ImageSubresourceLayers {
                            aspect_mask,
                            mip_level: 0,
                            base_array_layer: 0,
                            layer_count: src_desc.layers,
                        },
                        src_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
                        dst_subresource: vk::ImageSubresourceLayers {
                            aspect_mask,
                            mip_level: 0,
                            base_array_layer: 0,
                            layer_count: src_desc.layers,
                        },
                        dst_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
                        extent: vk::Extent3D { width: src_desc.width, height: src_desc.height, depth: src_desc.depth },
                    })
                    .collect(),
            }
        }
        (DeviceRef::Image { image, desc, .. }, DeviceRef::Buffer { buffer, .. }) => CopyCommand::ImageToBuffer {
            src: *image,
            src_layout: vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            dst: *buffer,
            regions: buffer_image_regions(desc, staged.iter().map(|s| s.staging_offset)),
        },
        (DeviceRef::Buffer { buffer, .. }, DeviceRef::Image { image, desc, .. }) => CopyCommand::BufferToImage {
            src: *buffer,
            dst: *image,
            dst_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            regions: buffer_image_regions(desc, staged.iter().map(|s| s.staging_offset)),
        },
    };
    recorder.record_copy(cb, &command);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphResult;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    struct NullHeap {
        next_allocation: AtomicU64,
        mapped: std::sync::Mutex<Vec<u8>>,
    }

    impl NullHeap {
        fn new() -> Self {
            Self { next_allocation: AtomicU64::new(1), mapped: std::sync::Mutex::new(vec![0u8; 4096]) }
        }
    }

    impl HeapAllocator for NullHeap {
        fn alloc_buffer(&self, _size: vk::DeviceSize, _usage: vk::BufferUsageFlags, _flags: MemoryFlags) -> GraphResult<(vk::Buffer, AllocationId)> {
            let id = self.next_allocation.fetch_add(1, Ordering::Relaxed);
            Ok((vk::Buffer::null(), AllocationId(id)))
        }
        fn alloc_image(&self, _desc: ImageDesc, _flags: MemoryFlags) -> GraphResult<(vk::Image, AllocationId)> {
            let id = self.next_allocation.fetch_add(1, Ordering::Relaxed);
            Ok((vk::Image::null(), AllocationId(id)))
        }
        fn free_buffer(&self, _buffer: vk::Buffer, _allocation: AllocationId) {}
        fn free_image(&self, _image: vk::Image, _allocation: AllocationId) {}
        fn map(&self, _allocation: AllocationId) -> GraphResult<*mut u8> {
            Ok(self.mapped.lock().unwrap().as_mut_ptr())
        }
        fn unmap(&self, _allocation: AllocationId) {}
        fn flush(&self, _allocation: AllocationId) {}
        fn block(&self, _allocation: AllocationId) {}
    }

    struct NullRecorder {
        alloc_calls: AtomicUsize,
    }

    impl NullRecorder {
        fn new() -> Self {
            Self { alloc_calls: AtomicUsize::new(0) }
        }
    }

    impl CommandRecorder for NullRecorder {
        fn alloc_command_buffer(&self, _queue_family: u32) -> GraphResult<vk::CommandBuffer> {
            self.alloc_calls.fetch_add(1, Ordering::Relaxed);
            Ok(vk::CommandBuffer::null())
        }
        fn free_command_buffer(&self, _queue_family: u32, _buffer: vk::CommandBuffer) {}
        fn begin_one_time_submit(&self, _buffer: vk::CommandBuffer) -> GraphResult<()> {
            Ok(())
        }
        fn end(&self, _buffer: vk::CommandBuffer) -> GraphResult<()> {
            Ok(())
        }
        fn reset(&self, _buffer: vk::CommandBuffer) -> GraphResult<()> {
            Ok(())
        }
        fn record_copy(&self, _buffer: vk::CommandBuffer, _command: &crate::backend::CopyCommand) {}
        fn create_fence(&self) -> GraphResult<vk::Fence> {
            Ok(vk::Fence::null())
        }
        fn destroy_fence(&self, _fence: vk::Fence) {}
        fn fence_signaled(&self, _fence: vk::Fence) -> bool {
            true
        }
        fn reset_fence(&self, _fence: vk::Fence) -> GraphResult<()> {
            Ok(())
        }
        fn wait_fence(&self, _fence: vk::Fence) -> GraphResult<()> {
            Ok(())
        }
        fn submit(
            &self,
            _queue_family: u32,
            _buffer: vk::CommandBuffer,
            _waits: &[(vk::Semaphore, vk::PipelineStageFlags)],
            _signals: &[vk::Semaphore],
            _fence: vk::Fence,
        ) -> GraphResult<()> {
            Ok(())
        }
    }

    fn engine() -> TransferEngine {
        TransferEngine::new(Arc::new(NullHeap::new()), Arc::new(NullRecorder::new()), 0, Some(1))
    }

    #[test]
    fn host_visible_write_skips_staging_and_copies_directly() {
        let e = engine();
        let src = [1u8, 2, 3, 4];
        let dst = DeviceRef::Buffer { buffer: vk::Buffer::null(), allocation: AllocationId(1), flags: MemoryFlags { host_visible: true, ..Default::default() } };
        let regions = [CopyRegion { byte_size: 4, device_offset: Some(0) }];
        e.write(PoolKind::Graphics, src.as_ptr(), dst, TransferFlags::empty(), &regions, &[]).unwrap();
    }

    #[test]
    fn device_write_then_block_waits_for_fence() {
        let e = engine();
        let src = [0u8; 16];
        let dst = DeviceRef::Buffer { buffer: vk::Buffer::null(), allocation: AllocationId(1), flags: MemoryFlags::default() };
        let regions = [CopyRegion { byte_size: 16, device_offset: Some(0) }];
        e.write(PoolKind::Graphics, src.as_ptr(), dst, TransferFlags::BLOCK, &regions, &[]).unwrap();
    }

    #[test]
    fn flush_with_no_dependency_object_still_submits() {
        let e = engine();
        let src = [0u8; 8];
        let dst = DeviceRef::Buffer { buffer: vk::Buffer::null(), allocation: AllocationId(2), flags: MemoryFlags::default() };
        let regions = [CopyRegion { byte_size: 8, device_offset: Some(0) }];
        e.write(PoolKind::Graphics, src.as_ptr(), dst, TransferFlags::empty(), &regions, &[]).unwrap();
        e.flush(PoolKind::Graphics, None).unwrap();
    }

    #[test]
    fn abort_frees_unflushed_staging_buffers() {
        let e = engine();
        let src = [0u8; 8];
        let dst = DeviceRef::Buffer { buffer: vk::Buffer::null(), allocation: AllocationId(3), flags: MemoryFlags::default() };
        let regions = [CopyRegion { byte_size: 8, device_offset: Some(0) }];
        e.write(PoolKind::Graphics, src.as_ptr(), dst, TransferFlags::empty(), &regions, &[]).unwrap();
        e.abort(PoolKind::Graphics, None);
    }
}
