//! The low-level command-buffer recorder collaborator interface (spec §1, §6).
//!
//! Out of scope for this crate: command buffer pooling strategy, queue
//! selection, and the actual recording of draw/dispatch commands.
//! `CommandRecorder` is the narrow surface the transfer engine needs to
//! claim, record, submit, and recycle command buffers against fences.

use ash::vk;

use crate::graph::GraphResult;

/// One device-to-device copy variant the transfer engine has resolved
/// (spec §4.F, "Copy device"): which vkCmdCopy* call applies and its regions.
/// The transfer engine selects the variant and computes the regions; the
/// recorder only owns the actual command emission.
#[derive(Debug, Clone)]
pub enum CopyCommand {
    /// `vkCmdCopyBuffer`.
    BufferToBuffer {
        src: vk::Buffer,
        dst: vk::Buffer,
        regions: Vec<vk::BufferCopy>,
    },
    /// `vkCmdCopyBufferToImage`.
    BufferToImage {
        src: vk::Buffer,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        regions: Vec<vk::BufferImageCopy>,
    },
    /// `vkCmdCopyImageToBuffer`.
    ImageToBuffer {
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Buffer,
        regions: Vec<vk::BufferImageCopy>,
    },
    /// `vkCmdCopyImage`.
    ImageToImage {
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        regions: Vec<vk::ImageCopy>,
    },
}

/// Command-buffer allocation, submission, and fence polling for one queue
/// family (spec §4.F: transfer pools claim/recycle through this).
pub trait CommandRecorder: Send + Sync {
    /// Allocate a primary command buffer for `queue_family`.
    fn alloc_command_buffer(&self, queue_family: u32) -> GraphResult<vk::CommandBuffer>;

    /// Free a previously allocated command buffer.
    fn free_command_buffer(&self, queue_family: u32, buffer: vk::CommandBuffer);

    /// Begin recording with one-time-submit usage.
    fn begin_one_time_submit(&self, buffer: vk::CommandBuffer) -> GraphResult<()>;

    /// End recording.
    fn end(&self, buffer: vk::CommandBuffer) -> GraphResult<()>;

    /// Reset a command buffer to the initial state.
    fn reset(&self, buffer: vk::CommandBuffer) -> GraphResult<()>;

    /// Record the given copy variant into `buffer`.
    fn record_copy(&self, buffer: vk::CommandBuffer, command: &CopyCommand);

    /// Create a new, unsignaled fence.
    fn create_fence(&self) -> GraphResult<vk::Fence>;

    /// Destroy a fence.
    fn destroy_fence(&self, fence: vk::Fence);

    /// Whether `fence` is currently signaled.
    fn fence_signaled(&self, fence: vk::Fence) -> bool;

    /// Reset `fence` to the unsignaled state.
    fn reset_fence(&self, fence: vk::Fence) -> GraphResult<()>;

    /// Block the calling thread until `fence` signals.
    fn wait_fence(&self, fence: vk::Fence) -> GraphResult<()>;

    /// Submit `buffer` to `queue_family`, waiting/signaling the given
    /// semaphores at the given pipeline stages, and signaling `fence` on
    /// completion. Held under the queue's external mutex (spec §5).
    fn submit(
        &self,
        queue_family: u32,
        buffer: vk::CommandBuffer,
        waits: &[(vk::Semaphore, vk::PipelineStageFlags)],
        signals: &[vk::Semaphore],
        fence: vk::Fence,
    ) -> GraphResult<()>;
}
