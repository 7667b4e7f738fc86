//! A single recording session into a transfer pool (spec §3, Transfer operation).

use ash::vk;

use crate::backend::AllocationId;

/// A staging buffer allocation owned by a transfer operation until it is
/// released (on fence signal, or immediately for blocking reads/writes).
#[derive(Debug, Clone, Copy)]
pub struct StagingBuffer {
    /// The staging buffer handle.
    pub buffer: vk::Buffer,
    /// The heap allocation backing it.
    pub allocation: AllocationId,
}

/// One recording session: its command buffer, completion fence, the staging
/// buffers to release once that fence signals, and whether it has been
/// flushed (submitted) yet.
pub struct TransferOperation {
    /// The command buffer this operation recorded into.
    pub command_buffer: vk::CommandBuffer,
    /// The fence signaled when this operation's submission completes.
    pub fence: vk::Fence,
    /// Staging buffers to free once `fence` is signaled.
    pub stagings: Vec<StagingBuffer>,
    /// Whether `flush` has submitted this operation.
    pub flushed: bool,
}

impl TransferOperation {
    /// Wrap a freshly allocated (or recycled) command buffer and fence as a
    /// new, not-yet-flushed operation with no staging buffers attached.
    pub fn new(command_buffer: vk::CommandBuffer, fence: vk::Fence) -> Self {
        Self {
            command_buffer,
            fence,
            stagings: Vec::new(),
            flushed: false,
        }
    }

    /// Reset for reuse: clears flushed state and staging list; the caller is
    /// responsible for having already freed the old stagings and reset the
    /// fence/command buffer via the `CommandRecorder` collaborator.
    pub fn recycle(&mut self) -> Vec<StagingBuffer> {
        self.flushed = false;
        std::mem::take(&mut self.stagings)
    }
}
