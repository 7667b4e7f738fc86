//! A queue-family-specialized transfer pool: claim/recycle and the
//! per-pool synchronization state (spec §3, §4.F, §5).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use ash::vk;

use crate::backend::{CommandRecorder, Injection};

use super::error::TransferResult;
use super::operation::{StagingBuffer, TransferOperation};

struct PoolState {
    operations: VecDeque<TransferOperation>,
    /// Raw injection records accumulated for the currently-open batch,
    /// threaded through to the active dependency object's `catch`/`prepare`
    /// by the engine at flush time (spec §4.F).
    injections: Vec<Injection>,
}

/// One of the two per-heap transfer pools (Graphics or Transfer), guarding
/// its deque of operations, its injection metadata, and its recorded
/// command buffer behind a single mutex (spec §5).
pub struct TransferPool {
    queue_family: u32,
    state: Mutex<PoolState>,
    blocking: AtomicU32,
}

impl TransferPool {
    /// Create an empty pool bound to `queue_family`.
    pub fn new(queue_family: u32) -> Self {
        Self {
            queue_family,
            state: Mutex::new(PoolState { operations: VecDeque::new(), injections: Vec::new() }),
            blocking: AtomicU32::new(0),
        }
    }

    /// The queue family this pool records and submits against.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Mark the start of a blocking (`Block`) operation against this pool,
    /// preventing concurrent recycling until it completes.
    pub fn begin_block(&self) {
        self.blocking.fetch_add(1, Ordering::AcqRel);
    }

    /// Mark the end of a blocking operation.
    pub fn end_block(&self) {
        self.blocking.fetch_sub(1, Ordering::AcqRel);
    }

    /// Claim the tail transfer operation for recording, per spec §4.F:
    /// accumulate into an unflushed tail, recycle a signaled front when
    /// nothing is blocking, or allocate fresh resources otherwise. Returns
    /// the command buffer now open for recording, plus any staging buffers
    /// freed by recycling a completed front operation — the caller (which
    /// holds the heap) is responsible for actually freeing them.
    pub fn claim(&self, recorder: &dyn CommandRecorder) -> TransferResult<(vk::CommandBuffer, Vec<StagingBuffer>)> {
        let mut state = self.state.lock().unwrap();

        if let Some(tail) = state.operations.back() {
            if !tail.flushed {
                return Ok((tail.command_buffer, Vec::new()));
            }
        }

        if self.blocking.load(Ordering::Acquire) == 0 {
            if let Some(front) = state.operations.front() {
                if recorder.fence_signaled(front.fence) {
                    let mut op = state.operations.pop_front().unwrap();
                    let freed = op.recycle();
                    drop(state);
                    recorder.reset_fence(op.fence)?;
                    recorder.reset(op.command_buffer)?;
                    recorder.begin_one_time_submit(op.command_buffer)?;
                    let buffer = op.command_buffer;
                    self.state.lock().unwrap().operations.push_back(op);
                    return Ok((buffer, freed));
                }
            }
        }

        let buffer = recorder.alloc_command_buffer(self.queue_family)?;
        let fence = recorder.create_fence()?;
        recorder.begin_one_time_submit(buffer)?;
        state.operations.push_back(TransferOperation::new(buffer, fence));
        Ok((buffer, Vec::new()))
    }

    /// Attach a staging buffer to the currently open tail operation, so its
    /// lifetime is tied to that operation's fence (spec §4.F, Write).
    pub fn attach_staging(&self, staging: StagingBuffer) {
        let mut state = self.state.lock().unwrap();
        if let Some(tail) = state.operations.back_mut() {
            tail.stagings.push(staging);
        }
    }

    /// The currently open (unflushed) tail operation's fence, if any.
    pub fn tail_fence(&self) -> Option<vk::Fence> {
        self.state.lock().unwrap().operations.back().map(|op| op.fence)
    }

    /// The currently open tail operation's command buffer, if any.
    pub fn tail_command_buffer(&self) -> Option<vk::CommandBuffer> {
        self.state.lock().unwrap().operations.back().map(|op| op.command_buffer)
    }

    /// Append an injection record to the pool's accumulating batch.
    pub fn record_injection(&self, injection: Injection) {
        self.state.lock().unwrap().injections.push(injection);
    }

    /// Drain the pool's accumulated injections, clearing the slot.
    pub fn take_injections(&self) -> Vec<Injection> {
        std::mem::take(&mut self.state.lock().unwrap().injections)
    }

    /// End recording and submit the tail operation, waiting/signaling the
    /// given semaphores, marking it flushed.
    pub fn flush(
        &self,
        recorder: &dyn CommandRecorder,
        waits: &[(vk::Semaphore, vk::PipelineStageFlags)],
        signals: &[vk::Semaphore],
    ) -> TransferResult<()> {
        let (buffer, fence, already_flushed) = {
            let state = self.state.lock().unwrap();
            let Some(tail) = state.operations.back() else { return Ok(()) };
            (tail.command_buffer, tail.fence, tail.flushed)
        };
        if already_flushed {
            return Ok(());
        }

        recorder.end(buffer)?;
        recorder.submit(self.queue_family, buffer, waits, signals, fence)?;

        let mut state = self.state.lock().unwrap();
        if let Some(tail) = state.operations.back_mut() {
            tail.flushed = true;
        }
        Ok(())
    }

    /// Abort the current unflushed tail operation, returning its staging
    /// buffers for the caller to free, and destroying its command
    /// buffer/fence so the pool is left clean (spec §7).
    pub fn abort(&self, recorder: &dyn CommandRecorder) -> Vec<StagingBuffer> {
        let mut state = self.state.lock().unwrap();
        let stagings = if let Some(tail) = state.operations.back() {
            if !tail.flushed {
                let mut op = state.operations.pop_back().unwrap();
                let stagings = op.recycle();
                recorder.destroy_fence(op.fence);
                recorder.free_command_buffer(self.queue_family, op.command_buffer);
                stagings
            } else {
                Vec::new()
            }
        } else {
            Vec::new()
        };
        state.injections.clear();
        stagings
    }
}
