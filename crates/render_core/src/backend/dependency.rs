//! The dependency-object collaborator interface (spec §6).
//!
//! A dependency object collects cross-queue/cross-operation synchronization
//! primitives (semaphores, timeline values) around a batch of injections —
//! it is how the transfer engine's signals become waits on the render side
//! and vice versa (spec §4.F, scenario 5).

use ash::vk;

use crate::graph::GraphResult;

/// One injected synchronization requirement: a resource touched alongside
/// its access mask and the stage it must be visible at.
#[derive(Debug, Clone, Copy)]
pub struct Injection {
    /// Access mask the injecting operation used.
    pub access: vk::AccessFlags,
    /// Pipeline stage the injecting operation ran at.
    pub stage: vk::PipelineStageFlags,
}

/// Catch/prepare/finish/abort lifecycle for a batch of injections (spec §6).
pub trait DependencyObject: Send + Sync {
    /// Collect wait semaphores/stages from `injections` and record any
    /// necessary barriers into `command_buffer`.
    fn catch(&self, command_buffer: vk::CommandBuffer, injections: &[Injection]) -> GraphResult<()>;

    /// Collect signal semaphores/stages to be attached to the submission
    /// that finalizes this batch.
    fn prepare(&self, injections: &[Injection]) -> GraphResult<()>;

    /// Publish the collected signals so future operations can wait on them.
    fn finish(&self) -> GraphResult<()>;

    /// Roll back an aborted, never-submitted batch.
    fn abort(&self);
}
