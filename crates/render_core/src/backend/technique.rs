//! The technique/descriptor-reflection collaborator interface (spec §6).
//!
//! Out of scope for this crate: shader reflection, descriptor-set layout
//! derivation, and push-constant layout computation. `TechniqueLayer` is the
//! narrow surface the pass builder consults when it needs shader-stage
//! module handles or set layouts to complete a pipeline — the render graph
//! itself never inspects shader bytecode.

use ash::vk;

/// Shader-stage modules, descriptor-set layouts, and push-constant layout
/// for a single technique (spec §6).
pub trait TechniqueLayer: Send + Sync {
    /// Descriptor-set layouts, in set-index order.
    fn set_layouts(&self) -> &[vk::DescriptorSetLayout];

    /// Shader-stage module handles plus entry points, in pipeline-stage order.
    fn stages(&self) -> &[(vk::ShaderStageFlags, vk::ShaderModule)];

    /// The push-constant ranges this technique declares.
    fn push_constant_ranges(&self) -> &[vk::PushConstantRange];
}
