//! The pipeline-cache collaborator interface (spec §6).
//!
//! Out of scope for this crate: pipeline object construction itself.
//! `PipelineCache` is the narrow surface the pass builder needs to
//! look up/warm up cached render-pass objects and to invalidate pipelines
//! keyed against a render pass's generation counter.

use ash::vk;

/// A key identifying a render pass's shape for cache lookup purposes: the
/// ordered attachment formats and subpass dependency structure hash to this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPassKey(pub u64);

/// One subpass's attachment-reference roles (spec §4.E step 2): which view
/// slots it reads as input, writes as color, resolves into, writes as
/// depth/stencil, and which it must preserve untouched across its span.
#[derive(Debug, Clone, Default)]
pub struct SubpassDesc {
    /// Input attachment references, in shader-binding order.
    pub input_attachments: Vec<vk::AttachmentReference>,
    /// Color attachment references, in shader-output order.
    pub color_attachments: Vec<vk::AttachmentReference>,
    /// Resolve attachment references, index-aligned with `color_attachments`
    /// (`vk::ATTACHMENT_UNUSED` where a color attachment has no resolve target).
    pub resolve_attachments: Vec<vk::AttachmentReference>,
    /// The depth/stencil attachment reference, if this subpass writes or reads one.
    pub depth_stencil_attachment: Option<vk::AttachmentReference>,
    /// View-slot indices this subpass must preserve without disturbing, because an
    /// earlier subpass produced them and a later one still needs them.
    pub preserve_attachments: Vec<u32>,
}

/// The fully resolved structural description of a native render pass (spec
/// §4.E steps 2-3): per-attachment descriptions, per-subpass roles, and the
/// subpass dependencies linking them. This is what the pass builder hands a
/// `PipelineCache` collaborator to look up or construct the native object;
/// the render-graph core computes every field, the collaborator only owns
/// the device call and the cache storage.
#[derive(Debug, Clone, Default)]
pub struct RenderPassDesc {
    /// Attachment descriptions, index-aligned with view slots.
    pub attachments: Vec<vk::AttachmentDescription>,
    /// Per-subpass attachment-reference roles, in chain (subpass) order.
    pub subpasses: Vec<SubpassDesc>,
    /// Subpass dependencies linking consumptions within the chain.
    pub dependencies: Vec<vk::SubpassDependency>,
}

/// Get-or-create and warmup for cached render-pass objects (spec §6).
pub trait PipelineCache: Send + Sync {
    /// Look up (or create) the render pass for `key`, given the fully
    /// resolved attachment/subpass/dependency description.
    fn get(&self, key: RenderPassKey, desc: &RenderPassDesc) -> Option<vk::RenderPass>;

    /// Eagerly warm the cache entry for `key` without requiring a
    /// subsequent `get`. Returns whether the warmup inserted a new entry.
    fn warmup(&self, key: RenderPassKey, desc: &RenderPassDesc) -> bool;

    /// Bump the generation associated with `key`, invalidating any pipeline
    /// snapshot built against the previous generation.
    fn bump_generation(&self, key: RenderPassKey) -> u32;

    /// The current generation for `key`.
    fn generation(&self, key: RenderPassKey) -> u32;
}
