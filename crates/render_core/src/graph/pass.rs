//! Pass, consumption, and dependency-command data model (spec §3).

use ash::vk;
use bitflags::bitflags;

use super::attachment::AttachmentIndex;

/// Dense index of a pass within a renderer's pass table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub(crate) u32);

impl PassId {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// The raw dense-table index backing this id.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// The three pass variants a renderer may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// A graphics render pass — the only kind eligible for subpass merging.
    RenderPass,
    /// A compute pass recorded inline with the graphics queue's submission order.
    InlineComputePass,
    /// A compute pass recorded on the async-compute queue.
    AsyncComputePass,
}

impl PassKind {
    pub(crate) fn is_async(self) -> bool {
        matches!(self, Self::AsyncComputePass)
    }
}

bitflags! {
    /// How a pass accesses an attachment it consumes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessMask: u32 {
        /// Plain shader read (e.g. sampled image, storage buffer read).
        const READ = 1 << 0;
        /// Plain shader write (e.g. storage image/buffer write).
        const WRITE = 1 << 1;
        /// Read as a subpass input attachment.
        const ATTACHMENT_INPUT = 1 << 2;
        /// Read as a color/depth attachment (e.g. blend source).
        const ATTACHMENT_READ = 1 << 3;
        /// Written as a color/depth/stencil attachment.
        const ATTACHMENT_WRITE = 1 << 4;
        /// Written as a multisample resolve target.
        const ATTACHMENT_RESOLVE = 1 << 5;
        /// Contents may be discarded without preservation.
        const DISCARD = 1 << 6;
    }
}

impl AccessMask {
    /// True if this mask touches the attachment as a render-pass attachment
    /// (as opposed to a plain shader resource).
    pub fn is_attachment_access(self) -> bool {
        self.intersects(
            Self::ATTACHMENT_INPUT | Self::ATTACHMENT_READ | Self::ATTACHMENT_WRITE | Self::ATTACHMENT_RESOLVE,
        )
    }

    /// True if this mask writes the attachment in any way.
    pub fn is_write(self) -> bool {
        self.intersects(Self::WRITE | Self::ATTACHMENT_WRITE | Self::ATTACHMENT_RESOLVE)
    }
}

bitflags! {
    /// Which image aspects a view addresses.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AspectMask: u32 {
        /// Color aspect.
        const COLOR = 1 << 0;
        /// Depth aspect.
        const DEPTH = 1 << 1;
        /// Stencil aspect.
        const STENCIL = 1 << 2;
    }
}

/// The image-view type a consumption expects, when explicitly viewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewType {
    /// 1D image view.
    Type1D,
    /// 2D image view.
    Type2D,
    /// 3D image view.
    Type3D,
    /// Cube image view.
    Cube,
    /// 2D array image view.
    Array2D,
}

/// Component swizzle applied to a view; identity unless explicitly set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Swizzle {
    /// Red channel source.
    pub r: vk::ComponentSwizzle,
    /// Green channel source.
    pub g: vk::ComponentSwizzle,
    /// Blue channel source.
    pub b: vk::ComponentSwizzle,
    /// Alpha channel source.
    pub a: vk::ComponentSwizzle,
}

impl Swizzle {
    /// The identity swizzle (each channel maps to itself).
    pub fn identity() -> Self {
        Self {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        }
    }
}

/// An explicit view description overriding the attachment's natural view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewDescription {
    /// The view type to create.
    pub view_type: ViewType,
    /// Component swizzle.
    pub swizzle: Swizzle,
}

/// Viewed-aspect range plus an optional explicit view (spec §3, Consumption).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewParams {
    /// Which aspects this view addresses.
    pub aspect: AspectMask,
    /// First mip level.
    pub mip_base: u32,
    /// Number of mip levels.
    pub mip_count: u32,
    /// First array layer.
    pub layer_base: u32,
    /// Number of array layers.
    pub layer_count: u32,
    /// Explicit view override, if the consumer requested one.
    pub view: Option<ViewDescription>,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            aspect: AspectMask::COLOR,
            mip_base: 0,
            mip_count: 1,
            layer_base: 0,
            layer_count: 1,
            view: None,
        }
    }
}

impl ViewParams {
    /// Whether this view is "compatible" with `other` for merge-scoring
    /// purposes (spec §4.C): same viewed flag, view type when viewed, aspect,
    /// mip range, layer range, and swizzle.
    pub fn is_compatible_with(&self, other: &Self) -> bool {
        if self.aspect != other.aspect
            || self.mip_base != other.mip_base
            || self.mip_count != other.mip_count
            || self.layer_base != other.layer_base
            || self.layer_count != other.layer_count
        {
            return false;
        }
        match (self.view, other.view) {
            (None, None) => true,
            (Some(a), Some(b)) => a.view_type == b.view_type && a.swizzle == b.swizzle,
            _ => false,
        }
    }
}

/// A clear value, tagged by which aspect it clears.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// RGBA clear color.
    Color([f32; 4]),
    /// Depth/stencil clear value.
    DepthStencil {
        /// Clear depth.
        depth: f32,
        /// Clear stencil.
        stencil: u32,
    },
}

/// Blend factors and operation for a color attachment consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendDesc {
    /// Source color blend factor.
    pub src_color: vk::BlendFactor,
    /// Destination color blend factor.
    pub dst_color: vk::BlendFactor,
    /// Color blend operation.
    pub color_op: vk::BlendOp,
    /// Source alpha blend factor.
    pub src_alpha: vk::BlendFactor,
    /// Destination alpha blend factor.
    pub dst_alpha: vk::BlendFactor,
    /// Alpha blend operation.
    pub alpha_op: vk::BlendOp,
}

/// The image layout assigned to a consumption by the resolver (spec §4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// No guarantees about contents or layout.
    Undefined,
    /// Optimal for color attachment read/write.
    ColorAttachmentOptimal,
    /// Optimal for depth/stencil attachment read/write.
    DepthStencilAttachmentOptimal,
    /// Optimal for sampled/input-attachment reads.
    ShaderReadOnlyOptimal,
    /// Optimal for transfer source.
    TransferSrcOptimal,
    /// Optimal for transfer destination.
    TransferDstOptimal,
    /// Ready for presentation.
    PresentSrc,
    /// General-purpose layout (storage image access, etc).
    General,
}

impl Layout {
    /// The native image layout this value corresponds to.
    pub fn to_vk(self) -> vk::ImageLayout {
        match self {
            Self::Undefined => vk::ImageLayout::UNDEFINED,
            Self::ColorAttachmentOptimal => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            Self::DepthStencilAttachmentOptimal => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            Self::ShaderReadOnlyOptimal => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            Self::TransferSrcOptimal => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            Self::TransferDstOptimal => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            Self::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
            Self::General => vk::ImageLayout::GENERAL,
        }
    }
}

/// A reference into `last_consume` identifying a specific pass's consumption
/// of a specific attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumptionRef {
    /// The pass doing the consuming.
    pub pass: PassId,
    /// The attachment consumed.
    pub attachment: AttachmentIndex,
}

bitflags! {
    /// Whether a consumption is the first and/or last reference to its
    /// attachment within its subpass chain.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ConsumptionState: u8 {
        /// First consumption of the attachment in the chain.
        const FIRST = 1 << 0;
        /// Last consumption of the attachment in the chain.
        const LAST = 1 << 1;
    }
}

/// A (pass, attachment) edge (spec §3, Consumption).
#[derive(Debug, Clone)]
pub struct Consumption {
    /// The attachment this consumption refers to.
    pub attachment: AttachmentIndex,
    /// How the pass accesses the attachment.
    pub access: AccessMask,
    /// The viewed aspect range and optional explicit view.
    pub view: ViewParams,
    /// Clear aspect/value, if this consumption clears the attachment.
    pub clear: Option<ClearValue>,
    /// Blend state, for color attachment writes.
    pub blend: Option<BlendDesc>,
    /// Resolve target attachment, if this is a multisample resolve source.
    pub resolve: Option<AttachmentIndex>,

    // Resolver-computed fields (spec §4.D).
    /// Subpass index within the owning chain, once resolved.
    pub subpass_index: u32,
    /// Initial image layout on entry to this consumption.
    pub initial_layout: Layout,
    /// Final image layout on exit from this consumption.
    pub final_layout: Layout,
    /// First/last-in-chain state bits.
    pub state: ConsumptionState,
    /// The previous consumption of the same attachment, if any.
    pub prev: Option<ConsumptionRef>,
    /// The next consumption of the same attachment, if any.
    pub next: Option<ConsumptionRef>,
    /// Whether an execution barrier (as opposed to an implicit subpass
    /// dependency) is required before this consumption.
    pub requires_barrier: bool,
}

impl Consumption {
    pub(crate) fn new(attachment: AttachmentIndex, access: AccessMask, view: ViewParams) -> Self {
        Self {
            attachment,
            access,
            view,
            clear: None,
            blend: None,
            resolve: None,
            subpass_index: 0,
            initial_layout: Layout::Undefined,
            final_layout: Layout::Undefined,
            state: ConsumptionState::FIRST | ConsumptionState::LAST,
            prev: None,
            next: None,
            requires_barrier: false,
        }
    }

    /// Whether this consumption requests the attachment be cleared.
    pub fn clears(&self) -> bool {
        self.clear.is_some()
    }
}

/// A reference to a resource a dependency command touches; either an
/// in-graph attachment or an opaque external handle owned by a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRef {
    /// An attachment in this renderer's registry.
    Attachment(AttachmentIndex),
    /// An externally-owned resource, identified opaquely.
    External(u64),
}

/// Opaque handle to an external dependency-object collaborator (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyObjectId(pub u64);

/// An in-pass command introduced before/between recordings (spec §3).
#[derive(Debug, Clone)]
pub struct DependencyCommand {
    /// Source access mask.
    pub src_mask: AccessMask,
    /// Source pipeline stage.
    pub src_stage: vk::PipelineStageFlags,
    /// Target access mask.
    pub dst_mask: AccessMask,
    /// Target pipeline stage.
    pub dst_stage: vk::PipelineStageFlags,
    /// Optional external dependency-object handle.
    pub dependency_object: Option<DependencyObjectId>,
    /// The resource this command guards.
    pub resource: ResourceRef,

    // Analyzer/resolver-computed fields.
    /// Format of the referenced resource, once resolved.
    pub format: Option<vk::Format>,
    /// True iff both endpoints are render passes in the same chain and no
    /// external dependency object is involved.
    pub is_subpass_dependency: bool,
    /// True if the source/target masks imply a layout transition.
    pub is_layout_transition: bool,
}

impl DependencyCommand {
    /// Create a new, unresolved dependency command.
    pub fn new(
        src_mask: AccessMask,
        src_stage: vk::PipelineStageFlags,
        dst_mask: AccessMask,
        dst_stage: vk::PipelineStageFlags,
        resource: ResourceRef,
    ) -> Self {
        Self {
            src_mask,
            src_stage,
            dst_mask,
            dst_stage,
            dependency_object: None,
            resource,
            format: None,
            is_subpass_dependency: false,
            is_layout_transition: false,
        }
    }
}

/// Cull/depth/viewport/scissor raster state carried by a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    /// Face culling mode.
    pub cull_mode: vk::CullModeFlags,
    /// Polygon fill mode.
    pub polygon_mode: vk::PolygonMode,
    /// Depth test enabled.
    pub depth_test: bool,
    /// Depth write enabled.
    pub depth_write: bool,
    /// Stencil test enabled.
    pub stencil_test: bool,
    /// Viewport rectangle.
    pub viewport: Rect2D,
    /// Scissor rectangle.
    pub scissor: Rect2D,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            cull_mode: vk::CullModeFlags::BACK,
            polygon_mode: vk::PolygonMode::FILL,
            depth_test: true,
            depth_write: true,
            stencil_test: false,
            viewport: Rect2D::default(),
            scissor: Rect2D::default(),
        }
    }
}

/// A simple axis-aligned rectangle used for viewports and scissors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect2D {
    /// X offset.
    pub x: i32,
    /// Y offset.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

/// A cached native render-pass handle shared by every member of a chain
/// (spec §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildHandle {
    /// The native render-pass object.
    pub render_pass: vk::RenderPass,
    /// Framebuffers, one per swapchain image (or a single entry for
    /// non-window-backed chains).
    pub framebuffer_count: u32,
}

/// Render-pass-only state, present only when `Pass::kind == RenderPass`.
#[derive(Debug, Default)]
pub struct RenderPassExtra {
    /// Attachment consumptions.
    pub consumptions: Vec<Consumption>,
    /// In-pass dependency commands.
    pub dependency_commands: Vec<DependencyCommand>,
    /// Raster/depth/viewport state.
    pub render_state: RenderState,
    /// The chain's master pass, or `None` if this pass is itself a master
    /// (or unmerged).
    pub master: Option<PassId>,
    /// The next pass in the chain, if any.
    pub next: Option<PassId>,
    /// This pass's subpass index within the chain.
    pub subpass: u32,
    /// Total subpasses in the chain; only meaningful on the master.
    pub subpasses: u32,
    /// The backing window attachment, if any.
    pub backing_window: Option<AttachmentIndex>,
    /// Framebuffer dimensions, once the builder validates them.
    pub framebuffer_extent: Option<(u32, u32, u32)>,
    /// Cached native render-pass/framebuffer handle.
    pub build: Option<BuildHandle>,
    /// Generation counter, bumped on `Reformat` rebuilds.
    pub generation: u32,
}

impl RenderPassExtra {
    /// Whether this pass is the master of its own (possibly length-1) chain.
    pub fn is_master(&self) -> bool {
        self.master.is_none()
    }
}

/// A pass in the render graph (spec §3).
#[derive(Debug)]
pub struct Pass {
    /// Which of the three pass variants this is.
    pub kind: PassKind,
    /// `1 + max(parent.level)`, or 0 if no parents.
    pub level: u32,
    /// Ordered parent list.
    pub parents: Vec<PassId>,
    /// Count of non-culled children directly parenting on this pass.
    pub child_count: u32,
    /// Group id, used by `cull`/`uncull`.
    pub group: u32,
    /// Whether this pass is excluded from analysis/build/submission.
    pub culled: bool,
    /// Final monotonically increasing order assigned by the resolver.
    pub order: Option<u32>,
    /// Render-pass-only fields; `None` for compute passes.
    pub render: Option<RenderPassExtra>,
}

impl Pass {
    pub(crate) fn new(kind: PassKind, level: u32, parents: Vec<PassId>, group: u32) -> Self {
        let render = matches!(kind, PassKind::RenderPass).then(RenderPassExtra::default);
        Self {
            kind,
            level,
            parents,
            child_count: 0,
            group,
            culled: false,
            order: None,
            render,
        }
    }

    /// Whether this pass belongs to the async-compute region.
    pub fn is_async(&self) -> bool {
        self.kind.is_async()
    }

    /// Mutable access to render-pass-only state; `None` for compute passes.
    pub fn render_mut(&mut self) -> Option<&mut RenderPassExtra> {
        self.render.as_mut()
    }

    /// Shared access to render-pass-only state; `None` for compute passes.
    pub fn render(&self) -> Option<&RenderPassExtra> {
        self.render.as_ref()
    }
}
