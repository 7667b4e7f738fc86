//! Attachment Registry (spec §4.A): describes attachments, resolves sizes,
//! invalidates backings on resize, enforces window exclusivity.

use std::sync::Arc;

use ash::vk;

use crate::backend::WindowBacking;
use crate::foundation::collections::FreeList;

use super::error::{GraphError, GraphResult};

/// Dense index of an attachment within a renderer's attachment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttachmentIndex(pub(crate) u32);

impl AttachmentIndex {
    /// Construct an index referring to slot `index` in the dense table.
    /// Callers choose indices; `describe`/`attach_window` grow the table
    /// gaplessly to accommodate whatever is described first.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// The raw dense-table index backing this id.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// A concrete backing allocation for an image attachment, most-recent-first
/// in the attachment's backing list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backing {
    /// The image handle.
    pub image: vk::Image,
    /// The width this backing was built at.
    pub width: u32,
    /// The height this backing was built at.
    pub height: u32,
    /// The depth this backing was built at.
    pub depth: u32,
}

/// How an attachment's size is specified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeSpec {
    /// Fixed width/height/depth.
    Absolute {
        /// Width in texels.
        width: u32,
        /// Height in texels.
        height: u32,
        /// Depth (1 for 2D images).
        depth: u32,
    },
    /// Scaled relative to another attachment's resolved dimensions.
    Relative {
        /// The attachment this size is relative to.
        referent: AttachmentIndex,
        /// X scale factor.
        x: f32,
        /// Y scale factor.
        y: f32,
        /// Z scale factor.
        z: f32,
    },
}

/// User-facing description passed to `describe`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachmentDesc {
    /// Size specification (absolute or relative).
    pub size: SizeSpec,
    /// Array layer count.
    pub layers: u32,
    /// Pixel format.
    pub format: vk::Format,
    /// Multisample sample count.
    pub samples: vk::SampleCountFlags,
    /// Whether this attachment is transient (lazily allocated, spec §4.A).
    pub transient: bool,
}

impl AttachmentDesc {
    /// Construct an absolute-size, single-layer, non-multisampled, non-transient
    /// color attachment description.
    pub fn absolute(width: u32, height: u32, layers: u32) -> Self {
        Self {
            size: SizeSpec::Absolute { width, height, depth: 1 },
            layers,
            format: vk::Format::R8G8B8A8_UNORM,
            samples: vk::SampleCountFlags::TYPE_1,
            transient: false,
        }
    }

    /// Construct a relative-size attachment description.
    pub fn relative(referent: AttachmentIndex, x: f32, y: f32, z: f32) -> Self {
        Self {
            size: SizeSpec::Relative { referent, x, y, z },
            layers: 1,
            format: vk::Format::R8G8B8A8_UNORM,
            samples: vk::SampleCountFlags::TYPE_1,
            transient: false,
        }
    }

    /// Set the pixel format.
    pub fn with_format(mut self, format: vk::Format) -> Self {
        self.format = format;
        self
    }

    /// Mark this attachment transient.
    pub fn with_transient(mut self, transient: bool) -> Self {
        self.transient = transient;
        self
    }
}

/// Resolved dimensions of an attachment, or `None` if not yet resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolvedExtent {
    /// Resolved width.
    pub width: u32,
    /// Resolved height.
    pub height: u32,
    /// Resolved depth.
    pub depth: u32,
}

/// An image attachment's state.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    /// The original description.
    pub desc: AttachmentDesc,
    /// Resolved dimensions, once the fixed-point loop has run.
    pub resolved: Option<ResolvedExtent>,
    /// Backing allocations, most-recent-first.
    pub backings: Vec<Backing>,
}

/// A window attachment's state.
pub struct WindowAttachment {
    /// The window collaborator this attachment is bound to.
    pub window: Arc<dyn WindowBacking>,
}

impl std::fmt::Debug for WindowAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowAttachment").finish_non_exhaustive()
    }
}

/// An attachment slot: empty, an image, or a window (spec §3).
#[derive(Debug)]
pub enum Attachment {
    /// An unused slot.
    Empty,
    /// An image attachment.
    Image(ImageAttachment),
    /// A window attachment.
    Window(WindowAttachment),
}

impl Attachment {
    /// The resolved extent, if any.
    pub fn resolved_extent(&self) -> Option<ResolvedExtent> {
        match self {
            Self::Empty => None,
            Self::Image(img) => img.resolved,
            Self::Window(win) => {
                let (w, h) = win.window.frame_extent();
                Some(ResolvedExtent { width: w, height: h, depth: 1 })
            }
        }
    }
}

/// The attachment registry (spec §4.A).
#[derive(Default)]
pub struct AttachmentRegistry {
    attachments: FreeList<Attachment>,
}

impl AttachmentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { attachments: FreeList::new() }
    }

    /// Describe (create or replace) an image attachment at `index`,
    /// growing the dense vector and filling holes with `Empty` as needed.
    ///
    /// Transient-vs-access-mask rejection (spec §4.A) can't be enforced here:
    /// it depends on the access mask of each consumption, which doesn't exist
    /// until a pass consumes this attachment. `Renderer::consume` enforces it
    /// against `is_transient`.
    pub fn describe(&mut self, index: AttachmentIndex, desc: AttachmentDesc) -> GraphResult<()> {
        self.ensure_slot(index);
        *self
            .attachments
            .get_mut(index.0 as usize)
            .expect("slot ensured above") = Attachment::Image(ImageAttachment {
            desc,
            resolved: None,
            backings: Vec::new(),
        });
        Ok(())
    }

    /// Whether the attachment at `index` was described as transient.
    pub fn is_transient(&self, index: AttachmentIndex) -> bool {
        matches!(self.attachments.get(index.0 as usize), Some(Attachment::Image(img)) if img.desc.transient)
    }

    /// Attach a window collaborator at `index`, acquiring its swap-lock.
    pub fn attach_window(&mut self, index: AttachmentIndex, window: Arc<dyn WindowBacking>) -> GraphResult<()> {
        if !window.try_acquire() {
            return Err(GraphError::WindowBusy);
        }
        self.ensure_slot(index);
        *self
            .attachments
            .get_mut(index.0 as usize)
            .expect("slot ensured above") = Attachment::Window(WindowAttachment { window });
        Ok(())
    }

    /// Detach (empty out) an attachment, releasing its window swap-lock if any.
    pub fn detach(&mut self, index: AttachmentIndex) {
        if let Some(slot) = self.attachments.get_mut(index.0 as usize) {
            if let Attachment::Window(win) = slot {
                win.window.release();
            }
            *slot = Attachment::Empty;
        }
    }

    /// Get a shared reference to the attachment at `index`.
    pub fn get(&self, index: AttachmentIndex) -> Option<&Attachment> {
        self.attachments.get(index.0 as usize)
    }

    /// Get a mutable reference to the attachment at `index`.
    pub fn get_mut(&mut self, index: AttachmentIndex) -> Option<&mut Attachment> {
        self.attachments.get_mut(index.0 as usize)
    }

    /// Number of slots in the dense table (including holes).
    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    /// Whether the table has no slots at all.
    pub fn is_empty(&self) -> bool {
        self.attachments.len() == 0
    }

    fn ensure_slot(&mut self, index: AttachmentIndex) {
        while self.attachments.len() <= index.0 as usize {
            self.attachments.insert(Attachment::Empty);
        }
    }

    /// Run the fixed-point size-resolution loop (spec §4.A). Returns an
    /// error if any attachment remains unresolved after convergence.
    ///
    /// Algorithm: every empty/window/absolute-size attachment starts
    /// resolved. Each iteration, every unresolved relative-size attachment
    /// whose referent is resolved computes `truncate(scale * referent.dims)`.
    /// Stops when an iteration makes no progress.
    pub fn resolve_sizes(&mut self) -> GraphResult<()> {
        let len = self.attachments.len();
        let mut resolved_now: Vec<Option<ResolvedExtent>> = vec![None; len];

        for i in 0..len {
            if let Some(Attachment::Image(img)) = self.attachments.get(i) {
                if let SizeSpec::Absolute { width, height, depth } = img.desc.size {
                    resolved_now[i] = Some(ResolvedExtent { width, height, depth });
                }
            }
        }

        loop {
            let mut progressed = false;
            for i in 0..len {
                if resolved_now[i].is_some() {
                    continue;
                }
                let Some(Attachment::Image(img)) = self.attachments.get(i) else {
                    continue;
                };
                let SizeSpec::Relative { referent, x, y, z } = img.desc.size else {
                    continue;
                };
                let referent_extent = match self.attachments.get(referent.0 as usize) {
                    Some(Attachment::Window(win)) => {
                        let (w, h) = win.window.frame_extent();
                        Some(ResolvedExtent { width: w, height: h, depth: 1 })
                    }
                    Some(_) => resolved_now[referent.0 as usize],
                    None => None,
                };
                if let Some(r) = referent_extent {
                    resolved_now[i] = Some(ResolvedExtent {
                        width: (r.width as f32 * x) as u32,
                        height: (r.height as f32 * y) as u32,
                        depth: (r.depth as f32 * z) as u32,
                    });
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }

        let mut unresolved = false;
        for i in 0..len {
            let Some(Attachment::Image(img)) = self.attachments.get_mut(i) else {
                continue;
            };
            match resolved_now[i] {
                Some(new_extent) => {
                    let changed = img.resolved != Some(new_extent);
                    if changed {
                        // Drop the most-recent backing; deferred free is the
                        // caller's stale-resource queue's responsibility.
                        img.backings.clear();
                    }
                    img.resolved = Some(new_extent);
                }
                None => unresolved = true,
            }
        }

        if unresolved {
            return Err(GraphError::UnresolvedSize);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(i: u32) -> AttachmentIndex {
        AttachmentIndex(i)
    }

    #[test]
    fn gapless_growth_fills_holes_with_empty() {
        let mut reg = AttachmentRegistry::new();
        reg.describe(idx(2), AttachmentDesc::absolute(4, 4, 1)).unwrap();
        assert_eq!(reg.len(), 3);
        assert!(matches!(reg.get(idx(0)), Some(Attachment::Empty)));
        assert!(matches!(reg.get(idx(1)), Some(Attachment::Empty)));
        assert!(matches!(reg.get(idx(2)), Some(Attachment::Image(_))));
    }

    #[test]
    fn relative_size_resolves_against_absolute_referent() {
        let mut reg = AttachmentRegistry::new();
        reg.describe(idx(0), AttachmentDesc::absolute(800, 600, 1)).unwrap();
        reg.describe(idx(1), AttachmentDesc::relative(idx(0), 0.5, 0.5, 1.0)).unwrap();
        reg.resolve_sizes().unwrap();
        let Some(Attachment::Image(img)) = reg.get(idx(1)) else { panic!() };
        assert_eq!(img.resolved, Some(ResolvedExtent { width: 400, height: 300, depth: 1 }));
    }

    #[test]
    fn relative_size_against_zero_sized_referent_yields_zero() {
        let mut reg = AttachmentRegistry::new();
        reg.describe(idx(0), AttachmentDesc::absolute(0, 0, 1)).unwrap();
        reg.describe(idx(1), AttachmentDesc::relative(idx(0), 0.5, 0.5, 1.0)).unwrap();
        reg.resolve_sizes().unwrap();
        let Some(Attachment::Image(img)) = reg.get(idx(1)) else { panic!() };
        assert_eq!(img.resolved, Some(ResolvedExtent { width: 0, height: 0, depth: 1 }));
    }

    #[test]
    fn unresolvable_relative_reference_reports_unresolved_size() {
        let mut reg = AttachmentRegistry::new();
        // index 0 is never described (stays Empty) -> index 1 can't resolve.
        reg.describe(idx(1), AttachmentDesc::relative(idx(0), 1.0, 1.0, 1.0)).unwrap();
        let err = reg.resolve_sizes().unwrap_err();
        assert!(matches!(err, GraphError::UnresolvedSize));
    }

    #[test]
    fn resize_invalidates_existing_backing() {
        let mut reg = AttachmentRegistry::new();
        reg.describe(idx(0), AttachmentDesc::absolute(100, 100, 1)).unwrap();
        reg.resolve_sizes().unwrap();
        if let Some(Attachment::Image(img)) = reg.get_mut(idx(0)) {
            img.backings.push(Backing { image: vk::Image::null(), width: 100, height: 100, depth: 1 });
        }
        reg.describe(idx(0), AttachmentDesc::absolute(200, 200, 1)).unwrap();
        reg.resolve_sizes().unwrap();
        let Some(Attachment::Image(img)) = reg.get(idx(0)) else { panic!() };
        assert!(img.backings.is_empty());
        assert_eq!(img.resolved, Some(ResolvedExtent { width: 200, height: 200, depth: 1 }));
    }
}
