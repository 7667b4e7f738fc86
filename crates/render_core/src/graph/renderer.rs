//! The `Renderer` aggregate root (spec §9): owns the attachment registry and
//! pass DAG behind one coarse mutex, and coordinates analyzer → resolver →
//! builder on `warmup`/`build`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::error;

use crate::backend::{AllocationId, HeapAllocator, PipelineCache, WindowBacking};

use super::analyzer;
use super::attachment::{AttachmentDesc, AttachmentIndex, AttachmentRegistry};
use super::builder::{self, BuildState, RebuildFlags};
use super::dag::PassDag;
use super::error::{GraphError, GraphResult};
use super::pass::{
    AccessMask, BlendDesc, ClearValue, Consumption, Pass, PassId, PassKind, Rect2D, RenderState, ViewParams,
};
use super::resolver;

/// A device object awaiting destruction once every in-flight frame that
/// could reference it has completed (spec §5, §9).
#[derive(Debug, Clone, Copy)]
pub enum StaleResource {
    /// A heap allocation backing a now-invalidated attachment image.
    Backing(AllocationId),
}

struct RendererState {
    attachments: AttachmentRegistry,
    dag: PassDag,
    stale: Vec<StaleResource>,
}

/// The render graph's aggregate root: attachment registry + pass DAG +
/// analyzer/resolver/builder pipeline, guarded by one coarse mutex.
pub struct Renderer {
    state: Mutex<RendererState>,
    heap: Arc<dyn HeapAllocator>,
    cache: Arc<dyn PipelineCache>,
    /// Set on a `Fatal` error; once true, every subsequent call is a no-op
    /// that returns `Fatal` again (spec §7).
    fatal: AtomicBool,
}

impl Renderer {
    /// Construct an empty renderer bound to a heap allocator and pipeline cache.
    pub fn new(heap: Arc<dyn HeapAllocator>, cache: Arc<dyn PipelineCache>) -> Self {
        Self {
            state: Mutex::new(RendererState {
                attachments: AttachmentRegistry::new(),
                dag: PassDag::new(),
                stale: Vec::new(),
            }),
            heap,
            cache,
            fatal: AtomicBool::new(false),
        }
    }

    fn check_fatal(&self) -> GraphResult<()> {
        if self.fatal.load(Ordering::Acquire) {
            return Err(GraphError::Fatal("renderer is in a fatal error state".to_string()));
        }
        Ok(())
    }

    fn mark_fatal(&self, err: GraphError) -> GraphError {
        if matches!(err, GraphError::Fatal(_)) {
            self.fatal.store(true, Ordering::Release);
            error!("renderer entered a fatal state: {err}");
        }
        err
    }

    // --- Attachment registry surface (spec §6) -----------------------------

    /// Describe (create or replace) an image attachment.
    pub fn describe(&self, index: AttachmentIndex, desc: AttachmentDesc) -> GraphResult<()> {
        self.check_fatal()?;
        let mut state = self.state.lock().unwrap();
        state.attachments.describe(index, desc)?;
        state.dag.invalidate();
        Ok(())
    }

    /// Attach a window collaborator at `index`, acquiring its swap-lock.
    pub fn attach_window(&self, index: AttachmentIndex, window: Arc<dyn WindowBacking>) -> GraphResult<()> {
        self.check_fatal()?;
        let mut state = self.state.lock().unwrap();
        state.attachments.attach_window(index, window)?;
        state.dag.invalidate();
        Ok(())
    }

    /// Detach an attachment, releasing its window swap-lock if any. Blocks
    /// until any in-flight frame referencing it could not still do so (in
    /// this implementation: drains the stale queue eagerly).
    pub fn detach(&self, index: AttachmentIndex) {
        let mut state = self.state.lock().unwrap();
        state.attachments.detach(index);
        state.dag.invalidate();
        Self::drain_stale(&mut state, &*self.heap);
    }

    /// Resolve attachment sizes and report whether the result for `index` is
    /// available. A no-op, read-only accessor: callers resolve via `build`.
    pub fn get_resolved_extent(&self, index: AttachmentIndex) -> Option<(u32, u32, u32)> {
        let state = self.state.lock().unwrap();
        state.attachments.get(index).and_then(|a| a.resolved_extent()).map(|e| (e.width, e.height, e.depth))
    }

    // --- Pass DAG surface (spec §6) ----------------------------------------

    /// Add a pass.
    pub fn add_pass(&self, kind: PassKind, group: u32, parents: &[PassId]) -> GraphResult<PassId> {
        self.check_fatal()?;
        let mut state = self.state.lock().unwrap();
        let id = state.dag.add_pass(kind, group, parents).map_err(|e| self.mark_fatal(e))?;
        Ok(id)
    }

    /// Erase a pass; the whole graph is first treated as destructed since
    /// dependent subpass chains may extend through the target (spec §4.B).
    pub fn erase_pass(&self, id: PassId) -> GraphResult<()> {
        self.check_fatal()?;
        let mut state = self.state.lock().unwrap();
        if let Some(master) = chain_master_of(&state.dag, id) {
            let _ = builder::destruct(&mut state.dag, &state.attachments, &*self.cache, master);
        }
        state.dag.erase_pass(id)?;
        Ok(())
    }

    /// Replace a pass's parent list.
    pub fn set_parents(&self, id: PassId, parents: &[PassId]) -> GraphResult<()> {
        self.check_fatal()?;
        let mut state = self.state.lock().unwrap();
        state.dag.set_parents(id, parents)?;
        Ok(())
    }

    /// Cull every pass in `group`.
    pub fn cull(&self, group: u32) {
        let mut state = self.state.lock().unwrap();
        state.dag.cull(group);
    }

    /// Uncull every pass in `group`.
    pub fn uncull(&self, group: u32) {
        let mut state = self.state.lock().unwrap();
        state.dag.uncull(group);
    }

    // --- Consumption surface (spec §6) -------------------------------------

    /// Declare (or overwrite, preserving clear/blend/resolve) that `pass`
    /// consumes `attachment` with `access`/`view`.
    pub fn consume(
        &self,
        pass: PassId,
        attachment: AttachmentIndex,
        access: AccessMask,
        view: ViewParams,
    ) -> GraphResult<()> {
        self.check_fatal()?;
        let mut state = self.state.lock().unwrap();

        // Transient attachments are lazily allocated and only ever touched as
        // render-pass attachments; plain shader read/write access defeats that (spec §4.A).
        if state.attachments.is_transient(attachment) && access.intersects(AccessMask::READ | AccessMask::WRITE) {
            return Err(GraphError::InvalidParent("transient attachments cannot carry read/write access masks".to_string()));
        }

        let render = state
            .dag
            .get_mut(pass)
            .and_then(|p| p.render_mut())
            .ok_or_else(|| GraphError::InvalidParent("consume is only valid on render passes".to_string()))?;

        if let Some(existing) = render.consumptions.iter_mut().find(|c| c.attachment == attachment) {
            existing.access = access;
            existing.view = view;
        } else {
            render.consumptions.push(Consumption::new(attachment, access, view));
        }
        state.dag.invalidate();
        Ok(())
    }

    /// Set the clear value for an existing consumption.
    pub fn clear(&self, pass: PassId, attachment: AttachmentIndex, value: ClearValue) -> GraphResult<()> {
        self.with_consumption_mut(pass, attachment, |c| c.clear = Some(value))
    }

    /// Set the blend state for an existing consumption.
    pub fn blend(&self, pass: PassId, attachment: AttachmentIndex, blend: BlendDesc) -> GraphResult<()> {
        self.with_consumption_mut(pass, attachment, |c| c.blend = Some(blend))
    }

    /// Set the multisample resolve target for an existing consumption.
    pub fn resolve_target(&self, pass: PassId, attachment: AttachmentIndex, target: AttachmentIndex) -> GraphResult<()> {
        self.with_consumption_mut(pass, attachment, |c| c.resolve = Some(target))
    }

    /// Remove a consumption entirely.
    pub fn release(&self, pass: PassId, attachment: AttachmentIndex) -> GraphResult<()> {
        self.check_fatal()?;
        let mut state = self.state.lock().unwrap();
        let render = state
            .dag
            .get_mut(pass)
            .and_then(|p| p.render_mut())
            .ok_or_else(|| GraphError::InvalidParent("release is only valid on render passes".to_string()))?;
        render.consumptions.retain(|c| c.attachment != attachment);
        state.dag.invalidate();
        Ok(())
    }

    /// Replace a render pass's raster/depth/stencil state.
    pub fn set_state(&self, pass: PassId, render_state: RenderState) -> GraphResult<()> {
        self.with_render_mut(pass, |r| r.render_state = render_state)
    }

    /// Set the viewport rectangle.
    pub fn set_viewport(&self, pass: PassId, rect: Rect2D) -> GraphResult<()> {
        self.with_render_mut(pass, |r| r.render_state.viewport = rect)
    }

    /// Set the scissor rectangle.
    pub fn set_scissor(&self, pass: PassId, rect: Rect2D) -> GraphResult<()> {
        self.with_render_mut(pass, |r| r.render_state.scissor = rect)
    }

    fn with_consumption_mut(
        &self,
        pass: PassId,
        attachment: AttachmentIndex,
        f: impl FnOnce(&mut Consumption),
    ) -> GraphResult<()> {
        self.check_fatal()?;
        let mut state = self.state.lock().unwrap();
        let render = state
            .dag
            .get_mut(pass)
            .and_then(|p| p.render_mut())
            .ok_or_else(|| GraphError::InvalidParent("not a render pass".to_string()))?;
        let cons = render
            .consumptions
            .iter_mut()
            .find(|c| c.attachment == attachment)
            .ok_or_else(|| GraphError::InvalidParent("no such consumption".to_string()))?;
        f(cons);
        Ok(())
    }

    fn with_render_mut(&self, pass: PassId, f: impl FnOnce(&mut super::pass::RenderPassExtra)) -> GraphResult<()> {
        self.check_fatal()?;
        let mut state = self.state.lock().unwrap();
        let render = state
            .dag
            .get_mut(pass)
            .and_then(|p| p.render_mut())
            .ok_or_else(|| GraphError::InvalidParent("not a render pass".to_string()))?;
        f(render);
        Ok(())
    }

    // --- Control flow: analyze -> resolve -> build (spec §2, §4) -----------

    /// Run the analyzer and resolver if the graph is invalid, then warm up
    /// every chain's native render-pass handle.
    pub fn warmup(&self) -> GraphResult<()> {
        self.check_fatal()?;
        let mut state = self.state.lock().unwrap();
        self.ensure_analyzed_and_resolved(&mut state);
        let result = builder::warmup(&mut state.dag, &state.attachments, &*self.cache);
        self.record_build_result(result)
    }

    /// Resolve sizes, run analyzer/resolver as needed, warm up, then build
    /// framebuffers for every chain.
    pub fn build(&self) -> GraphResult<()> {
        self.check_fatal()?;
        let mut state = self.state.lock().unwrap();
        state.attachments.resolve_sizes()?;
        self.ensure_analyzed_and_resolved(&mut state);
        builder::warmup(&mut state.dag, &state.attachments, &*self.cache)?;
        let result = builder::build(&mut state.dag, &state.attachments);
        self.record_build_result(result)
    }

    /// Rebuild a single chain (by its master pass id) in response to a
    /// swapchain/format/resize event.
    pub fn rebuild_chain(&self, master: PassId, flags: RebuildFlags) -> GraphResult<()> {
        self.check_fatal()?;
        let mut state = self.state.lock().unwrap();
        let result = builder::rebuild(&mut state.dag, &state.attachments, &*self.cache, master, flags);
        self.record_build_result(result)
    }

    /// The current warmed/built/destructed state of the chain rooted at
    /// `master`, or `None` if `master` is not a render-pass chain master.
    pub fn chain_state(&self, master: PassId) -> Option<BuildState> {
        let state = self.state.lock().unwrap();
        builder::build_state(&state.dag, master)
    }

    fn ensure_analyzed_and_resolved(&self, state: &mut RendererState) {
        if state.dag.is_invalid() {
            analyzer::analyze(&mut state.dag, &state.attachments);
            resolver::resolve(&mut state.dag, &state.attachments);
        }
    }

    /// Build failures are recorded and swallowed back to `Validated` state
    /// (spec §7): the graph stays usable for a retry, but the immediate
    /// caller still observes the error.
    fn record_build_result(&self, result: GraphResult<()>) -> GraphResult<()> {
        match result {
            Ok(()) => Ok(()),
            Err(GraphError::BuildFailed { pass, reason }) => {
                log::warn!("build failed for pass {pass:?}: {reason}, graph remains validated for retry");
                Err(GraphError::BuildFailed { pass, reason })
            }
            Err(err) => Err(self.mark_fatal(err)),
        }
    }

    fn drain_stale(state: &mut RendererState, heap: &dyn HeapAllocator) {
        for resource in state.stale.drain(..) {
            match resource {
                StaleResource::Backing(allocation) => {
                    // Buffer vs. image is not distinguished in this minimal
                    // stale record; image is the only attachment backing kind.
                    heap.free_image(ash::vk::Image::null(), allocation);
                }
            }
        }
    }
}

fn chain_master_of(dag: &PassDag, id: PassId) -> Option<PassId> {
    dag.get(id).and_then(|p: &Pass| p.render()).map(|r| r.master.unwrap_or(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AllocationId, ImageDesc, MemoryFlags, RenderPassDesc, RenderPassKey};
    use ash::vk;

    struct NullHeap;
    impl HeapAllocator for NullHeap {
        fn alloc_buffer(&self, _: vk::DeviceSize, _: vk::BufferUsageFlags, _: MemoryFlags) -> GraphResult<(vk::Buffer, AllocationId)> {
            Ok((vk::Buffer::null(), AllocationId(0)))
        }
        fn alloc_image(&self, _: ImageDesc, _: MemoryFlags) -> GraphResult<(vk::Image, AllocationId)> {
            Ok((vk::Image::null(), AllocationId(0)))
        }
        fn free_buffer(&self, _: vk::Buffer, _: AllocationId) {}
        fn free_image(&self, _: vk::Image, _: AllocationId) {}
        fn map(&self, _: AllocationId) -> GraphResult<*mut u8> {
            Err(GraphError::OutOfMemory)
        }
        fn unmap(&self, _: AllocationId) {}
        fn flush(&self, _: AllocationId) {}
        fn block(&self, _: AllocationId) {}
    }

    struct NullCache;
    impl PipelineCache for NullCache {
        fn get(&self, _: RenderPassKey, _: &RenderPassDesc) -> Option<vk::RenderPass> {
            Some(vk::RenderPass::null())
        }
        fn warmup(&self, _: RenderPassKey, _: &RenderPassDesc) -> bool {
            true
        }
        fn bump_generation(&self, _: RenderPassKey) -> u32 {
            1
        }
        fn generation(&self, _: RenderPassKey) -> u32 {
            1
        }
    }

    fn renderer() -> Renderer {
        Renderer::new(Arc::new(NullHeap), Arc::new(NullCache))
    }

    #[test]
    fn add_pass_with_no_parents_has_level_zero() {
        let r = renderer();
        let p = r.add_pass(PassKind::RenderPass, 0, &[]).unwrap();
        let state = r.state.lock().unwrap();
        assert_eq!(state.dag.get(p).unwrap().level, 0);
    }

    #[test]
    fn describe_then_build_resolves_sizes() {
        let r = renderer();
        let idx = AttachmentIndex(0);
        r.describe(idx, AttachmentDesc::absolute(128, 128, 1)).unwrap();
        r.build().unwrap();
        assert_eq!(r.get_resolved_extent(idx), Some((128, 128, 1)));
    }

    #[test]
    fn consuming_transient_attachment_with_shader_access_is_rejected() {
        let r = renderer();
        let idx = AttachmentIndex(0);
        r.describe(idx, AttachmentDesc::absolute(128, 128, 1).with_transient(true)).unwrap();
        let pass = r.add_pass(PassKind::RenderPass, 0, &[]).unwrap();
        let err = r.consume(pass, idx, AccessMask::READ, ViewParams::default()).unwrap_err();
        assert!(matches!(err, GraphError::InvalidParent(_)));
    }

    #[test]
    fn consuming_transient_attachment_as_attachment_only_is_allowed() {
        let r = renderer();
        let idx = AttachmentIndex(0);
        r.describe(idx, AttachmentDesc::absolute(128, 128, 1).with_transient(true)).unwrap();
        let pass = r.add_pass(PassKind::RenderPass, 0, &[]).unwrap();
        r.consume(pass, idx, AccessMask::ATTACHMENT_WRITE, ViewParams::default()).unwrap();
    }

    #[test]
    fn cull_then_uncull_round_trips_child_counts() {
        let r = renderer();
        let a = r.add_pass(PassKind::RenderPass, 1, &[]).unwrap();
        let _b = r.add_pass(PassKind::RenderPass, 2, &[a]).unwrap();
        r.cull(1);
        r.uncull(1);
        let state = r.state.lock().unwrap();
        assert_eq!(state.dag.get(a).unwrap().child_count, 1);
        assert!(!state.dag.get(a).unwrap().culled);
    }

    #[test]
    fn fatal_error_makes_subsequent_calls_no_ops() {
        let r = renderer();
        r.fatal.store(true, Ordering::Release);
        let err = r.add_pass(PassKind::RenderPass, 0, &[]).unwrap_err();
        assert!(matches!(err, GraphError::Fatal(_)));
    }
}
