//! Pass Builder (spec §4.E): warmup/build/rebuild/destruct lifecycle
//! converting a resolved chain into native render-pass + framebuffer objects.

use ash::vk;

use crate::backend::{PipelineCache, RenderPassDesc, RenderPassKey, SubpassDesc, WindowBacking};

use super::attachment::{Attachment, AttachmentIndex, AttachmentRegistry};
use super::dag::PassDag;
use super::error::{GraphError, GraphResult};
use super::pass::{AccessMask, BuildHandle, PassId};

bitflags::bitflags! {
    /// Rebuild scope requested of the builder.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RebuildFlags: u8 {
        /// Drop framebuffers and non-cached views; keep the cached render pass.
        const RECREATE = 1 << 0;
        /// Also drop the cached render-pass handle and bump the chain generation.
        const REFORMAT = 1 << 1;
        /// Shorthand a window-resize event maps to (implies `RECREATE`).
        const RESIZE = 1 << 2;
    }
}

/// Whether a chain master has a cached render-pass handle ("warmed"), full
/// framebuffers ("built"), or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Neither a render-pass handle nor framebuffers exist.
    Destructed,
    /// A render-pass handle exists; framebuffers do not.
    Warmed,
    /// Both a render-pass handle and framebuffers exist.
    Built,
}

/// Warm up every non-culled render-pass chain master: emit subpass
/// descriptions/dependencies and resolve a cached native render-pass handle.
pub(crate) fn warmup(
    dag: &mut PassDag,
    attachments: &AttachmentRegistry,
    cache: &dyn PipelineCache,
) -> GraphResult<()> {
    let masters = chain_masters(dag);
    for master in masters {
        warmup_chain(dag, attachments, cache, master)?;
    }
    Ok(())
}

/// Query the current build state of the chain rooted at `master`.
pub(crate) fn build_state(dag: &PassDag, master: PassId) -> Option<BuildState> {
    let render = dag.get(master)?.render()?;
    Some(match &render.build {
        None => BuildState::Destructed,
        Some(_) if render.framebuffer_extent.is_some() => BuildState::Built,
        Some(_) => BuildState::Warmed,
    })
}

/// Build framebuffers for every warmed, non-culled chain master.
pub(crate) fn build(dag: &mut PassDag, attachments: &AttachmentRegistry) -> GraphResult<()> {
    let masters = chain_masters(dag);
    for master in masters {
        build_chain(dag, attachments, master)?;
    }
    Ok(())
}

/// Rebuild a single chain (identified by its master), tearing down the
/// scope named by `flags` and re-running warmup/build to the level
/// previously reached.
pub(crate) fn rebuild(
    dag: &mut PassDag,
    attachments: &AttachmentRegistry,
    cache: &dyn PipelineCache,
    master: PassId,
    flags: RebuildFlags,
) -> GraphResult<()> {
    let had_build = dag
        .get(master)
        .and_then(|p| p.render())
        .map(|r| r.build.is_some())
        .unwrap_or(false);

    if flags.intersects(RebuildFlags::RECREATE | RebuildFlags::RESIZE) {
        if let Some(render) = dag.get_mut(master).and_then(|p| p.render_mut()) {
            render.framebuffer_extent = None;
            if let Some(build) = &mut render.build {
                build.framebuffer_count = 0;
            }
        }
    }

    if flags.contains(RebuildFlags::REFORMAT) {
        let key = render_pass_key(dag, master);
        cache.bump_generation(key);
        if let Some(render) = dag.get_mut(master).and_then(|p| p.render_mut()) {
            render.build = None;
            render.generation = render.generation.wrapping_add(1);
        }
        let new_generation = dag.get(master).and_then(|p| p.render()).map(|r| r.generation).unwrap_or(0);
        for member in chain_members(dag, master) {
            if member == master {
                continue;
            }
            if let Some(render) = dag.get_mut(member).and_then(|p| p.render_mut()) {
                render.generation = new_generation;
            }
        }
    }

    warmup_chain(dag, attachments, cache, master)?;
    if had_build {
        build_chain(dag, attachments, master)?;
    }
    Ok(())
}

/// Tear a chain down completely: equivalent to `rebuild` with every flag set.
pub(crate) fn destruct(
    dag: &mut PassDag,
    attachments: &AttachmentRegistry,
    cache: &dyn PipelineCache,
    master: PassId,
) -> GraphResult<()> {
    if let Some(render) = dag.get_mut(master).and_then(|p| p.render_mut()) {
        render.build = None;
        render.framebuffer_extent = None;
    }
    let _ = rebuild(dag, attachments, cache, master, RebuildFlags::all());
    Ok(())
}

fn chain_masters(dag: &PassDag) -> Vec<PassId> {
    dag.render_region()
        .iter()
        .copied()
        .filter(|&id| {
            dag.get(id)
                .map(|p| !p.culled && p.render().map(|r| r.is_master()).unwrap_or(false))
                .unwrap_or(false)
        })
        .collect()
}

fn chain_members(dag: &PassDag, master: PassId) -> Vec<PassId> {
    let mut members = vec![master];
    let mut cur = master;
    while let Some(next) = dag.get(cur).and_then(|p| p.render()).and_then(|r| r.next) {
        members.push(next);
        cur = next;
    }
    members
}

fn render_pass_key(dag: &PassDag, master: PassId) -> RenderPassKey {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    for member in chain_members(dag, master) {
        if let Some(render) = dag.get(member).and_then(|p| p.render()) {
            for c in &render.consumptions {
                c.attachment.index().hash(&mut hasher);
                c.access.bits().hash(&mut hasher);
            }
        }
    }
    RenderPassKey(hasher.finish())
}

fn is_view_slot(access: AccessMask) -> bool {
    access.intersects(
        AccessMask::ATTACHMENT_INPUT | AccessMask::ATTACHMENT_READ | AccessMask::ATTACHMENT_WRITE | AccessMask::ATTACHMENT_RESOLVE,
    )
}

fn warmup_chain(
    dag: &mut PassDag,
    attachments: &AttachmentRegistry,
    cache: &dyn PipelineCache,
    master: PassId,
) -> GraphResult<()> {
    let members = chain_members(dag, master);

    // Step 1: collect view slots, warning (not failing) on disallowed
    // repeats within the chain.
    let mut window_count = 0u32;
    let mut depth_write_count = 0u32;
    let mut view_slots: Vec<AttachmentIndex> = Vec::new();
    for member in &members {
        let Some(render) = dag.get(*member).and_then(|p| p.render()) else { continue };
        for c in &render.consumptions {
            if !is_view_slot(c.access) {
                continue;
            }
            if matches!(attachments.get(c.attachment), Some(Attachment::Window(_))) {
                window_count += 1;
            }
            if c.access.contains(AccessMask::ATTACHMENT_WRITE) {
                if let Some(Attachment::Image(img)) = attachments.get(c.attachment) {
                    if is_depth_format(img.desc.format) {
                        depth_write_count += 1;
                    }
                }
            }
            if !view_slots.contains(&c.attachment) {
                view_slots.push(c.attachment);
            }
        }
    }
    if window_count > 1 {
        log::warn!("chain master {master:?}: multiple window attachments in one pass, using the first");
    }
    if depth_write_count > 1 {
        log::warn!("chain master {master:?}: multiple depth/stencil writes in one pass");
    }

    // Step 2: per-subpass attachment-reference roles (input / color / resolve /
    // depth-stencil / preserve), tracking each view slot's first and last use
    // across the chain so preserve attachments can be derived.
    let mut slot_first_use: Vec<Option<usize>> = vec![None; view_slots.len()];
    let mut slot_last_use: Vec<Option<usize>> = vec![None; view_slots.len()];
    for (m, member) in members.iter().enumerate() {
        let Some(render) = dag.get(*member).and_then(|p| p.render()) else { continue };
        for c in &render.consumptions {
            if !is_view_slot(c.access) {
                continue;
            }
            let Some(slot) = view_slots.iter().position(|a| *a == c.attachment) else { continue };
            slot_first_use[slot].get_or_insert(m);
            slot_last_use[slot] = Some(m);
        }
    }

    let mut subpasses: Vec<SubpassDesc> = Vec::with_capacity(members.len());
    for (m, member) in members.iter().enumerate() {
        let mut subpass = SubpassDesc::default();
        let mut referenced = vec![false; view_slots.len()];
        if let Some(render) = dag.get(*member).and_then(|p| p.render()) {
            for c in &render.consumptions {
                if !is_view_slot(c.access) {
                    continue;
                }
                let Some(slot) = view_slots.iter().position(|a| *a == c.attachment) else { continue };
                referenced[slot] = true;
                let reference = vk::AttachmentReference { attachment: slot as u32, layout: c.initial_layout.to_vk() };

                if c.access.contains(AccessMask::ATTACHMENT_INPUT) {
                    subpass.input_attachments.push(reference);
                    continue;
                }
                let is_depth = matches!(
                    attachments.get(c.attachment),
                    Some(Attachment::Image(img)) if is_depth_format(img.desc.format)
                );
                if is_depth {
                    subpass.depth_stencil_attachment = Some(reference);
                    continue;
                }
                subpass.color_attachments.push(reference);
                let resolve_reference = match c.resolve.and_then(|target| view_slots.iter().position(|a| *a == target)) {
                    Some(target_slot) => {
                        vk::AttachmentReference { attachment: target_slot as u32, layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL }
                    }
                    None => vk::AttachmentReference { attachment: vk::ATTACHMENT_UNUSED, layout: vk::ImageLayout::UNDEFINED },
                };
                subpass.resolve_attachments.push(resolve_reference);
            }
        }

        for (slot, &is_referenced) in referenced.iter().enumerate() {
            if is_referenced {
                continue;
            }
            let produced_before = slot_first_use[slot].map(|f| f < m).unwrap_or(false);
            let needed_after = slot_last_use[slot].map(|l| l > m).unwrap_or(false);
            if produced_before && needed_after {
                subpass.preserve_attachments.push(slot as u32);
            }
        }

        subpasses.push(subpass);
    }

    // Step 3: subpass dependencies from resolved prev links within the
    // chain, plus explicit dependency commands flagged as subpass dependencies.
    let mut dependencies: Vec<vk::SubpassDependency> = Vec::new();
    for (m, member) in members.iter().enumerate() {
        let Some(render) = dag.get(*member).and_then(|p| p.render()) else { continue };
        for c in &render.consumptions {
            let Some(prev) = c.prev else { continue };
            let Some(prev_subpass) = members.iter().position(|id| *id == prev.pass) else { continue };
            let prev_access = dag
                .get(prev.pass)
                .and_then(|p| p.render())
                .and_then(|r| r.consumptions.iter().find(|pc| pc.attachment == prev.attachment))
                .map(|pc| pc.access)
                .unwrap_or(AccessMask::empty());
            let format = attachment_format(attachments, c.attachment);
            let (src_stage, src_access) = stage_and_access_for(prev_access, format);
            let (dst_stage, dst_access) = stage_and_access_for(c.access, format);
            dependencies.push(vk::SubpassDependency {
                src_subpass: prev_subpass as u32,
                dst_subpass: m as u32,
                src_stage_mask: src_stage,
                dst_stage_mask: dst_stage,
                src_access_mask: src_access,
                dst_access_mask: dst_access,
                dependency_flags: vk::DependencyFlags::BY_REGION,
            });
        }
        for cmd in &render.dependency_commands {
            if !cmd.is_subpass_dependency {
                continue;
            }
            dependencies.push(vk::SubpassDependency {
                src_subpass: m as u32,
                dst_subpass: m as u32,
                src_stage_mask: cmd.src_stage,
                dst_stage_mask: cmd.dst_stage,
                src_access_mask: access_mask_to_vk(cmd.src_mask),
                dst_access_mask: access_mask_to_vk(cmd.dst_mask),
                dependency_flags: vk::DependencyFlags::BY_REGION,
            });
        }
    }

    let attachment_descs: Vec<vk::AttachmentDescription> =
        view_slots.iter().map(|&index| attachment_description(attachments, dag, &members, index)).collect();

    let desc = RenderPassDesc { attachments: attachment_descs, subpasses, dependencies };

    let key = render_pass_key(dag, master);
    let render_pass = match cache.get(key, &desc) {
        Some(rp) => rp,
        None => {
            cache.warmup(key, &desc);
            cache
                .get(key, &desc)
                .ok_or_else(|| GraphError::BuildFailed { pass: master, reason: "pipeline cache warmup failed".to_string() })?
        }
    };

    let framebuffer_count = view_slots.len() as u32;
    for member in &members {
        if let Some(render) = dag.get_mut(*member).and_then(|p| p.render_mut()) {
            render.build = Some(BuildHandle { render_pass, framebuffer_count });
        }
    }

    Ok(())
}

fn attachment_format(attachments: &AttachmentRegistry, index: AttachmentIndex) -> vk::Format {
    match attachments.get(index) {
        Some(Attachment::Image(img)) => img.desc.format,
        Some(Attachment::Window(win)) => win.window.format(),
        _ => vk::Format::UNDEFINED,
    }
}

fn attachment_description(
    attachments: &AttachmentRegistry,
    dag: &PassDag,
    members: &[PassId],
    index: AttachmentIndex,
) -> vk::AttachmentDescription {
    let (format, samples) = match attachments.get(index) {
        Some(Attachment::Image(img)) => (img.desc.format, img.desc.samples),
        Some(Attachment::Window(win)) => (win.window.format(), vk::SampleCountFlags::TYPE_1),
        _ => (vk::Format::UNDEFINED, vk::SampleCountFlags::TYPE_1),
    };

    let mut clears = false;
    let mut initial_layout = vk::ImageLayout::UNDEFINED;
    let mut final_layout = vk::ImageLayout::UNDEFINED;
    let mut found_first = false;
    for member in members {
        let Some(render) = dag.get(*member).and_then(|p| p.render()) else { continue };
        let Some(c) = render.consumptions.iter().find(|c| c.attachment == index) else { continue };
        if !found_first {
            initial_layout = c.initial_layout.to_vk();
            found_first = true;
        }
        final_layout = c.final_layout.to_vk();
        clears |= c.clears();
    }

    vk::AttachmentDescription {
        format,
        samples,
        load_op: if clears { vk::AttachmentLoadOp::CLEAR } else { vk::AttachmentLoadOp::LOAD },
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
        stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        initial_layout,
        final_layout,
        ..Default::default()
    }
}

/// Pipeline stage and access masks a given consumption access implies, for
/// native subpass-dependency emission (spec §4.E step 3).
fn stage_and_access_for(access: AccessMask, format: vk::Format) -> (vk::PipelineStageFlags, vk::AccessFlags) {
    let is_depth = is_depth_format(format);
    if access.contains(AccessMask::ATTACHMENT_WRITE) || access.contains(AccessMask::ATTACHMENT_RESOLVE) {
        if is_depth {
            (
                vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
                vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )
        } else {
            (vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT, vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
        }
    } else if access.contains(AccessMask::ATTACHMENT_READ) {
        if is_depth {
            (
                vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
                vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
            )
        } else {
            (vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT, vk::AccessFlags::COLOR_ATTACHMENT_READ)
        }
    } else if access.contains(AccessMask::ATTACHMENT_INPUT) {
        (vk::PipelineStageFlags::FRAGMENT_SHADER, vk::AccessFlags::INPUT_ATTACHMENT_READ)
    } else if access.contains(AccessMask::WRITE) {
        (vk::PipelineStageFlags::ALL_COMMANDS, vk::AccessFlags::SHADER_WRITE)
    } else if access.contains(AccessMask::READ) {
        (vk::PipelineStageFlags::ALL_COMMANDS, vk::AccessFlags::SHADER_READ)
    } else {
        (vk::PipelineStageFlags::TOP_OF_PIPE, vk::AccessFlags::empty())
    }
}

fn access_mask_to_vk(access: AccessMask) -> vk::AccessFlags {
    stage_and_access_for(access, vk::Format::UNDEFINED).1
}

fn is_depth_format(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::D16_UNORM
            | vk::Format::D32_SFLOAT
            | vk::Format::D16_UNORM_S8_UINT
            | vk::Format::D24_UNORM_S8_UINT
            | vk::Format::D32_SFLOAT_S8_UINT
    )
}

fn build_chain(dag: &mut PassDag, attachments: &AttachmentRegistry, master: PassId) -> GraphResult<()> {
    let is_warmed = dag.get(master).and_then(|p| p.render()).map(|r| r.build.is_some()).unwrap_or(false);
    if !is_warmed {
        return Ok(());
    }

    let members = chain_members(dag, master);
    let mut dims: Option<(u32, u32, u32)> = None;
    let mut mismatched = false;
    let mut window: Option<&dyn WindowBacking> = None;

    for member in &members {
        let Some(render) = dag.get(*member).and_then(|p| p.render()) else { continue };
        for c in &render.consumptions {
            if !is_view_slot(c.access) {
                continue;
            }
            let extent = match attachments.get(c.attachment) {
                Some(Attachment::Image(img)) => img.resolved.map(|r| (r.width, r.height, r.depth)),
                Some(Attachment::Window(win)) => {
                    let (w, h) = win.window.frame_extent();
                    window = Some(win.window.as_ref());
                    Some((w, h, 1))
                }
                _ => None,
            };
            if let Some(extent) = extent {
                match dims {
                    None => dims = Some(extent),
                    Some(d) if d != extent => mismatched = true,
                    _ => {}
                }
            }
        }
    }

    let Some((w, h, d)) = dims else { return Ok(()) };
    if w == 0 || h == 0 || d == 0 {
        // Minimized window or zero-sized attachment: quiet skip (stays Validated).
        return Ok(());
    }
    if mismatched {
        log::warn!("chain master {master:?}: mismatched framebuffer dimensions across slots, skipping build");
        return Ok(());
    }

    let framebuffer_count = window.map(|w| w.image_count()).unwrap_or(1);
    for member in &members {
        if let Some(render) = dag.get_mut(*member).and_then(|p| p.render_mut()) {
            render.framebuffer_extent = Some((w, h, d));
            if let Some(build) = &mut render.build {
                build.framebuffer_count = framebuffer_count;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::attachment::{AttachmentDesc, AttachmentRegistry};
    use super::super::pass::{AccessMask, Consumption, PassKind, ViewParams};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct NullCache {
        generation: AtomicU32,
    }

    impl NullCache {
        fn new() -> Self {
            Self { generation: AtomicU32::new(0) }
        }
    }

    impl PipelineCache for NullCache {
        fn get(&self, _: RenderPassKey, _: &RenderPassDesc) -> Option<vk::RenderPass> {
            Some(vk::RenderPass::null())
        }
        fn warmup(&self, _: RenderPassKey, _: &RenderPassDesc) -> bool {
            true
        }
        fn bump_generation(&self, _: RenderPassKey) -> u32 {
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        }
        fn generation(&self, _: RenderPassKey) -> u32 {
            self.generation.load(Ordering::SeqCst)
        }
    }

    fn solo_pass_with_consumption(
        dag: &mut PassDag,
        attachments: &mut AttachmentRegistry,
        attachment: AttachmentIndex,
        width: u32,
        height: u32,
    ) -> PassId {
        attachments.describe(attachment, AttachmentDesc::absolute(width, height, 1)).unwrap();
        let pass = dag.add_pass(PassKind::RenderPass, 0, &[]).unwrap();
        let render = dag.get_mut(pass).and_then(|p| p.render_mut()).unwrap();
        render
            .consumptions
            .push(Consumption::new(attachment, AccessMask::ATTACHMENT_WRITE, ViewParams::default()));
        pass
    }

    #[test]
    fn warmup_then_build_resolves_framebuffer_extent() {
        let mut dag = PassDag::new();
        let mut attachments = AttachmentRegistry::new();
        let master = solo_pass_with_consumption(&mut dag, &mut attachments, AttachmentIndex::new(0), 640, 480);
        attachments.resolve_sizes().unwrap();
        let cache = NullCache::new();

        warmup(&mut dag, &attachments, &cache).unwrap();
        assert_eq!(build_state(&dag, master), Some(BuildState::Warmed));

        build(&mut dag, &attachments).unwrap();
        assert_eq!(build_state(&dag, master), Some(BuildState::Built));
        let extent = dag.get(master).unwrap().render().unwrap().framebuffer_extent;
        assert_eq!(extent, Some((640, 480, 1)));
    }

    #[test]
    fn build_quietly_skips_zero_sized_attachment() {
        let mut dag = PassDag::new();
        let mut attachments = AttachmentRegistry::new();
        let master = solo_pass_with_consumption(&mut dag, &mut attachments, AttachmentIndex::new(0), 0, 0);
        attachments.resolve_sizes().unwrap();
        let cache = NullCache::new();

        warmup(&mut dag, &attachments, &cache).unwrap();
        build(&mut dag, &attachments).unwrap();

        assert_eq!(build_state(&dag, master), Some(BuildState::Warmed));
    }

    #[test]
    fn build_skips_on_mismatched_dimensions_across_slots() {
        let mut dag = PassDag::new();
        let mut attachments = AttachmentRegistry::new();
        attachments.describe(AttachmentIndex::new(0), AttachmentDesc::absolute(100, 100, 1)).unwrap();
        attachments.describe(AttachmentIndex::new(1), AttachmentDesc::absolute(50, 50, 1)).unwrap();
        attachments.resolve_sizes().unwrap();

        let master = dag.add_pass(PassKind::RenderPass, 0, &[]).unwrap();
        let render = dag.get_mut(master).and_then(|p| p.render_mut()).unwrap();
        render.consumptions.push(Consumption::new(AttachmentIndex::new(0), AccessMask::ATTACHMENT_WRITE, ViewParams::default()));
        render.consumptions.push(Consumption::new(AttachmentIndex::new(1), AccessMask::ATTACHMENT_WRITE, ViewParams::default()));

        let cache = NullCache::new();
        warmup(&mut dag, &attachments, &cache).unwrap();
        build(&mut dag, &attachments).unwrap();

        assert_eq!(build_state(&dag, master), Some(BuildState::Warmed));
    }

    #[test]
    fn rebuild_with_reformat_bumps_generation_and_cache() {
        let mut dag = PassDag::new();
        let mut attachments = AttachmentRegistry::new();
        let master = solo_pass_with_consumption(&mut dag, &mut attachments, AttachmentIndex::new(0), 320, 240);
        attachments.resolve_sizes().unwrap();
        let cache = NullCache::new();

        warmup(&mut dag, &attachments, &cache).unwrap();
        build(&mut dag, &attachments).unwrap();
        assert_eq!(build_state(&dag, master), Some(BuildState::Built));

        let generation_before = dag.get(master).unwrap().render().unwrap().generation;
        rebuild(&mut dag, &attachments, &cache, master, RebuildFlags::REFORMAT).unwrap();

        let generation_after = dag.get(master).unwrap().render().unwrap().generation;
        assert_eq!(generation_after, generation_before.wrapping_add(1));
        assert_eq!(cache.generation(RenderPassKey(0)), 1);
        // Rebuild re-warms and re-builds to the level previously reached.
        assert_eq!(build_state(&dag, master), Some(BuildState::Built));
    }

    #[test]
    fn destruct_drops_framebuffer_and_does_not_rebuild_it() {
        let mut dag = PassDag::new();
        let mut attachments = AttachmentRegistry::new();
        let master = solo_pass_with_consumption(&mut dag, &mut attachments, AttachmentIndex::new(0), 320, 240);
        attachments.resolve_sizes().unwrap();
        let cache = NullCache::new();

        warmup(&mut dag, &attachments, &cache).unwrap();
        build(&mut dag, &attachments).unwrap();
        assert_eq!(build_state(&dag, master), Some(BuildState::Built));

        destruct(&mut dag, &attachments, &cache, master).unwrap();
        // destruct clears build/framebuffer state first, then re-runs warmup
        // (which re-warms the cached render pass) without rebuilding, since
        // `had_build` is read after the clear and comes back false.
        assert_eq!(build_state(&dag, master), Some(BuildState::Warmed));
        assert!(dag.get(master).unwrap().render().unwrap().framebuffer_extent.is_none());
    }

    #[test]
    fn rebuild_recreate_only_keeps_cached_render_pass() {
        let mut dag = PassDag::new();
        let mut attachments = AttachmentRegistry::new();
        let master = solo_pass_with_consumption(&mut dag, &mut attachments, AttachmentIndex::new(0), 320, 240);
        attachments.resolve_sizes().unwrap();
        let cache = NullCache::new();

        warmup(&mut dag, &attachments, &cache).unwrap();
        build(&mut dag, &attachments).unwrap();

        rebuild(&mut dag, &attachments, &cache, master, RebuildFlags::RECREATE).unwrap();

        // RECREATE drops the framebuffer but re-warmup/build immediately
        // restores it since the chain was previously built.
        assert_eq!(build_state(&dag, master), Some(BuildState::Built));
        assert_eq!(cache.generation(RenderPassKey(0)), 0);
    }
}
