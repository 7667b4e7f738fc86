//! Graph Analyzer (spec §4.C): backing-window selection, subpass-merge
//! scoring, and subpass chain linking.

use std::collections::HashSet;

use super::attachment::{Attachment, AttachmentIndex, AttachmentRegistry};
use super::dag::PassDag;
use super::pass::{AccessMask, AspectMask, PassId, PassKind};

/// Walk the render region in submission order, (re)computing backing windows
/// and subpass chains from scratch. Idempotent: safe to call repeatedly as
/// the graph is edited between builds.
pub(crate) fn analyze(dag: &mut PassDag, attachments: &AttachmentRegistry) {
    reset_chains(dag);

    let render_ids: Vec<PassId> = dag.render_region().to_vec();
    let mut processed: HashSet<PassId> = HashSet::new();

    for &id in &render_ids {
        let Some(pass) = dag.get(id) else { continue };
        if pass.culled || pass.kind != PassKind::RenderPass {
            processed.insert(id);
            continue;
        }

        let own_backing = select_backing(dag, id, attachments);
        if let Some(render) = dag.get_mut(id).and_then(|p| p.render_mut()) {
            render.backing_window = own_backing;
        }

        let has_clear = dag
            .get(id)
            .and_then(|p| p.render())
            .map(|r| r.consumptions.iter().any(|c| c.clears()))
            .unwrap_or(false);

        if !has_clear {
            if let Some(best) = best_merge_candidate(dag, id, &processed) {
                link_chain(dag, best, id);
            }
        }

        processed.insert(id);
    }

    // Async-compute passes never merge, and aren't part of §4.D chain
    // resolution either, but still get their default single-subpass state.
    for &id in dag.async_region() {
        processed.insert(id);
    }

    dag.mark_validated();
}

fn reset_chains(dag: &mut PassDag) {
    let ids: Vec<PassId> = dag.submission_order().collect();
    for id in ids {
        if let Some(render) = dag.get_mut(id).and_then(|p| p.render_mut()) {
            render.master = None;
            render.next = None;
            render.subpass = 0;
            render.subpasses = 1;
            render.backing_window = None;
        }
    }
}

fn select_backing(dag: &PassDag, id: PassId, attachments: &AttachmentRegistry) -> Option<AttachmentIndex> {
    let pass = dag.get(id)?;
    let render = pass.render()?;
    render.consumptions.iter().find_map(|c| {
        if !c.view.aspect.contains(AspectMask::COLOR) || !c.access.is_attachment_access() {
            return None;
        }
        matches!(attachments.get(c.attachment), Some(Attachment::Window(_))).then_some(c.attachment)
    })
}

/// Combine two optional backing windows per the §4.C rule: equal-or-one-none
/// is accepted (the non-none value wins); two distinct non-none values reject.
fn merge_backing(existing: Option<AttachmentIndex>, candidate: Option<AttachmentIndex>) -> Option<Option<AttachmentIndex>> {
    match (existing, candidate) {
        (None, other) | (other, None) => Some(other),
        (Some(a), Some(b)) if a == b => Some(Some(a)),
        _ => None,
    }
}

fn chain_master(dag: &PassDag, id: PassId) -> PassId {
    dag.get(id).and_then(|p| p.render()).and_then(|r| r.master).unwrap_or(id)
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

/// True iff `candidate`'s only non-culled child, among all passes in the
/// graph, is `expected_child`.
fn only_non_culled_child_is(dag: &PassDag, candidate: PassId, expected_child: PassId) -> bool {
    let mut count = 0u32;
    let mut matches_expected = false;
    for id in dag.submission_order() {
        let Some(p) = dag.get(id) else { continue };
        if p.culled {
            continue;
        }
        if p.parents.contains(&candidate) {
            count += 1;
            if id == expected_child {
                matches_expected = true;
            }
        }
    }
    count == 1 && matches_expected
}

fn best_merge_candidate(dag: &PassDag, id: PassId, processed: &HashSet<PassId>) -> Option<PassId> {
    let pass = dag.get(id)?;
    let p_own_backing = pass.render().and_then(|r| r.backing_window);
    let parents = pass.parents.clone();

    let mut best: Option<(PassId, u32)> = None;

    for c in parents {
        if !processed.contains(&c) {
            continue; // out-of-order parent, skipped defensively
        }
        let Some(cp) = dag.get(c) else { continue };
        if cp.culled || cp.kind != PassKind::RenderPass {
            continue;
        }
        let Some(c_render) = cp.render() else { continue };
        if c_render.next.is_some() {
            continue; // C is not the current tail of its chain
        }
        if !only_non_culled_child_is(dag, c, id) {
            continue;
        }

        let master = chain_master(dag, c);
        let master_backing = dag.get(master).and_then(|p| p.render()).and_then(|r| r.backing_window);
        if merge_backing(master_backing, p_own_backing).is_none() {
            continue;
        }

        let score = merge_score(dag, id, master);
        if score == 0 {
            continue;
        }
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((c, score));
        }
    }

    best.map(|(c, _)| c)
}

fn merge_score(dag: &PassDag, p: PassId, chain_master_id: PassId) -> u32 {
    let Some(p_render) = dag.get(p).and_then(|pass| pass.render()) else { return 0 };
    let members = chain_members(dag, chain_master_id);

    let mut score = 0u32;
    for member in members {
        let Some(m_render) = dag.get(member).and_then(|pass| pass.render()) else { continue };
        for mc in &m_render.consumptions {
            for pc in &p_render.consumptions {
                if pc.attachment != mc.attachment {
                    continue;
                }
                if pc.access.is_attachment_access() != mc.access.is_attachment_access() {
                    continue;
                }
                if !pc.view.is_compatible_with(&mc.view) {
                    continue;
                }
                score += 1;
            }
        }
    }
    score
}

fn link_chain(dag: &mut PassDag, c: PassId, p: PassId) {
    let master = chain_master(dag, c);
    let c_subpass = dag.get(c).and_then(|pass| pass.render()).map(|r| r.subpass).unwrap_or(0);
    let p_own_backing = dag.get(p).and_then(|pass| pass.render()).and_then(|r| r.backing_window);

    if let Some(r) = dag.get_mut(c).and_then(|pass| pass.render_mut()) {
        r.next = Some(p);
    }
    if let Some(r) = dag.get_mut(p).and_then(|pass| pass.render_mut()) {
        r.master = Some(master);
        r.subpass = c_subpass + 1;
    }
    if let Some(r) = dag.get_mut(master).and_then(|pass| pass.render_mut()) {
        r.subpasses += 1;
        if r.backing_window.is_none() {
            r.backing_window = p_own_backing;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::attachment::AttachmentDesc;
    use crate::graph::pass::{AccessMask as AM, AspectMask as AspM, ClearValue, Consumption as Cons, PassKind, ViewParams as VP};

    fn idx(i: u32) -> AttachmentIndex {
        AttachmentIndex(i)
    }

    #[test]
    fn two_compatible_passes_merge_into_a_chain_of_two() {
        let mut attachments = AttachmentRegistry::new();
        attachments.describe(idx(0), AttachmentDesc::absolute(512, 512, 1)).unwrap();
        attachments.describe(idx(1), AttachmentDesc::absolute(512, 512, 1)).unwrap();
        attachments.resolve_sizes().unwrap();

        let mut dag = PassDag::new();
        let a = dag.add_pass(PassKind::RenderPass, 0, &[]).unwrap();
        {
            let view = VP { aspect: AspM::COLOR, ..VP::default() };
            let mut c = Cons::new(idx(0), AM::ATTACHMENT_WRITE, view);
            c.clear = None;
            dag.get_mut(a).unwrap().render_mut().unwrap().consumptions.push(c);
        }

        let b = dag.add_pass(PassKind::RenderPass, 0, &[a]).unwrap();
        {
            let view = VP { aspect: AspM::COLOR, ..VP::default() };
            dag.get_mut(b).unwrap().render_mut().unwrap().consumptions.push(Cons::new(idx(0), AM::ATTACHMENT_INPUT, view));
            dag.get_mut(b).unwrap().render_mut().unwrap().consumptions.push(Cons::new(idx(1), AM::ATTACHMENT_WRITE, view));
        }
        // also give A the input-compatible semantics by sharing attachment 0
        // as an attachment access on both sides (already true above).

        analyze(&mut dag, &attachments);

        let b_render = dag.get(b).unwrap().render().unwrap();
        assert_eq!(b_render.master, Some(a));
        assert_eq!(b_render.subpass, 1);
        let a_render = dag.get(a).unwrap().render().unwrap();
        assert_eq!(a_render.subpasses, 2);
        assert!(a_render.is_master());
    }

    #[test]
    fn clearing_pass_never_merges_as_non_master() {
        let mut attachments = AttachmentRegistry::new();
        attachments.describe(idx(0), AttachmentDesc::absolute(512, 512, 1)).unwrap();
        attachments.resolve_sizes().unwrap();

        let mut dag = PassDag::new();
        let a = dag.add_pass(PassKind::RenderPass, 0, &[]).unwrap();
        let view = VP { aspect: AspM::COLOR, ..VP::default() };
        dag.get_mut(a).unwrap().render_mut().unwrap().consumptions.push(Cons::new(idx(0), AM::ATTACHMENT_WRITE, view));

        let b = dag.add_pass(PassKind::RenderPass, 0, &[a]).unwrap();
        let mut clearing = Cons::new(idx(0), AM::ATTACHMENT_WRITE, view);
        clearing.clear = Some(ClearValue::Color([0.0; 4]));
        dag.get_mut(b).unwrap().render_mut().unwrap().consumptions.push(clearing);

        analyze(&mut dag, &attachments);

        assert!(dag.get(b).unwrap().render().unwrap().is_master());
        assert_eq!(dag.get(a).unwrap().render().unwrap().subpasses, 1);
    }
}
