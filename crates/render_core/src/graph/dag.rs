//! Pass DAG (spec §4.B): pass storage, parent/child bookkeeping, and
//! submission-order maintenance.

use std::collections::HashMap;

use crate::foundation::collections::FreeList;

use super::error::{GraphError, GraphResult};
use super::pass::{Pass, PassId, PassKind};

/// The pass table plus the render-region/async-region ordered index lists.
pub struct PassDag {
    passes: FreeList<Pass>,
    /// Render region (render + inline-compute), sorted non-decreasing by
    /// level, insertion order preserved within a level.
    render_region: Vec<PassId>,
    /// Async-compute region, same ordering rules, always after render_region
    /// in submission order.
    async_region: Vec<PassId>,
    /// Remembers the culled state of each group, so a group's first pass
    /// seeds group state and later passes in the same group inherit it.
    group_culled: HashMap<u32, bool>,
    graph_invalid: bool,
}

impl Default for PassDag {
    fn default() -> Self {
        Self::new()
    }
}

impl PassDag {
    /// Create an empty pass DAG.
    pub fn new() -> Self {
        Self {
            passes: FreeList::new(),
            render_region: Vec::new(),
            async_region: Vec::new(),
            group_culled: HashMap::new(),
            graph_invalid: true,
        }
    }

    /// Whether the graph has been mutated since the last successful
    /// analyze/resolve pass.
    pub fn is_invalid(&self) -> bool {
        self.graph_invalid
    }

    /// Mark the graph invalid, forcing the analyzer/resolver to re-run.
    pub fn invalidate(&mut self) {
        self.graph_invalid = true;
    }

    /// Clear the invalid flag once the analyzer/resolver have run successfully.
    pub(crate) fn mark_validated(&mut self) {
        self.graph_invalid = false;
    }

    fn level_for_parents(&self, kind: PassKind, parents: &[PassId]) -> GraphResult<u32> {
        let mut level = 0u32;
        for &p in parents {
            let parent = self
                .passes
                .get(p.index() as usize)
                .ok_or_else(|| GraphError::InvalidParent(format!("unknown parent {p:?}")))?;
            if parent.is_async() != kind.is_async() {
                return Err(GraphError::InvalidParent(
                    "async-compute passes and non-async passes cannot parent one another".to_string(),
                ));
            }
            level = level.max(parent.level + 1);
        }
        Ok(level)
    }

    /// Add a pass of `kind`, in `group`, parented to `parents`.
    ///
    /// Level = `1 + max(parent.level)`, or 0 with no parents. A new pass
    /// whose group has been seen before inherits that group's current
    /// culled state.
    pub fn add_pass(&mut self, kind: PassKind, group: u32, parents: &[PassId]) -> GraphResult<PassId> {
        let level = self.level_for_parents(kind, parents)?;

        let culled = self.group_culled.get(&group).copied().unwrap_or(false);
        let mut pass = Pass::new(kind, level, parents.to_vec(), group);
        pass.culled = culled;
        self.group_culled.entry(group).or_insert(culled);

        let id = PassId::new(self.passes.insert(pass) as u32);

        if !culled {
            for &p in parents {
                if let Some(parent) = self.passes.get_mut(p.index() as usize) {
                    parent.child_count += 1;
                }
            }
        }

        self.insert_in_region(id, kind.is_async());
        self.graph_invalid = true;
        Ok(id)
    }

    /// Erase a pass. Rejected if it still has children (spec §3 lifecycle).
    /// Because dependent subpass chains may extend through the target, the
    /// whole graph is conceptually destructed first — callers are expected
    /// to run the builder's `destruct` before calling this when chains
    /// exist; here the ordering invariant itself is enforced.
    pub fn erase_pass(&mut self, id: PassId) -> GraphResult<()> {
        let (was_culled, parents, is_async) = {
            let pass = self
                .passes
                .get(id.index() as usize)
                .ok_or_else(|| GraphError::InvalidParent(format!("unknown pass {id:?}")))?;
            if pass.child_count > 0 {
                return Err(GraphError::InvalidParent(
                    "cannot erase a pass that still has children".to_string(),
                ));
            }
            (pass.culled, pass.parents.clone(), pass.is_async())
        };

        if !was_culled {
            for &p in &parents {
                if let Some(parent) = self.passes.get_mut(p.index() as usize) {
                    parent.child_count = parent.child_count.saturating_sub(1);
                }
            }
        }

        self.remove_from_region(id, is_async);
        self.passes.remove(id.index() as usize);
        self.graph_invalid = true;
        Ok(())
    }

    /// Replace a pass's parent list, recomputing its level.
    pub fn set_parents(&mut self, id: PassId, parents: &[PassId]) -> GraphResult<()> {
        let kind = self
            .passes
            .get(id.index() as usize)
            .ok_or_else(|| GraphError::InvalidParent(format!("unknown pass {id:?}")))?
            .kind;

        let level = self.level_for_parents(kind, parents)?;

        let (old_parents, culled) = {
            let pass = self.passes.get(id.index() as usize).unwrap();
            (pass.parents.clone(), pass.culled)
        };

        if !culled {
            for &p in &old_parents {
                if let Some(parent) = self.passes.get_mut(p.index() as usize) {
                    parent.child_count = parent.child_count.saturating_sub(1);
                }
            }
            for &p in parents {
                if let Some(parent) = self.passes.get_mut(p.index() as usize) {
                    parent.child_count += 1;
                }
            }
        }

        {
            let pass = self.passes.get_mut(id.index() as usize).unwrap();
            pass.parents = parents.to_vec();
            pass.level = level;
        }

        let is_async = kind.is_async();
        self.remove_from_region(id, is_async);
        self.insert_in_region(id, is_async);
        self.graph_invalid = true;
        Ok(())
    }

    /// Set the culled flag on every pass in `group`, adjusting per-parent
    /// child counts. Invalidates the graph only if a flag actually changed.
    pub fn cull(&mut self, group: u32) {
        self.set_group_culled(group, true);
    }

    /// Clear the culled flag on every pass in `group`.
    pub fn uncull(&mut self, group: u32) {
        self.set_group_culled(group, false);
    }

    fn set_group_culled(&mut self, group: u32, culled: bool) {
        let mut changed = false;
        let ids: Vec<PassId> = self
            .render_region
            .iter()
            .chain(self.async_region.iter())
            .copied()
            .filter(|id| self.passes.get(id.index() as usize).map(|p| p.group) == Some(group))
            .collect();

        for id in ids {
            let (parents, was_culled) = {
                let pass = self.passes.get(id.index() as usize).unwrap();
                (pass.parents.clone(), pass.culled)
            };
            if was_culled == culled {
                continue;
            }
            changed = true;
            for &p in &parents {
                if let Some(parent) = self.passes.get_mut(p.index() as usize) {
                    if culled {
                        parent.child_count = parent.child_count.saturating_sub(1);
                    } else {
                        parent.child_count += 1;
                    }
                }
            }
            self.passes.get_mut(id.index() as usize).unwrap().culled = culled;
        }

        self.group_culled.insert(group, culled);
        if changed {
            self.graph_invalid = true;
        }
    }

    /// Shared access to a pass.
    pub fn get(&self, id: PassId) -> Option<&Pass> {
        self.passes.get(id.index() as usize)
    }

    /// Mutable access to a pass.
    pub fn get_mut(&mut self, id: PassId) -> Option<&mut Pass> {
        self.passes.get_mut(id.index() as usize)
    }

    /// Passes in submission order: the render region, then the async region.
    pub fn submission_order(&self) -> impl Iterator<Item = PassId> + '_ {
        self.render_region.iter().chain(self.async_region.iter()).copied()
    }

    /// Just the render region, in submission order.
    pub fn render_region(&self) -> &[PassId] {
        &self.render_region
    }

    /// Just the async region, in submission order.
    pub fn async_region(&self) -> &[PassId] {
        &self.async_region
    }

    /// Insert `id` into its region, sorted non-decreasing by level, with
    /// insertion order preserved within a level, via backward linear scan.
    fn insert_in_region(&mut self, id: PassId, is_async: bool) {
        let level = self.passes.get(id.index() as usize).unwrap().level;
        let passes = &self.passes;
        let region = if is_async { &mut self.async_region } else { &mut self.render_region };

        let mut pos = region.len();
        while pos > 0 {
            let other_level = passes.get(region[pos - 1].index() as usize).unwrap().level;
            if other_level <= level {
                break;
            }
            pos -= 1;
        }
        region.insert(pos, id);
    }

    fn remove_from_region(&mut self, id: PassId, is_async: bool) {
        let region = if is_async { &mut self.async_region } else { &mut self.render_region };
        region.retain(|&x| x != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_with_no_parents_has_level_zero_and_appends() {
        let mut dag = PassDag::new();
        let a = dag.add_pass(PassKind::RenderPass, 0, &[]).unwrap();
        assert_eq!(dag.get(a).unwrap().level, 0);
        assert_eq!(dag.render_region(), &[a]);
    }

    #[test]
    fn level_is_one_plus_max_parent_level() {
        let mut dag = PassDag::new();
        let a = dag.add_pass(PassKind::RenderPass, 0, &[]).unwrap();
        let b = dag.add_pass(PassKind::RenderPass, 0, &[]).unwrap();
        let c = dag.add_pass(PassKind::RenderPass, 0, &[a, b]).unwrap();
        assert_eq!(dag.get(c).unwrap().level, 1);
    }

    #[test]
    fn async_and_non_async_cannot_parent_each_other() {
        let mut dag = PassDag::new();
        let a = dag.add_pass(PassKind::RenderPass, 0, &[]).unwrap();
        let err = dag.add_pass(PassKind::AsyncComputePass, 0, &[a]).unwrap_err();
        assert!(matches!(err, GraphError::InvalidParent(_)));
    }

    #[test]
    fn render_region_sorted_by_level_preserving_insertion_order() {
        let mut dag = PassDag::new();
        let a = dag.add_pass(PassKind::RenderPass, 0, &[]).unwrap();
        let b = dag.add_pass(PassKind::RenderPass, 0, &[]).unwrap();
        let c = dag.add_pass(PassKind::RenderPass, 0, &[a]).unwrap();
        let d = dag.add_pass(PassKind::RenderPass, 0, &[b]).unwrap();
        // a, b at level 0 (insertion order), c, d at level 1 (insertion order)
        assert_eq!(dag.render_region(), &[a, b, c, d]);
    }

    #[test]
    fn async_region_is_separate_and_always_after_render_region() {
        let mut dag = PassDag::new();
        let a = dag.add_pass(PassKind::RenderPass, 0, &[]).unwrap();
        let x = dag.add_pass(PassKind::AsyncComputePass, 0, &[]).unwrap();
        let order: Vec<_> = dag.submission_order().collect();
        assert_eq!(order, vec![a, x]);
    }

    #[test]
    fn cull_then_uncull_restores_child_counts_and_flags() {
        let mut dag = PassDag::new();
        let a = dag.add_pass(PassKind::RenderPass, 1, &[]).unwrap();
        let b = dag.add_pass(PassKind::RenderPass, 0, &[a]).unwrap();
        assert_eq!(dag.get(a).unwrap().child_count, 1);

        dag.cull(1);
        assert!(dag.get(a).unwrap().culled);
        assert_eq!(dag.get(b).unwrap().child_count, 0); // b unaffected, it's not in group 1
        // a's own parents (none) unaffected; what changes is a's children's
        // view of a. Here a has no parents so nothing to check there.

        dag.uncull(1);
        assert!(!dag.get(a).unwrap().culled);
    }

    #[test]
    fn erase_rejected_while_children_remain() {
        let mut dag = PassDag::new();
        let a = dag.add_pass(PassKind::RenderPass, 0, &[]).unwrap();
        let _b = dag.add_pass(PassKind::RenderPass, 0, &[a]).unwrap();
        assert!(dag.erase_pass(a).is_err());
    }

    #[test]
    fn erase_decrements_parent_child_count() {
        let mut dag = PassDag::new();
        let a = dag.add_pass(PassKind::RenderPass, 0, &[]).unwrap();
        let b = dag.add_pass(PassKind::RenderPass, 0, &[a]).unwrap();
        dag.erase_pass(b).unwrap();
        assert_eq!(dag.get(a).unwrap().child_count, 0);
    }
}
