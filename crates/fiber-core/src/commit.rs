//! Commit phase: flushes a completed pass to the render target.

use crate::error::TargetError;
use crate::fiber::{EffectTag, FiberArena, FiberId};
use crate::hooks::{CleanupSlot, Hook};
use crate::scheduler::CommitSummary;
use crate::target::{PropPatch, RenderTarget};

pub(crate) struct Commit<'a, T: RenderTarget + ?Sized> {
    arena: &'a mut FiberArena,
    target: &'a mut T,
    summary: CommitSummary,
}

impl<'a, T: RenderTarget + ?Sized> Commit<'a, T> {
    pub(crate) fn new(arena: &'a mut FiberArena, target: &'a mut T) -> Self {
        Self {
            arena,
            target,
            summary: CommitSummary::default(),
        }
    }

    /// Applies `deletions`, then every tagged fiber below `root` in pre-order.
    ///
    /// A target error stops the commit where it happened; mutations already
    /// applied stay applied.
    pub(crate) fn run(
        mut self,
        root: FiberId,
        deletions: &[FiberId],
    ) -> Result<CommitSummary, TargetError> {
        for &deleted in deletions {
            self.delete(deleted)?;
        }

        let mut next = self.arena.get(root).and_then(|fiber| fiber.child);
        while let Some(id) = next {
            let descend = self.commit_fiber(id)?;
            next = self.arena.next_in_preorder(id, root, descend);
        }
        Ok(self.summary)
    }

    fn commit_fiber(&mut self, id: FiberId) -> Result<bool, TargetError> {
        let Some((host, tag, alternate)) = self
            .arena
            .get(id)
            .map(|fiber| (fiber.host, fiber.effect_tag, fiber.alternate))
        else {
            return Ok(false);
        };
        match tag {
            Some(EffectTag::Add) => {
                if let Some(node) = host {
                    match self.arena.nearest_host_ancestor(id) {
                        Some(parent) => self.target.append_child(parent, node)?,
                        None => debug_assert!(false, "added fiber without a host ancestor"),
                    }
                }
                self.summary.added += 1;
            }
            Some(EffectTag::Update) => {
                if let Some(node) = host {
                    let old_props = alternate
                        .and_then(|alternate| self.arena.get(alternate))
                        .map(|alternate| alternate.props.clone());
                    if let Some(old_props) = old_props {
                        let patch = PropPatch::diff(&self.arena[id].props, &old_props);
                        if !patch.is_empty() {
                            self.target.apply_props(node, &patch)?;
                        }
                    }
                }
                self.summary.updated += 1;
            }
            Some(EffectTag::Delete) => {
                self.delete(id)?;
                return Ok(false);
            }
            None => {}
        }
        self.run_effects(id);
        Ok(true)
    }

    fn delete(&mut self, id: FiberId) -> Result<(), TargetError> {
        if let Some(node) = self.arena.first_host_in_subtree(id) {
            match self.arena.nearest_host_ancestor(id) {
                Some(parent) => self.target.remove_child(parent, node)?,
                None => debug_assert!(false, "deleted fiber without a host ancestor"),
            }
        }
        for fiber in self.arena.subtree(id) {
            self.run_cleanups(fiber);
        }
        self.summary.deleted += 1;
        Ok(())
    }

    fn run_cleanups(&mut self, id: FiberId) {
        let Some(fiber) = self.arena.get_mut(id) else {
            return;
        };
        let mut cleanups = take_displaced(&mut fiber.displaced_cleanups);
        cleanups.extend(fiber.hooks.iter().filter_map(|hook| match hook {
            Hook::Effect(effect) => effect.take_cleanup(),
            Hook::State(_) => None,
        }));
        for cleanup in cleanups {
            cleanup();
        }
    }

    fn run_effects(&mut self, id: FiberId) {
        for cleanup in take_displaced(&mut self.arena[id].displaced_cleanups) {
            cleanup();
        }
        let due: Vec<_> = self.arena[id]
            .hooks
            .iter_mut()
            .filter_map(|hook| match hook {
                Hook::Effect(effect) => effect.take_due(),
                Hook::State(_) => None,
            })
            .collect();
        for (effect, slot) in due {
            let previous = slot.borrow_mut().take();
            if let Some(cleanup) = previous {
                cleanup();
            }
            let cleanup = effect().into_cleanup();
            *slot.borrow_mut() = cleanup;
            self.summary.effects_run += 1;
        }
    }
}

fn take_displaced(slots: &mut Vec<CleanupSlot>) -> Vec<Box<dyn FnOnce()>> {
    slots
        .drain(..)
        .filter_map(|slot| slot.take())
        .collect()
}
