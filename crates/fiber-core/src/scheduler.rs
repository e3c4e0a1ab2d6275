//! The interruptible render pass and the renderer that owns it.

use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use crate::commit::Commit;
use crate::element::{Component, Element, HostTag, Props};
use crate::error::RenderError;
use crate::fiber::{Fiber, FiberArena, FiberId, FiberKind};
use crate::hooks::RenderContext;
use crate::platform::{IdleDeadline, IdleScheduler};
use crate::reconcile::reconcile_children;
use crate::runtime::{DefaultScheduler, Runtime, RuntimeHandle};
use crate::target::{NodeId, PropPatch, RenderTarget};

/// Slice budget configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RendererOptions {
    /// The loop yields once the deadline reports less time than this.
    pub yield_threshold: Duration,
    /// Hard cap on units per slice, on top of the deadline.
    pub max_units_per_slice: Option<usize>,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            yield_threshold: Duration::from_millis(1),
            max_units_per_slice: None,
        }
    }
}

impl RendererOptions {
    pub fn with_yield_threshold(mut self, threshold: Duration) -> Self {
        self.yield_threshold = threshold;
        self
    }

    pub fn with_max_units_per_slice(mut self, units: usize) -> Self {
        self.max_units_per_slice = Some(units.max(1));
        self
    }
}

/// Fibers committed per effect tag, plus effects that ran.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub effects_run: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliceStatus {
    /// Nothing to render.
    Idle,
    /// Budget ran out with units left; the pass resumes on the next slice.
    Yielded,
    /// The pass finished and was committed during this slice.
    Committed(CommitSummary),
}

/// Result of one [`Renderer::work_loop`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SliceOutcome {
    pub units: usize,
    pub status: SliceStatus,
}

impl SliceOutcome {
    pub fn committed(&self) -> Option<CommitSummary> {
        match self.status {
            SliceStatus::Committed(summary) => Some(summary),
            _ => None,
        }
    }
}

/// Owns both fiber generations and drives render passes into a target.
///
/// A pass is started by [`render`](Self::render) or by a state setter and
/// advanced one fiber at a time by [`work_loop`](Self::work_loop). Nothing
/// reaches the target's tree structure until the pass completes and commits.
pub struct Renderer<T: RenderTarget> {
    arena: FiberArena,
    target: T,
    runtime: Runtime,
    options: RendererOptions,
    current_root: Option<FiberId>,
    wip_root: Option<FiberId>,
    next_unit: Option<FiberId>,
    deletions: Vec<FiberId>,
    last_commit: Option<CommitSummary>,
}

impl<T: RenderTarget> Renderer<T> {
    pub fn new(target: T) -> Self {
        Self::with_scheduler(target, Arc::new(DefaultScheduler))
    }

    pub fn with_scheduler(target: T, scheduler: Arc<dyn IdleScheduler>) -> Self {
        Self {
            arena: FiberArena::new(),
            target,
            runtime: Runtime::new(scheduler),
            options: RendererOptions::default(),
            current_root: None,
            wip_root: None,
            next_unit: None,
            deletions: Vec::new(),
            last_commit: None,
        }
    }

    pub fn with_options(mut self, options: RendererOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> RendererOptions {
        self.options
    }

    /// Starts a pass rendering `element` as the only child of `container`.
    ///
    /// An in-flight pass is abandoned. Pending state updates are picked up by
    /// the new pass.
    pub fn render(&mut self, element: Element, container: NodeId) {
        self.abandon_pass();
        self.runtime.take_rerender_request();
        self.start_pass(container, Rc::new(Props::with_children(vec![element])));
        self.runtime.request_slice();
    }

    /// Runs units of work until the deadline or the unit cap asks to yield.
    ///
    /// At least one unit is processed when work is pending. A failing pass is
    /// abandoned and the error returned; the committed tree stays current.
    /// Another slice is always requested from the scheduler before returning.
    pub fn work_loop(&mut self, deadline: &dyn IdleDeadline) -> Result<SliceOutcome, RenderError> {
        let result = self.run_slice(deadline);
        if let Err(err) = &result {
            log::debug!("render pass failed: {err}");
            self.abandon_pass();
        }
        self.runtime.request_slice();
        result
    }

    fn run_slice(&mut self, deadline: &dyn IdleDeadline) -> Result<SliceOutcome, RenderError> {
        let mut units = 0;
        loop {
            if self.runtime.take_rerender_request() {
                self.restart_from_current()?;
            }
            let Some(unit) = self.next_unit else {
                break;
            };
            self.next_unit = self.perform_unit_of_work(unit)?;
            units += 1;
            if self.should_yield(deadline, units) {
                break;
            }
        }

        let status = if self.next_unit.is_some() {
            SliceStatus::Yielded
        } else if self.wip_root.is_some() {
            SliceStatus::Committed(self.commit_root()?)
        } else {
            SliceStatus::Idle
        };
        Ok(SliceOutcome { units, status })
    }

    fn should_yield(&self, deadline: &dyn IdleDeadline, units: usize) -> bool {
        if self
            .options
            .max_units_per_slice
            .is_some_and(|max| units >= max)
        {
            return true;
        }
        deadline.time_remaining() < self.options.yield_threshold
    }

    fn start_pass(&mut self, container: NodeId, props: Rc<Props>) {
        let root = self
            .arena
            .insert(Fiber::root(container, props, self.current_root));
        self.deletions.clear();
        self.wip_root = Some(root);
        self.next_unit = Some(root);
        log::debug!("render pass started into node {container}");
    }

    fn restart_from_current(&mut self) -> Result<(), RenderError> {
        let current = self
            .current_root
            .and_then(|id| self.arena.get(id))
            .and_then(|root| root.host.map(|container| (container, Rc::clone(&root.props))));
        let Some((container, props)) = current else {
            return Err(RenderError::NoActiveRoot);
        };
        self.abandon_pass();
        self.start_pass(container, props);
        Ok(())
    }

    /// Drops the in-flight pass without committing anything.
    fn abandon_pass(&mut self) {
        self.next_unit = None;
        self.deletions.clear();
        if let Some(wip) = self.wip_root.take() {
            let released = self.arena.release_subtree(wip);
            log::debug!("render pass abandoned, released {released} fibers");
        }
    }

    fn perform_unit_of_work(&mut self, id: FiberId) -> Result<Option<FiberId>, RenderError> {
        let kind = self.arena[id].kind.clone();
        log::trace!("unit of work: {}", kind.name());
        match kind {
            FiberKind::Root => self.update_root(id),
            FiberKind::Host(tag) => self.update_host(id, &tag)?,
            FiberKind::Component(component) => self.update_component(id, &component),
        }
        let boundary = self.wip_root.unwrap_or(id);
        Ok(self.arena.next_in_preorder(id, boundary, true))
    }

    fn update_root(&mut self, id: FiberId) {
        let props = Rc::clone(&self.arena[id].props);
        let elements: Vec<Option<Element>> = props.children().iter().cloned().map(Some).collect();
        reconcile_children(&mut self.arena, &mut self.deletions, id, &elements);
    }

    fn update_host(&mut self, id: FiberId, tag: &HostTag) -> Result<(), RenderError> {
        if tag.as_str().is_empty() {
            return Err(RenderError::InvalidElement {
                reason: "host element with an empty tag",
            });
        }
        let props = Rc::clone(&self.arena[id].props);
        if self.arena[id].host.is_none() {
            let node = self.target.create_node(tag)?;
            let patch = PropPatch::diff(&props, &Props::default());
            if !patch.is_empty() {
                self.target.apply_props(node, &patch)?;
            }
            self.arena[id].host = Some(node);
        }
        let elements: Vec<Option<Element>> = props.children().iter().cloned().map(Some).collect();
        reconcile_children(&mut self.arena, &mut self.deletions, id, &elements);
        Ok(())
    }

    fn update_component(&mut self, id: FiberId, component: &Component) {
        let props = Rc::clone(&self.arena[id].props);
        let previous = self.arena[id]
            .alternate
            .and_then(|alternate| self.arena.get(alternate))
            .map(|alternate| alternate.hooks.as_slice())
            .unwrap_or(&[]);
        let mut cx = RenderContext::new(previous, self.runtime.handle(), component.name());
        let child = component.render(&mut cx, &props);
        let (hooks, displaced) = cx.into_parts();
        let fiber = &mut self.arena[id];
        fiber.hooks = hooks;
        fiber.displaced_cleanups = displaced;
        reconcile_children(&mut self.arena, &mut self.deletions, id, &[child]);
    }

    fn commit_root(&mut self) -> Result<CommitSummary, RenderError> {
        let Some(root) = self.wip_root else {
            return Ok(CommitSummary::default());
        };
        let deletions = std::mem::take(&mut self.deletions);
        let summary = Commit::new(&mut self.arena, &mut self.target).run(root, &deletions)?;

        self.wip_root = None;
        self.current_root = Some(root);
        let released = self.arena.retain_reachable(root);
        log::debug!(
            "committed: {} added, {} updated, {} deleted, {} effects; released {released} fibers",
            summary.added,
            summary.updated,
            summary.deleted,
            summary.effects_run
        );
        self.last_commit = Some(summary);
        Ok(summary)
    }

    /// Whether a pass is in flight or a state update is waiting for one.
    pub fn has_pending_work(&self) -> bool {
        self.wip_root.is_some() || self.runtime.has_rerender_request()
    }

    pub fn current_root(&self) -> Option<FiberId> {
        self.current_root
    }

    pub fn fiber(&self, id: FiberId) -> Option<&Fiber> {
        self.arena.get(id)
    }

    /// Committed fibers in pre-order, starting with the root.
    pub fn current_fibers(&self) -> Vec<FiberId> {
        self.current_root
            .map(|root| self.arena.subtree(root))
            .unwrap_or_default()
    }

    /// Fibers alive in the arena across both generations.
    pub fn fiber_count(&self) -> usize {
        self.arena.len()
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn into_target(self) -> T {
        self.target
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn last_commit(&self) -> Option<CommitSummary> {
        self.last_commit
    }
}

#[cfg(test)]
#[path = "tests/scheduler_tests.rs"]
mod tests;
