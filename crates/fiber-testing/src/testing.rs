use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fiber_core::{
    CommitSummary, Element, IdleDeadline, IdleScheduler, MemoryTarget, NodeId, RenderError,
    RenderTarget, Renderer, RendererOptions, RuntimeHandle, SliceOutcome, TargetError,
};

/// Upper bound on slices a helper drives before giving up on a render that never settles.
pub const MAX_SLICES: usize = 10_000;

/// Deadline that never runs out.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnboundedDeadline;

impl IdleDeadline for UnboundedDeadline {
    fn time_remaining(&self) -> Duration {
        Duration::MAX
    }
}

/// Deadline that loses one `step` of time per query.
///
/// With the default one millisecond yield threshold, `CountdownDeadline::units(n)`
/// lets exactly `n` units of work run before the loop yields.
#[derive(Debug)]
pub struct CountdownDeadline {
    remaining: Cell<u32>,
    step: Duration,
}

impl CountdownDeadline {
    pub fn units(units: u32) -> Self {
        Self::with_step(units, Duration::from_millis(1))
    }

    pub fn with_step(units: u32, step: Duration) -> Self {
        Self {
            remaining: Cell::new(units),
            step,
        }
    }

    /// Queries made so far are subtracted from the initial budget.
    pub fn remaining_units(&self) -> u32 {
        self.remaining.get()
    }
}

impl IdleDeadline for CountdownDeadline {
    fn time_remaining(&self) -> Duration {
        let remaining = self.remaining.get().saturating_sub(1);
        self.remaining.set(remaining);
        self.step * remaining
    }
}

/// Scheduler that only counts idle-callback requests.
#[derive(Debug, Default)]
pub struct CountingScheduler {
    requests: AtomicUsize,
}

impl CountingScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl IdleScheduler for CountingScheduler {
    fn request_idle_callback(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// Drives `renderer` with unbounded slices until no work is pending.
pub fn run_until_idle<T: RenderTarget>(
    renderer: &mut Renderer<T>,
) -> Result<Vec<SliceOutcome>, RenderError> {
    drive(renderer, || UnboundedDeadline)
}

/// Drives `renderer` until idle, giving every slice room for `units` units of work.
pub fn run_in_slices<T: RenderTarget>(
    renderer: &mut Renderer<T>,
    units: u32,
) -> Result<Vec<SliceOutcome>, RenderError> {
    drive(renderer, || CountdownDeadline::units(units))
}

/// Runs slices until idle, each against a fresh deadline from `deadline`.
fn drive<T: RenderTarget, D: IdleDeadline>(
    renderer: &mut Renderer<T>,
    deadline: impl Fn() -> D,
) -> Result<Vec<SliceOutcome>, RenderError> {
    let mut outcomes = Vec::new();
    while renderer.has_pending_work() {
        assert!(outcomes.len() < MAX_SLICES, "render never settled");
        outcomes.push(renderer.work_loop(&deadline())?);
    }
    Ok(outcomes)
}

/// Commit summaries contained in `outcomes`, in order.
pub fn commits(outcomes: &[SliceOutcome]) -> Vec<CommitSummary> {
    outcomes.iter().filter_map(SliceOutcome::committed).collect()
}

/// Headless harness rendering into a [`MemoryTarget`].
///
/// Owns a renderer and a container node and exposes helpers to mount
/// content, pump the work loop and poke at the produced tree.
pub struct RenderTestRule {
    renderer: Renderer<MemoryTarget>,
    container: NodeId,
    scheduler: Arc<CountingScheduler>,
}

impl RenderTestRule {
    pub fn new() -> Self {
        Self::with_options(RendererOptions::default())
    }

    pub fn with_options(options: RendererOptions) -> Self {
        let mut target = MemoryTarget::new();
        let container = target.create_container("root");
        let scheduler = CountingScheduler::new();
        let renderer = Renderer::with_scheduler(target, scheduler.clone()).with_options(options);
        Self {
            renderer,
            container,
            scheduler,
        }
    }

    /// Starts rendering `element` into the container without running any work.
    pub fn set_content(&mut self, element: Element) {
        self.renderer.render(element, self.container);
    }

    /// Renders `element` and pumps until the tree is committed.
    pub fn mount(&mut self, element: Element) -> Result<Vec<SliceOutcome>, RenderError> {
        self.set_content(element);
        self.pump_until_idle()
    }

    pub fn pump_until_idle(&mut self) -> Result<Vec<SliceOutcome>, RenderError> {
        run_until_idle(&mut self.renderer)
    }

    pub fn pump_in_slices(&mut self, units: u32) -> Result<Vec<SliceOutcome>, RenderError> {
        run_in_slices(&mut self.renderer, units)
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn text(&self) -> String {
        self.target().text_content(self.container)
    }

    pub fn nodes_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.target().find_by_tag(self.container, tag)
    }

    /// Dispatches `event` on the `index`th node tagged `tag` (tree order).
    pub fn fire(&self, tag: &str, index: usize, event: &str) -> Result<usize, TargetError> {
        let node = self
            .nodes_by_tag(tag)
            .get(index)
            .copied()
            .ok_or_else(|| TargetError::Rejected(format!("no <{tag}> at index {index}")))?;
        self.target().dispatch(node, event)
    }

    /// Clicks a node and pumps the resulting render to completion.
    pub fn click(&mut self, tag: &str, index: usize) -> Result<Vec<SliceOutcome>, RenderError> {
        self.fire(tag, index, "click")?;
        self.pump_until_idle()
    }

    pub fn dump_tree(&self) -> String {
        self.target().dump_tree(self.container)
    }

    pub fn target(&self) -> &MemoryTarget {
        self.renderer.target()
    }

    pub fn target_mut(&mut self) -> &mut MemoryTarget {
        self.renderer.target_mut()
    }

    pub fn renderer(&mut self) -> &mut Renderer<MemoryTarget> {
        &mut self.renderer
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.renderer.runtime_handle()
    }

    pub fn idle_requests(&self) -> usize {
        self.scheduler.requests()
    }
}

impl Default for RenderTestRule {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a rule.
pub fn run_test_render<R>(f: impl FnOnce(&mut RenderTestRule) -> R) -> R {
    let mut rule = RenderTestRule::new();
    f(&mut rule)
}
