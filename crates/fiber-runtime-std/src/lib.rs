//! Standard idle scheduling backed by Rust's `std` library.
//!
//! This crate provides concrete implementations of the idle-provider
//! contracts defined in `fiber-core`. Hosts construct a [`StdHost`] around a
//! render target and call [`StdHost::run_slice`] whenever they have spare
//! time, or [`StdHost::run_until_idle`] to settle all pending renders.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use fiber_core::{
    CommitSummary, Element, IdleDeadline, IdleScheduler, NodeId, RenderError, RenderTarget,
    Renderer, RendererOptions, RuntimeHandle, SliceOutcome,
};

type Waker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler recording idle-callback requests in an atomic flag.
pub struct StdIdleScheduler {
    idle_requested: AtomicBool,
    idle_waker: RwLock<Option<Waker>>,
}

impl StdIdleScheduler {
    pub fn new() -> Self {
        Self {
            idle_requested: AtomicBool::new(false),
            idle_waker: RwLock::new(None),
        }
    }

    /// Returns whether an idle callback has been requested since the last call.
    pub fn take_idle_request(&self) -> bool {
        self.idle_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker that will be invoked whenever an idle callback is requested.
    pub fn set_idle_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self
            .idle_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    /// Clears any registered idle waker.
    pub fn clear_idle_waker(&self) {
        *self
            .idle_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .idle_waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdIdleScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdIdleScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdIdleScheduler")
            .field("idle_requested", &self.idle_requested.load(Ordering::SeqCst))
            .finish()
    }
}

impl IdleScheduler for StdIdleScheduler {
    fn request_idle_callback(&self) {
        self.idle_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Deadline measured against [`Instant::now`].
#[derive(Clone, Copy, Debug)]
pub struct InstantDeadline {
    end: Instant,
}

impl InstantDeadline {
    /// A deadline `budget` from now.
    pub fn new(budget: Duration) -> Self {
        Self::at(Instant::now() + budget)
    }

    pub fn at(end: Instant) -> Self {
        Self { end }
    }
}

impl IdleDeadline for InstantDeadline {
    fn time_remaining(&self) -> Duration {
        self.end.saturating_duration_since(Instant::now())
    }
}

/// Default wall-clock budget of one slice.
pub const DEFAULT_SLICE_BUDGET: Duration = Duration::from_millis(16);

/// Slices [`StdHost::run_until_idle`] runs before it gives up on a render that never settles.
pub const MAX_IDLE_SLICES: usize = 100_000;

/// Convenience container bundling a renderer with the standard scheduler.
pub struct StdHost<T: RenderTarget> {
    scheduler: Arc<StdIdleScheduler>,
    renderer: Renderer<T>,
    slice_budget: Duration,
}

impl<T: RenderTarget> StdHost<T> {
    pub fn new(target: T) -> Self {
        let scheduler = Arc::new(StdIdleScheduler::default());
        let renderer = Renderer::with_scheduler(target, scheduler.clone());
        Self {
            scheduler,
            renderer,
            slice_budget: DEFAULT_SLICE_BUDGET,
        }
    }

    pub fn with_options(mut self, options: RendererOptions) -> Self {
        self.renderer = self.renderer.with_options(options);
        self
    }

    pub fn with_slice_budget(mut self, budget: Duration) -> Self {
        self.slice_budget = budget;
        self
    }

    pub fn slice_budget(&self) -> Duration {
        self.slice_budget
    }

    pub fn render(&mut self, element: Element, container: NodeId) {
        self.renderer.render(element, container);
    }

    /// Runs one slice with a fresh wall-clock deadline.
    pub fn run_slice(&mut self) -> Result<SliceOutcome, RenderError> {
        self.scheduler.take_idle_request();
        self.renderer
            .work_loop(&InstantDeadline::new(self.slice_budget))
    }

    /// Runs slices until nothing is pending. Returns the last commit made.
    ///
    /// A failed pass is logged and dropped; the committed tree stays as it was.
    pub fn run_until_idle(&mut self) -> Option<CommitSummary> {
        let mut last_commit = None;
        let mut slices = 0;
        while self.renderer.has_pending_work() {
            if slices == MAX_IDLE_SLICES {
                log::warn!("render still pending after {slices} slices; giving up");
                break;
            }
            slices += 1;
            match self.run_slice() {
                Ok(outcome) => {
                    if let Some(summary) = outcome.committed() {
                        last_commit = Some(summary);
                    }
                }
                Err(err) => log::error!("render pass failed: {err}"),
            }
        }
        last_commit
    }

    /// Returns whether an idle callback was requested since the last poll.
    pub fn take_idle_request(&self) -> bool {
        self.scheduler.take_idle_request()
    }

    pub fn set_idle_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_idle_waker(waker);
    }

    pub fn clear_idle_waker(&self) {
        self.scheduler.clear_idle_waker();
    }

    pub fn scheduler(&self) -> Arc<StdIdleScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn renderer(&self) -> &Renderer<T> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<T> {
        &mut self.renderer
    }

    pub fn target(&self) -> &T {
        self.renderer.target()
    }

    pub fn target_mut(&mut self) -> &mut T {
        self.renderer.target_mut()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.renderer.runtime_handle()
    }
}

impl<T: RenderTarget + fmt::Debug> fmt::Debug for StdHost<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdHost")
            .field("scheduler", &self.scheduler)
            .field("slice_budget", &self.slice_budget)
            .field("target", self.renderer.target())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::AtomicUsize;

    use fiber_core::{Component, Element, MemoryTarget, StateSetter};

    use super::*;

    #[test]
    fn instant_deadline_runs_out() {
        let expired = InstantDeadline::at(Instant::now());
        assert_eq!(expired.time_remaining(), Duration::ZERO);
        assert!(InstantDeadline::new(Duration::from_secs(60)).time_remaining() > Duration::ZERO);
    }

    #[test]
    fn scheduler_flags_requests_and_wakes() {
        let scheduler = StdIdleScheduler::new();
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = wakes.clone();
        scheduler.set_idle_waker(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        scheduler.request_idle_callback();
        assert!(scheduler.take_idle_request());
        assert!(!scheduler.take_idle_request());
        assert_eq!(wakes.load(Ordering::SeqCst), 1);

        scheduler.clear_idle_waker();
        scheduler.request_idle_callback();
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn host_requests_slice_and_rerenders_on_state_change() {
        let slot: Rc<RefCell<Option<StateSetter<i32>>>> = Rc::default();
        let counter = {
            let slot = slot.clone();
            Component::new("Counter", move |cx, _| {
                let (count, set_count) = cx.use_state(0);
                slot.borrow_mut().replace(set_count);
                Some(Element::host("span").child(count))
            })
        };

        let mut target = MemoryTarget::new();
        let container = target.create_container("root");
        let mut host = StdHost::new(target);
        host.render(counter.element(), container);
        assert!(host.take_idle_request(), "render should request an idle callback");

        let summary = host.run_until_idle().expect("initial commit");
        assert_eq!(summary.added, 3);
        assert_eq!(host.target().text_content(container), "0");

        let setter = slot.borrow().clone().expect("setter captured during render");
        host.take_idle_request();
        setter.update(|count| count + 1);
        assert!(host.take_idle_request(), "state update should request an idle callback");

        let summary = host.run_until_idle().expect("update commit");
        assert_eq!(summary.added, 0);
        assert_eq!(summary.deleted, 0);
        assert_eq!(host.target().text_content(container), "1");
    }

    #[test]
    fn host_waker_fires_on_render_requests() {
        let mut target = MemoryTarget::new();
        let container = target.create_container("root");
        let mut host = StdHost::new(target);
        let (wake_tx, wakes) = std::sync::mpsc::channel();
        host.set_idle_waker(move || {
            let _ = wake_tx.send(());
        });

        host.render(Element::host("p").child("hi"), container);
        assert_eq!(wakes.try_iter().count(), 1);
        host.run_until_idle().expect("commit");
        assert!(wakes.try_iter().count() > 0, "every slice asks for the next one");

        host.clear_idle_waker();
        host.render(Element::host("p").child("bye"), container);
        assert_eq!(wakes.try_iter().count(), 0);
        host.run_until_idle().expect("commit");
        assert_eq!(host.target().text_content(container), "bye");
    }

    #[test]
    fn failed_pass_is_logged_and_dropped() {
        let mut target = MemoryTarget::new();
        let container = target.create_container("root");
        let mut host = StdHost::new(target);
        host.render(Element::host(""), container);
        assert_eq!(host.run_until_idle(), None);
        assert!(!host.renderer().has_pending_work());
        assert!(host.target().children(container).is_empty());
    }
}
