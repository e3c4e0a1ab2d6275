use std::cell::Cell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::platform::IdleScheduler;

struct RuntimeInner {
    scheduler: Arc<dyn IdleScheduler>,
    rerender_requested: Cell<bool>,
    slice_requests: Cell<u64>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn IdleScheduler>) -> Self {
        Self {
            scheduler,
            rerender_requested: Cell::new(false),
            slice_requests: Cell::new(0),
        }
    }

    fn request_slice(&self) {
        self.slice_requests.set(self.slice_requests.get() + 1);
        self.scheduler.request_idle_callback();
    }

    fn request_rerender(&self) {
        self.rerender_requested.set(true);
        self.request_slice();
    }
}

/// Shared scheduling state between a renderer and the setters it hands out.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn IdleScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn request_slice(&self) {
        self.inner.request_slice();
    }

    pub fn has_rerender_request(&self) -> bool {
        self.inner.rerender_requested.get()
    }

    /// Clears and returns the pending re-render request.
    pub fn take_rerender_request(&self) -> bool {
        self.inner.rerender_requested.replace(false)
    }

    /// Number of idle callbacks requested so far.
    pub fn slice_requests(&self) -> u64 {
        self.inner.slice_requests.get()
    }
}

/// Scheduler for hosts that drive the work loop themselves.
#[derive(Debug, Default)]
pub struct DefaultScheduler;

impl IdleScheduler for DefaultScheduler {
    fn request_idle_callback(&self) {}
}

/// Weak handle held by state setters.
#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    /// Flags that a new pass from the committed root is needed.
    ///
    /// Returns `false` when the renderer has been dropped.
    pub fn request_rerender(&self) -> bool {
        match self.0.upgrade() {
            Some(inner) => {
                inner.request_rerender();
                true
            }
            None => false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}
