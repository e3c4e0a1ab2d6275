//! Host scheduling contracts.
//!
//! The renderer never keeps time itself. The host decides when spare time is
//! available and how much of it the work loop may use.

use std::time::Duration;

/// Grants time slices to the renderer.
///
/// Implementations arrange for [`Renderer::work_loop`](crate::Renderer::work_loop)
/// to be called when the host is idle. They must be safe to use from
/// multiple threads.
pub trait IdleScheduler: Send + Sync {
    /// Request that the host run the work loop at its next idle period.
    fn request_idle_callback(&self);
}

/// Budget of the slice currently being executed.
pub trait IdleDeadline {
    /// Time left in the slice. Queried once after every unit of work.
    fn time_remaining(&self) -> Duration;
}

impl<F> IdleDeadline for F
where
    F: Fn() -> Duration,
{
    fn time_remaining(&self) -> Duration {
        self()
    }
}
