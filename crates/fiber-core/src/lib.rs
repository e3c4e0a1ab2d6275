#![doc = r"Core runtime pieces for the fiber reconciler: elements, fibers, hooks, the interruptible work loop and the commit phase."]

pub mod collections;
mod commit;
pub mod element;
pub mod error;
pub mod fiber;
pub mod hooks;
pub mod memory;
pub mod platform;
mod reconcile;
pub mod runtime;
pub mod scheduler;
pub mod target;
pub mod value;

pub use element::{create_element, Child, Component, Element, ElementType, HostTag, Props};
pub use element::{NODE_VALUE, TEXT_ELEMENT};
pub use error::{RenderError, TargetError};
pub use fiber::{EffectTag, Fiber, FiberId, FiberKind};
pub use hooks::{EffectCleanup, RenderContext, StateSetter};
pub use memory::{MemoryNode, MemoryTarget, Mutation};
pub use platform::{IdleDeadline, IdleScheduler};
pub use runtime::{DefaultScheduler, Runtime, RuntimeHandle};
pub use scheduler::{CommitSummary, Renderer, RendererOptions, SliceOutcome, SliceStatus};
pub use target::{NodeId, PropOp, PropPatch, RenderTarget};
pub use value::{EventHandler, Value};

/// Builds a dependency list for [`RenderContext::use_effect`].
///
/// ```ignore
/// cx.use_effect(move || log::info!("count is {count}"), deps![count]);
/// ```
#[macro_export]
macro_rules! deps {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($dep:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($dep)),+]
    };
}
