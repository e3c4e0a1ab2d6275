//! Per-fiber hook records.
//!
//! Hooks are identified by call order: the Nth hook a component calls during
//! a render reads the Nth record of its alternate fiber. A record of another
//! kind (or another state type) at that position is treated as absent.
//! Effects that lose their position this way, or that are no longer called,
//! hand their cleanup slot to the new fiber so it still runs at commit.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::runtime::RuntimeHandle;
use crate::value::Value;

type Update<T> = Rc<dyn Fn(&T) -> T>;
type Cleanup = Box<dyn FnOnce()>;
pub(crate) type CleanupSlot = Rc<RefCell<Option<Cleanup>>>;
type EffectFn = Box<dyn FnOnce() -> EffectCleanup>;

pub(crate) enum Hook {
    State(StateHook),
    Effect(EffectHook),
}

impl Hook {
    fn kind(&self) -> &'static str {
        match self {
            Hook::State(_) => "state",
            Hook::Effect(_) => "effect",
        }
    }
}

pub(crate) struct StateHook {
    slot: Rc<dyn Any>,
}

struct StateSlot<T> {
    value: T,
    queue: RefCell<Vec<Update<T>>>,
}

impl<T: Clone + 'static> StateSlot<T> {
    fn new(value: T) -> Rc<Self> {
        Rc::new(Self {
            value,
            queue: RefCell::new(Vec::new()),
        })
    }

    /// The state with every queued update applied in enqueue order.
    fn resolve(&self) -> T {
        self.queue
            .borrow()
            .iter()
            .fold(self.value.clone(), |state, update| update(&state))
    }
}

pub(crate) struct EffectHook {
    deps: Vec<Value>,
    due: bool,
    effect: Option<EffectFn>,
    cleanup: CleanupSlot,
}

impl EffectHook {
    /// Takes the callback of a due effect together with its cleanup slot.
    pub(crate) fn take_due(&mut self) -> Option<(EffectFn, CleanupSlot)> {
        if !self.due {
            return None;
        }
        let effect = self.effect.take()?;
        Some((effect, Rc::clone(&self.cleanup)))
    }

    pub(crate) fn take_cleanup(&self) -> Option<Cleanup> {
        self.cleanup.borrow_mut().take()
    }
}

/// Cleanup returned by an effect callback.
///
/// It runs before the effect fires again and when its fiber is removed.
#[derive(Default)]
pub struct EffectCleanup {
    cleanup: Option<Cleanup>,
}

impl EffectCleanup {
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub(crate) fn into_cleanup(self) -> Option<Cleanup> {
        self.cleanup
    }
}

impl From<()> for EffectCleanup {
    fn from(_: ()) -> Self {
        Self::none()
    }
}

impl fmt::Debug for EffectCleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectCleanup")
            .field("present", &self.cleanup.is_some())
            .finish()
    }
}

/// Whether an effect with `next` dependencies must run given the `previous` ones.
pub fn deps_changed(previous: &[Value], next: &[Value]) -> bool {
    previous.len() != next.len() || previous.iter().zip(next).any(|(old, new)| old != new)
}

/// Handle that queues updates for one state hook.
///
/// Every call enqueues an update and asks the renderer for a fresh pass from
/// the committed root.
pub struct StateSetter<T> {
    slot: Rc<StateSlot<T>>,
    runtime: RuntimeHandle,
}

impl<T: 'static> StateSetter<T> {
    pub fn set(&self, value: T)
    where
        T: Clone,
    {
        self.update(move |_| value.clone());
    }

    pub fn update(&self, update: impl Fn(&T) -> T + 'static) {
        self.slot.queue.borrow_mut().push(Rc::new(update));
        if !self.runtime.request_rerender() {
            log::warn!("state update dropped: renderer is gone");
        }
    }

    /// Number of updates waiting for the next render.
    pub fn pending_updates(&self) -> usize {
        self.slot.queue.borrow().len()
    }
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("pending", &self.slot.queue.borrow().len())
            .finish()
    }
}

/// Hook access for one component evaluation.
///
/// A fresh context is created for every render of a component fiber; the
/// records it collects replace the fiber's hook list.
pub struct RenderContext<'a> {
    previous: &'a [Hook],
    hooks: Vec<Hook>,
    displaced: Vec<CleanupSlot>,
    runtime: RuntimeHandle,
    component: &'static str,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(previous: &'a [Hook], runtime: RuntimeHandle, component: &'static str) -> Self {
        Self {
            previous,
            hooks: Vec::with_capacity(previous.len()),
            displaced: Vec::new(),
            runtime,
            component,
        }
    }

    /// Position of the next hook call.
    pub fn hook_index(&self) -> usize {
        self.hooks.len()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.clone()
    }

    fn previous_hook(&self) -> Option<&'a Hook> {
        self.previous.get(self.hooks.len())
    }

    fn warn_kind_mismatch(&self, expected: &str, found: &str) {
        log::warn!(
            "{}: hook #{} was {found} last render, now {expected}; starting fresh",
            self.component,
            self.hooks.len()
        );
    }

    /// Returns the current state and a setter for it.
    ///
    /// On first render the state is `initial`; afterwards it is the previous
    /// state with all queued updates replayed.
    pub fn use_state<T: Clone + 'static>(&mut self, initial: T) -> (T, StateSetter<T>) {
        let resolved = match self.previous_hook() {
            Some(Hook::State(previous)) => {
                match Rc::clone(&previous.slot).downcast::<StateSlot<T>>() {
                    Ok(slot) => Some(slot.resolve()),
                    Err(_) => {
                        self.warn_kind_mismatch(std::any::type_name::<T>(), "another state type");
                        None
                    }
                }
            }
            Some(other) => {
                self.warn_kind_mismatch("state", other.kind());
                if let Hook::Effect(effect) = other {
                    self.displaced.push(Rc::clone(&effect.cleanup));
                }
                None
            }
            None => None,
        };
        let value = resolved.unwrap_or(initial);
        let slot = StateSlot::new(value.clone());
        self.hooks.push(Hook::State(StateHook {
            slot: Rc::clone(&slot) as Rc<dyn Any>,
        }));
        let setter = StateSetter {
            slot,
            runtime: self.runtime.clone(),
        };
        (value, setter)
    }

    /// Registers `effect` to run after commit when `deps` changed since the previous render.
    ///
    /// The effect always runs on the first render of a fiber.
    pub fn use_effect<F, R>(&mut self, effect: F, deps: impl IntoIterator<Item = Value>)
    where
        F: FnOnce() -> R + 'static,
        R: Into<EffectCleanup>,
    {
        let deps: Vec<Value> = deps.into_iter().collect();
        let (due, cleanup) = match self.previous_hook() {
            Some(Hook::Effect(previous)) => (
                deps_changed(&previous.deps, &deps),
                Rc::clone(&previous.cleanup),
            ),
            Some(other) => {
                self.warn_kind_mismatch("effect", other.kind());
                (true, Rc::new(RefCell::new(None)))
            }
            None => (true, Rc::new(RefCell::new(None))),
        };
        self.hooks.push(Hook::Effect(EffectHook {
            deps,
            due,
            effect: Some(Box::new(move || effect().into())),
            cleanup,
        }));
    }

    /// Consumes the context, returning the new hook list and the cleanup
    /// slots of previous effects that did not survive into it.
    pub(crate) fn into_parts(mut self) -> (Vec<Hook>, Vec<CleanupSlot>) {
        let previous = self.previous;
        let dropped = previous.get(self.hooks.len()..).unwrap_or(&[]);
        if !dropped.is_empty() {
            log::warn!(
                "{}: called {} hooks, {} last render",
                self.component,
                self.hooks.len(),
                previous.len()
            );
        }
        for hook in dropped {
            if let Hook::Effect(effect) = hook {
                self.displaced.push(Rc::clone(&effect.cleanup));
            }
        }
        (self.hooks, self.displaced)
    }
}
