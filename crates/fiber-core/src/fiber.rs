//! Fiber records and the arena that owns them.
//!
//! Fibers reference each other through [`FiberId`] keys instead of pointers.
//! Keys are generational: once a fiber is released its key resolves to
//! nothing, so a stale `alternate` can never alias a newer fiber that reused
//! the slot.

use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

use crate::collections::map::HashSet;
use crate::element::{Component, Element, ElementType, HostTag, Props};
use crate::hooks::{CleanupSlot, Hook};
use crate::target::NodeId;

new_key_type! {
    /// Handle of a fiber inside the renderer's arena.
    pub struct FiberId;
}

/// Pending mutation of a fiber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectTag {
    Add,
    Update,
    Delete,
}

/// What a fiber renders, fixed when the fiber is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FiberKind {
    /// Synthetic root whose host node is the render container.
    Root,
    Host(HostTag),
    Component(Component),
}

impl FiberKind {
    fn from_element_type(ty: &ElementType) -> Self {
        match ty {
            ElementType::Host(tag) => FiberKind::Host(tag.clone()),
            ElementType::Component(component) => FiberKind::Component(component.clone()),
        }
    }

    /// Whether an element of type `ty` may reuse a fiber of this kind.
    pub fn matches(&self, ty: &ElementType) -> bool {
        match (self, ty) {
            (FiberKind::Host(tag), ElementType::Host(other)) => tag == other,
            (FiberKind::Component(component), ElementType::Component(other)) => {
                component == other
            }
            _ => false,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FiberKind::Root => "#root",
            FiberKind::Host(tag) => tag.as_str(),
            FiberKind::Component(component) => component.name(),
        }
    }
}

pub struct Fiber {
    pub(crate) kind: FiberKind,
    pub(crate) props: Rc<Props>,
    pub(crate) host: Option<NodeId>,
    pub(crate) parent: Option<FiberId>,
    pub(crate) child: Option<FiberId>,
    pub(crate) sibling: Option<FiberId>,
    pub(crate) alternate: Option<FiberId>,
    pub(crate) effect_tag: Option<EffectTag>,
    pub(crate) hooks: Vec<Hook>,
    /// Cleanups of effects the last render stopped calling.
    pub(crate) displaced_cleanups: Vec<CleanupSlot>,
}

impl Fiber {
    pub(crate) fn root(container: NodeId, props: Rc<Props>, alternate: Option<FiberId>) -> Self {
        Self {
            kind: FiberKind::Root,
            props,
            host: Some(container),
            parent: None,
            child: None,
            sibling: None,
            alternate,
            effect_tag: None,
            hooks: Vec::new(),
            displaced_cleanups: Vec::new(),
        }
    }

    pub(crate) fn added(element: &Element, parent: FiberId) -> Self {
        Self {
            kind: FiberKind::from_element_type(element.element_type()),
            props: element.shared_props(),
            host: None,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: None,
            effect_tag: Some(EffectTag::Add),
            hooks: Vec::new(),
            displaced_cleanups: Vec::new(),
        }
    }

    pub(crate) fn updated(
        element: &Element,
        parent: FiberId,
        alternate: FiberId,
        host: Option<NodeId>,
    ) -> Self {
        Self {
            kind: FiberKind::from_element_type(element.element_type()),
            props: element.shared_props(),
            host,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: Some(alternate),
            effect_tag: Some(EffectTag::Update),
            hooks: Vec::new(),
            displaced_cleanups: Vec::new(),
        }
    }

    pub fn kind(&self) -> &FiberKind {
        &self.kind
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn host_node(&self) -> Option<NodeId> {
        self.host
    }

    pub fn parent(&self) -> Option<FiberId> {
        self.parent
    }

    pub fn child(&self) -> Option<FiberId> {
        self.child
    }

    pub fn sibling(&self) -> Option<FiberId> {
        self.sibling
    }

    pub fn alternate(&self) -> Option<FiberId> {
        self.alternate
    }

    pub fn effect_tag(&self) -> Option<EffectTag> {
        self.effect_tag
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }
}

/// Owns every fiber of both tree generations.
#[derive(Default)]
pub struct FiberArena {
    fibers: SlotMap<FiberId, Fiber>,
}

impl FiberArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fiber: Fiber) -> FiberId {
        self.fibers.insert(fiber)
    }

    pub fn get(&self, id: FiberId) -> Option<&Fiber> {
        self.fibers.get(id)
    }

    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber> {
        self.fibers.get_mut(id)
    }

    pub fn contains(&self, id: FiberId) -> bool {
        self.fibers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }

    /// Next fiber in depth-first pre-order, never leaving the subtree of `boundary`.
    ///
    /// With `descend` false the children of `id` are skipped.
    pub fn next_in_preorder(&self, id: FiberId, boundary: FiberId, descend: bool) -> Option<FiberId> {
        if descend {
            if let Some(child) = self.fibers.get(id).and_then(|fiber| fiber.child) {
                return Some(child);
            }
        }
        let mut current = id;
        while current != boundary {
            let fiber = self.fibers.get(current)?;
            if let Some(sibling) = fiber.sibling {
                return Some(sibling);
            }
            current = fiber.parent?;
        }
        None
    }

    /// `root` and all of its descendants in pre-order.
    pub fn subtree(&self, root: FiberId) -> Vec<FiberId> {
        let mut visited = Vec::new();
        let mut next = self.contains(root).then_some(root);
        while let Some(id) = next {
            visited.push(id);
            next = self.next_in_preorder(id, root, true);
        }
        visited
    }

    /// Host node of the closest ancestor that has one.
    pub fn nearest_host_ancestor(&self, id: FiberId) -> Option<NodeId> {
        let mut current = self.fibers.get(id)?.parent;
        while let Some(parent_id) = current {
            let parent = self.fibers.get(parent_id)?;
            if parent.host.is_some() {
                return parent.host;
            }
            current = parent.parent;
        }
        None
    }

    /// Host node of `id` itself or, failing that, of its first descendant along `child` links.
    pub fn first_host_in_subtree(&self, id: FiberId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(fiber_id) = current {
            let fiber = self.fibers.get(fiber_id)?;
            if fiber.host.is_some() {
                return fiber.host;
            }
            current = fiber.child;
        }
        None
    }

    /// Releases `root` and everything linked below it. Returns the number freed.
    pub fn release_subtree(&mut self, root: FiberId) -> usize {
        let ids = self.subtree(root);
        for id in &ids {
            self.fibers.remove(*id);
        }
        ids.len()
    }

    /// Releases every fiber not reachable from `root`. Returns the number freed.
    pub fn retain_reachable(&mut self, root: FiberId) -> usize {
        let reachable: HashSet<FiberId> = self.subtree(root).into_iter().collect();
        let before = self.fibers.len();
        self.fibers.retain(|id, _| reachable.contains(&id));
        before - self.fibers.len()
    }
}

impl std::ops::Index<FiberId> for FiberArena {
    type Output = Fiber;

    fn index(&self, id: FiberId) -> &Fiber {
        &self.fibers[id]
    }
}

impl std::ops::IndexMut<FiberId> for FiberArena {
    fn index_mut(&mut self, id: FiberId) -> &mut Fiber {
        &mut self.fibers[id]
    }
}
