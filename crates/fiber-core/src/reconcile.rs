//! Positional child reconciliation.

use crate::element::Element;
use crate::fiber::{EffectTag, Fiber, FiberArena, FiberId};
use crate::target::NodeId;

#[derive(Clone, Copy)]
struct OldSlot {
    id: FiberId,
    host: Option<NodeId>,
    sibling: Option<FiberId>,
    same_type: bool,
}

/// Builds the new child list of `wip` from `elements`, diffing positionally
/// against the children of its alternate.
///
/// Same position and same type reuses the old host node (UPDATE). A new
/// element with no match gets a fresh fiber (ADD). An old fiber with no
/// match is tagged DELETE and pushed onto `deletions`. `None` slots produce
/// no fiber but still consume an old fiber at that position.
pub(crate) fn reconcile_children(
    arena: &mut FiberArena,
    deletions: &mut Vec<FiberId>,
    wip: FiberId,
    elements: &[Option<Element>],
) {
    arena[wip].child = None;

    let mut old = arena[wip]
        .alternate
        .and_then(|alternate| arena.get(alternate))
        .and_then(|alternate| alternate.child);
    let mut previous: Option<FiberId> = None;
    let mut index = 0;

    while index < elements.len() || old.is_some() {
        let element = elements.get(index).and_then(Option::as_ref);
        let matched = old.and_then(|id| {
            arena.get(id).map(|fiber| OldSlot {
                id,
                host: fiber.host,
                sibling: fiber.sibling,
                same_type: element.is_some_and(|element| fiber.kind.matches(element.element_type())),
            })
        });
        let same_type = matched.is_some_and(|slot| slot.same_type);

        let created = match (element, matched) {
            (Some(element), Some(slot)) if same_type => {
                Some(arena.insert(Fiber::updated(element, wip, slot.id, slot.host)))
            }
            (Some(element), _) => Some(arena.insert(Fiber::added(element, wip))),
            (None, _) => None,
        };

        if let Some(slot) = matched.filter(|_| !same_type) {
            arena[slot.id].effect_tag = Some(EffectTag::Delete);
            deletions.push(slot.id);
        }

        old = matched.and_then(|slot| slot.sibling);

        if let Some(created) = created {
            match previous {
                Some(previous) => arena[previous].sibling = Some(created),
                None => arena[wip].child = Some(created),
            }
            previous = Some(created);
        }
        index += 1;
    }

    log::trace!(
        "reconciled {} children of {}, {} pending deletions",
        elements.len(),
        arena[wip].kind.name(),
        deletions.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Component, Props};
    use std::rc::Rc;

    fn children(arena: &FiberArena, parent: FiberId) -> Vec<FiberId> {
        let mut ids = Vec::new();
        let mut next = arena[parent].child;
        while let Some(id) = next {
            ids.push(id);
            next = arena[id].sibling;
        }
        ids
    }

    fn committed(arena: &mut FiberArena, elements: &[Option<Element>]) -> FiberId {
        let root = arena.insert(Fiber::root(0, Rc::new(Props::default()), None));
        let mut deletions = Vec::new();
        reconcile_children(arena, &mut deletions, root, elements);
        for (host, id) in children(arena, root).into_iter().enumerate() {
            arena[id].host = Some(host + 1);
        }
        root
    }

    fn next_root(arena: &mut FiberArena, current: FiberId) -> FiberId {
        arena.insert(Fiber::root(0, Rc::new(Props::default()), Some(current)))
    }

    #[test]
    fn first_render_adds_every_element() {
        let mut arena = FiberArena::new();
        let root = arena.insert(Fiber::root(0, Rc::new(Props::default()), None));
        let mut deletions = Vec::new();
        reconcile_children(
            &mut arena,
            &mut deletions,
            root,
            &[Some(Element::host("a")), None, Some(Element::host("b"))],
        );
        let ids = children(&arena, root);
        assert_eq!(ids.len(), 2);
        assert!(ids.iter().all(|id| arena[*id].effect_tag == Some(EffectTag::Add)));
        assert!(deletions.is_empty());
    }

    #[test]
    fn same_type_reuses_host_and_links_alternate() {
        let mut arena = FiberArena::new();
        let current = committed(&mut arena, &[Some(Element::host("div"))]);
        let old_child = children(&arena, current)[0];

        let wip = next_root(&mut arena, current);
        let mut deletions = Vec::new();
        reconcile_children(
            &mut arena,
            &mut deletions,
            wip,
            &[Some(Element::host("div").attr("id", "x"))],
        );
        let new_child = children(&arena, wip)[0];
        assert_eq!(arena[new_child].effect_tag, Some(EffectTag::Update));
        assert_eq!(arena[new_child].alternate, Some(old_child));
        assert_eq!(arena[new_child].host, arena[old_child].host);
        assert!(deletions.is_empty());
    }

    #[test]
    fn type_change_replaces_fiber() {
        let mut arena = FiberArena::new();
        let current = committed(&mut arena, &[Some(Element::host("div"))]);
        let old_child = children(&arena, current)[0];

        let wip = next_root(&mut arena, current);
        let mut deletions = Vec::new();
        reconcile_children(&mut arena, &mut deletions, wip, &[Some(Element::host("span"))]);
        let new_child = children(&arena, wip)[0];
        assert_eq!(arena[new_child].effect_tag, Some(EffectTag::Add));
        assert_eq!(arena[new_child].host, None);
        assert_eq!(deletions, vec![old_child]);
        assert_eq!(arena[old_child].effect_tag, Some(EffectTag::Delete));
    }

    #[test]
    fn distinct_components_never_match() {
        let first = Component::new("First", |_, _| None);
        let second = Component::new("Second", |_, _| None);
        let mut arena = FiberArena::new();
        let current = committed(&mut arena, &[Some(first.element())]);

        let wip = next_root(&mut arena, current);
        let mut deletions = Vec::new();
        reconcile_children(&mut arena, &mut deletions, wip, &[Some(second.element())]);
        assert_eq!(deletions.len(), 1);
    }

    #[test]
    fn shrinking_deletes_trailing_fibers() {
        let mut arena = FiberArena::new();
        let current = committed(
            &mut arena,
            &[
                Some(Element::host("li")),
                Some(Element::host("li")),
                Some(Element::host("li")),
            ],
        );
        let old = children(&arena, current);

        let wip = next_root(&mut arena, current);
        let mut deletions = Vec::new();
        reconcile_children(&mut arena, &mut deletions, wip, &[Some(Element::host("li"))]);
        assert_eq!(children(&arena, wip).len(), 1);
        assert_eq!(deletions, vec![old[1], old[2]]);
    }

    #[test]
    fn empty_slot_consumes_old_fiber() {
        let mut arena = FiberArena::new();
        let current = committed(
            &mut arena,
            &[Some(Element::host("a")), Some(Element::host("b"))],
        );
        let old = children(&arena, current);

        let wip = next_root(&mut arena, current);
        let mut deletions = Vec::new();
        reconcile_children(
            &mut arena,
            &mut deletions,
            wip,
            &[None, Some(Element::host("b"))],
        );
        let new = children(&arena, wip);
        assert_eq!(new.len(), 1);
        assert_eq!(arena[new[0]].alternate, Some(old[1]));
        assert_eq!(deletions, vec![old[0]]);
    }
}
