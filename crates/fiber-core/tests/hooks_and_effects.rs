use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fiber_core::{deps, Component, EffectCleanup, Element, StateSetter};
use fiber_testing::prelude::*;

type Log = Rc<RefCell<Vec<String>>>;
type SetterSlot<T> = Rc<RefCell<Option<StateSetter<T>>>>;

fn captured<T>(slot: &SetterSlot<T>) -> StateSetter<T> {
    slot.borrow().clone().expect("setter captured during render")
}

/// Keeps `count` in state and logs an effect keyed on it plus a mount-only effect.
fn tracked(log: &Log, setter: &SetterSlot<i64>) -> Component {
    let log = log.clone();
    let setter = setter.clone();
    Component::new("Tracked", move |cx, _| {
        let (count, set_count) = cx.use_state(0_i64);
        *setter.borrow_mut() = Some(set_count);

        let effect_log = log.clone();
        cx.use_effect(
            move || {
                effect_log.borrow_mut().push(format!("effect {count}"));
                EffectCleanup::new(move || effect_log.borrow_mut().push(format!("cleanup {count}")))
            },
            deps![count],
        );

        let mount_log = log.clone();
        cx.use_effect(move || mount_log.borrow_mut().push("mount".to_owned()), deps![]);

        Some(Element::text(count))
    })
}

#[test]
fn cleanup_runs_before_effect_fires_again() {
    let log: Log = Rc::default();
    let setter: SetterSlot<i64> = Rc::default();
    let mut rule = RenderTestRule::new();
    rule.mount(tracked(&log, &setter).element()).expect("mount");
    assert_eq!(*log.borrow(), vec!["effect 0", "mount"]);

    captured(&setter).set(1);
    let outcomes = rule.pump_until_idle().expect("update");
    assert_eq!(commits(&outcomes)[0].effects_run, 1);
    assert_eq!(
        *log.borrow(),
        vec!["effect 0", "mount", "cleanup 0", "effect 1"]
    );
    assert_eq!(rule.text(), "1");
}

#[test]
fn unchanged_dependencies_skip_effect() {
    let log: Log = Rc::default();
    let setter: SetterSlot<i64> = Rc::default();
    let mut rule = RenderTestRule::new();
    rule.mount(tracked(&log, &setter).element()).expect("mount");

    captured(&setter).update(|count| *count);
    let outcomes = rule.pump_until_idle().expect("re-render");
    assert_eq!(commits(&outcomes)[0].effects_run, 0);
    assert_eq!(*log.borrow(), vec!["effect 0", "mount"]);
}

#[test]
fn unmount_runs_every_pending_cleanup() {
    let log: Log = Rc::default();
    let setter: SetterSlot<i64> = Rc::default();
    let mut rule = RenderTestRule::new();
    rule.mount(Element::host("div").child(tracked(&log, &setter).element()))
        .expect("mount");
    captured(&setter).set(4);
    rule.pump_until_idle().expect("update");

    rule.mount(Element::host("div")).expect("unmount");
    assert_eq!(
        *log.borrow(),
        vec!["effect 0", "mount", "cleanup 0", "effect 4", "cleanup 4"]
    );
}

#[test]
fn hook_positions_are_stable_across_renders() {
    let seen: Rc<RefCell<Vec<(usize, String, i64)>>> = Rc::default();
    let setter: SetterSlot<String> = Rc::default();
    let form = {
        let seen = seen.clone();
        let setter = setter.clone();
        Component::new("Form", move |cx, _| {
            let (name, set_name) = cx.use_state(String::from("ada"));
            let (age, _) = cx.use_state(36_i64);
            cx.use_effect(|| {}, deps![name.as_str()]);
            seen.borrow_mut().push((cx.hook_index(), name.clone(), age));
            *setter.borrow_mut() = Some(set_name);
            Some(Element::text(name))
        })
    };

    let mut rule = RenderTestRule::new();
    rule.mount(form.element()).expect("mount");
    captured(&setter).set("grace".to_owned());
    rule.pump_until_idle().expect("update");

    assert_eq!(
        *seen.borrow(),
        vec![
            (3, "ada".to_owned(), 36),
            (3, "grace".to_owned(), 36),
        ]
    );
    let renderer = rule.renderer();
    let component = renderer.current_fibers()[1];
    assert_eq!(renderer.fiber(component).map(|f| f.hook_count()), Some(3));
}

#[test]
fn queued_updates_replay_in_order() {
    let setter: SetterSlot<i64> = Rc::default();
    let log: Log = Rc::default();
    let mut rule = RenderTestRule::new();
    rule.mount(tracked(&log, &setter).element()).expect("mount");

    let set = captured(&setter);
    set.update(|n| n + 10);
    set.set(5);
    set.update(|n| n * 3);
    let outcomes = rule.pump_until_idle().expect("update");
    assert_eq!(commits(&outcomes).len(), 1);
    assert_eq!(rule.text(), "15");
}

#[test]
fn setter_after_renderer_dropped_is_ignored() {
    let setter: SetterSlot<i64> = Rc::default();
    let log: Log = Rc::default();
    let handle = {
        let mut rule = RenderTestRule::new();
        rule.mount(tracked(&log, &setter).element()).expect("mount");
        let handle = rule.runtime_handle();
        assert!(handle.is_alive());
        handle
    };
    assert!(!handle.is_alive());
    let set = captured(&setter);
    set.set(9);
    assert_eq!(set.pending_updates(), 1);
}

/// Effect that counts how often it ran and how often its cleanup ran.
fn counted_effect(cx: &mut fiber_core::RenderContext<'_>, runs: &Rc<Cell<u32>>, cleanups: &Rc<Cell<u32>>) {
    let runs = runs.clone();
    let cleanups = cleanups.clone();
    cx.use_effect(
        move || {
            runs.set(runs.get() + 1);
            EffectCleanup::new(move || cleanups.set(cleanups.get() + 1))
        },
        deps![],
    );
}

#[test]
fn effect_replaced_by_state_still_cleans_up() {
    let runs = Rc::new(Cell::new(0));
    let cleanups = Rc::new(Cell::new(0));
    let switch = {
        let runs = runs.clone();
        let cleanups = cleanups.clone();
        Component::new("Switch", move |cx, props| {
            if props.contains("stateful") {
                let (value, _) = cx.use_state(7_i64);
                Some(Element::text(value))
            } else {
                counted_effect(cx, &runs, &cleanups);
                Some(Element::text("effect"))
            }
        })
    };

    let mut rule = RenderTestRule::new();
    rule.mount(switch.element()).expect("mount");
    assert_eq!((runs.get(), cleanups.get()), (1, 0));

    rule.mount(switch.element().attr("stateful", true))
        .expect("swap hook kind");
    assert_eq!((runs.get(), cleanups.get()), (1, 1));
    assert_eq!(rule.text(), "7");

    rule.mount(Element::host("div")).expect("unmount");
    assert_eq!((runs.get(), cleanups.get()), (1, 1));
}

#[test]
fn effect_no_longer_called_still_cleans_up() {
    let runs = Rc::new(Cell::new(0));
    let cleanups = Rc::new(Cell::new(0));
    let conditional = {
        let runs = runs.clone();
        let cleanups = cleanups.clone();
        Component::new("Conditional", move |cx, props| {
            if props.contains("on") {
                counted_effect(cx, &runs, &cleanups);
            }
            Some(Element::text("body"))
        })
    };

    let mut rule = RenderTestRule::new();
    rule.mount(conditional.element().attr("on", true)).expect("mount");
    assert_eq!((runs.get(), cleanups.get()), (1, 0));

    rule.mount(conditional.element()).expect("drop effect");
    assert_eq!((runs.get(), cleanups.get()), (1, 1));
    let renderer = rule.renderer();
    let component = renderer.current_fibers()[1];
    assert_eq!(renderer.fiber(component).map(|f| f.hook_count()), Some(0));

    rule.mount(Element::host("div")).expect("unmount");
    assert_eq!((runs.get(), cleanups.get()), (1, 1));
}

#[test]
fn state_replaced_by_effect_runs_effect_fresh() {
    let runs = Rc::new(Cell::new(0));
    let cleanups = Rc::new(Cell::new(0));
    let switch = {
        let runs = runs.clone();
        let cleanups = cleanups.clone();
        Component::new("Switch", move |cx, props| {
            if props.contains("effect") {
                counted_effect(cx, &runs, &cleanups);
            } else {
                cx.use_state(0_i64);
            }
            Some(Element::text("x"))
        })
    };

    let mut rule = RenderTestRule::new();
    rule.mount(switch.element()).expect("mount");
    rule.mount(switch.element().attr("effect", true)).expect("swap");
    assert_eq!((runs.get(), cleanups.get()), (1, 0));

    rule.mount(Element::host("div")).expect("unmount");
    assert_eq!((runs.get(), cleanups.get()), (1, 1));
}
