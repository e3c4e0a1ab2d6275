use std::env;
use std::error::Error;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use fiber_core::{deps, CommitSummary, Component, Element, MemoryTarget, NodeId};
use fiber_runtime_std::{StdHost, DEFAULT_SLICE_BUDGET};

const SLICE_ENV: &str = "COUNTER_DEMO_SLICE_MS";

fn counter() -> Component {
    Component::new("Counter", |cx, _props| {
        let (count, set_count) = cx.use_state(0_i64);

        cx.use_effect(
            move || {
                log::info!("count is now {count}");
            },
            deps![count],
        );

        let increment = set_count.clone();
        let decrement = set_count;
        Some(Element::host("div").children([
            Element::host("h1").child(format!("Count: {count}")),
            Element::host("button")
                .attr("id", "increment")
                .on("onClick", move || increment.update(|n| n + 1))
                .child("Increment"),
            Element::host("button")
                .attr("id", "decrement")
                .on("onClick", move || decrement.update(|n| n - 1))
                .child("Decrement"),
        ]))
    })
}

fn slice_budget() -> Duration {
    match env::var(SLICE_ENV) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(err) => {
                log::warn!("ignoring {SLICE_ENV}={raw:?}: {err}");
                DEFAULT_SLICE_BUDGET
            }
        },
        Err(_) => DEFAULT_SLICE_BUDGET,
    }
}

fn button(host: &StdHost<MemoryTarget>, container: NodeId, id: &str) -> Option<NodeId> {
    host.target()
        .find_by_tag(container, "button")
        .into_iter()
        .find(|node| {
            host.target()
                .node(*node)
                .and_then(|node| node.attribute("id"))
                .and_then(|value| value.as_str())
                == Some(id)
        })
}

/// Settles pending renders if the scheduler woke us since the last call.
fn pump(host: &mut StdHost<MemoryTarget>, wakes: &Receiver<()>) -> Option<CommitSummary> {
    let woken = wakes.try_iter().count();
    if woken == 0 {
        return None;
    }
    log::debug!("woken {woken} time(s), running slices");
    host.run_until_idle()
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    println!("=== Fiber Counter Example ===");
    println!("Pass clicks as arguments: `+` increments, `-` decrements.");
    println!("Set {SLICE_ENV} to change the slice budget, RUST_LOG to see the work loop.");
    println!();

    let clicks: Vec<String> = env::args().skip(1).collect();
    let clicks = if clicks.is_empty() {
        vec!["+".to_owned(), "+".to_owned(), "+".to_owned(), "-".to_owned()]
    } else {
        clicks
    };

    let mut target = MemoryTarget::new();
    let container = target.create_container("app");
    let mut host = StdHost::new(target).with_slice_budget(slice_budget());
    let (wake_tx, wakes) = mpsc::channel();
    host.set_idle_waker(move || {
        let _ = wake_tx.send(());
    });

    host.render(counter().element(), container);
    pump(&mut host, &wakes);
    print!("{}", host.target().dump_tree(container));

    for click in clicks {
        let id = match click.as_str() {
            "+" => "increment",
            "-" => "decrement",
            other => {
                log::warn!("unknown click {other:?}, expected `+` or `-`");
                continue;
            }
        };
        let node = button(&host, container, id).ok_or("counter button missing")?;
        host.target().dispatch(node, "click")?;
        if let Some(summary) = pump(&mut host, &wakes) {
            println!(
                "\n{click} -> {} updated, {} added, {} deleted, {} effects",
                summary.updated, summary.added, summary.deleted, summary.effects_run
            );
        }
        print!("{}", host.target().dump_tree(container));
    }

    Ok(())
}
