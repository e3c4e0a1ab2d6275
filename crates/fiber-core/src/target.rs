//! The rendering-target seam and the property diff applied through it.

use crate::element::{HostTag, Props};
use crate::error::TargetError;
use crate::value::{EventHandler, Value};

pub type NodeId = usize;

/// Native tree the renderer mutates during commit.
///
/// Node creation happens while rendering (nodes start detached); appends,
/// removals and property updates happen only inside a commit.
pub trait RenderTarget {
    fn create_node(&mut self, tag: &HostTag) -> Result<NodeId, TargetError>;
    fn apply_props(&mut self, node: NodeId, patch: &PropPatch) -> Result<(), TargetError>;
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TargetError>;
    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TargetError>;
}

impl<T: RenderTarget + ?Sized> RenderTarget for Box<T> {
    fn create_node(&mut self, tag: &HostTag) -> Result<NodeId, TargetError> {
        (**self).create_node(tag)
    }

    fn apply_props(&mut self, node: NodeId, patch: &PropPatch) -> Result<(), TargetError> {
        (**self).apply_props(node, patch)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TargetError> {
        (**self).append_child(parent, child)
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TargetError> {
        (**self).remove_child(parent, child)
    }
}

/// One property change for a host node.
#[derive(Clone, Debug, PartialEq)]
pub enum PropOp {
    RemoveListener { event: String, handler: EventHandler },
    RemoveAttribute { name: String },
    SetAttribute { name: String, value: Value },
    AddListener { event: String, handler: EventHandler },
}

/// Ordered property changes turning `old` props into `new` props.
///
/// Ops are grouped as: stale listeners unbound, gone attributes cleared,
/// new or changed attributes set, new or changed listeners bound.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropPatch {
    ops: Vec<PropOp>,
}

/// A property is event-shaped when its name starts with `on` and it holds a handler.
pub fn is_event(name: &str, value: &Value) -> bool {
    name.starts_with("on") && value.as_handler().is_some()
}

/// Event type bound for an event-shaped property: `onClick` listens to `click`.
pub fn event_type(name: &str) -> String {
    name.strip_prefix("on").unwrap_or(name).to_lowercase()
}

impl PropPatch {
    pub fn diff(new: &Props, old: &Props) -> Self {
        let mut ops = Vec::new();

        for (name, value) in old.attrs() {
            let Some(handler) = value.as_handler().filter(|_| is_event(name, value)) else {
                continue;
            };
            if new.get(name) != Some(value) {
                ops.push(PropOp::RemoveListener {
                    event: event_type(name),
                    handler: handler.clone(),
                });
            }
        }

        for (name, value) in old.attrs() {
            if !is_event(name, value) && !new.contains(name) {
                ops.push(PropOp::RemoveAttribute {
                    name: name.to_owned(),
                });
            }
        }

        for (name, value) in new.attrs() {
            if !is_event(name, value) && old.get(name) != Some(value) {
                ops.push(PropOp::SetAttribute {
                    name: name.to_owned(),
                    value: value.clone(),
                });
            }
        }

        for (name, value) in new.attrs() {
            let Some(handler) = value.as_handler().filter(|_| is_event(name, value)) else {
                continue;
            };
            if old.get(name) != Some(value) {
                ops.push(PropOp::AddListener {
                    event: event_type(name),
                    handler: handler.clone(),
                });
            }
        }

        Self { ops }
    }

    pub fn ops(&self) -> &[PropOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;

    #[test]
    fn diff_clears_gone_and_sets_changed_attributes() {
        let old = Element::host("div").attr("id", "a").attr("title", "t");
        let new = Element::host("div").attr("id", "b").attr("class", "c");
        let patch = PropPatch::diff(new.props(), old.props());
        assert_eq!(
            patch.ops(),
            &[
                PropOp::RemoveAttribute {
                    name: "title".into()
                },
                PropOp::SetAttribute {
                    name: "id".into(),
                    value: Value::from("b")
                },
                PropOp::SetAttribute {
                    name: "class".into(),
                    value: Value::from("c")
                },
            ]
        );
    }

    #[test]
    fn unchanged_props_produce_empty_patch() {
        let handler = EventHandler::new(|| {});
        let old = Element::host("button")
            .attr("id", "a")
            .attr("onClick", handler.clone());
        let new = Element::host("button").attr("id", "a").attr("onClick", handler);
        assert!(PropPatch::diff(new.props(), old.props()).is_empty());
    }

    #[test]
    fn changed_handler_is_unbound_then_rebound() {
        let first = EventHandler::new(|| {});
        let second = EventHandler::new(|| {});
        let old = Element::host("button").attr("onClick", first.clone());
        let new = Element::host("button").attr("onClick", second.clone());
        let patch = PropPatch::diff(new.props(), old.props());
        assert_eq!(
            patch.ops(),
            &[
                PropOp::RemoveListener {
                    event: "click".into(),
                    handler: first
                },
                PropOp::AddListener {
                    event: "click".into(),
                    handler: second
                },
            ]
        );
    }

    #[test]
    fn removed_handler_is_only_unbound() {
        let handler = EventHandler::new(|| {});
        let old = Element::host("button").attr("onMouseOver", handler.clone());
        let new = Element::host("button");
        let patch = PropPatch::diff(new.props(), old.props());
        assert_eq!(
            patch.ops(),
            &[PropOp::RemoveListener {
                event: "mouseover".into(),
                handler
            }]
        );
    }

    #[test]
    fn on_prefixed_plain_values_are_attributes() {
        let new = Element::host("input").attr("online", true);
        let patch = PropPatch::diff(new.props(), Element::host("input").props());
        assert_eq!(
            patch.ops(),
            &[PropOp::SetAttribute {
                name: "online".into(),
                value: Value::Bool(true)
            }]
        );
    }
}
