//! In-memory rendering target.

use indexmap::IndexMap;

use crate::element::{HostTag, NODE_VALUE};
use crate::error::TargetError;
use crate::target::{NodeId, PropOp, PropPatch, RenderTarget};
use crate::value::{EventHandler, Value};

/// A mutation observed by [`MemoryTarget`], in application order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    Create { node: NodeId, tag: String },
    ApplyProps { node: NodeId, ops: usize },
    Append { parent: NodeId, child: NodeId },
    Remove { parent: NodeId, child: NodeId },
}

#[derive(Debug)]
pub struct MemoryNode {
    tag: HostTag,
    attributes: IndexMap<String, Value>,
    listeners: Vec<(String, EventHandler)>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl MemoryNode {
    fn new(tag: HostTag) -> Self {
        Self {
            tag,
            attributes: IndexMap::new(),
            listeners: Vec::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn tag(&self) -> &HostTag {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.iter().filter(|(name, _)| name == event).count()
    }
}

/// Target keeping nodes in a vector and logging every mutation.
///
/// Removed nodes stay addressable (detached) so tests can inspect them.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    nodes: Vec<MemoryNode>,
    mutations: Vec<Mutation>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached node to render into. Not logged as a mutation.
    pub fn create_container(&mut self, tag: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(MemoryNode::new(HostTag::named(tag)));
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MemoryNode, TargetError> {
        self.nodes.get_mut(id).ok_or(TargetError::Missing { id })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(MemoryNode::children).unwrap_or(&[])
    }

    /// Concatenated text of every text node below `id`, in tree order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        self.collect_text(id, &mut text);
        text
    }

    fn collect_text(&self, id: NodeId, text: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if node.tag.is_text() {
            if let Some(value) = node.attributes.get(NODE_VALUE) {
                text.push_str(&value.to_string());
            }
        }
        for child in &node.children {
            self.collect_text(*child, text);
        }
    }

    /// Attached nodes below `root` (inclusive) whose tag is `tag`, in tree order.
    pub fn find_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if node.tag.as_str() == tag {
                found.push(id);
            }
            stack.extend(node.children.iter().rev());
        }
        found
    }

    /// Invokes every listener registered on `node` for `event`. Returns how many ran.
    pub fn dispatch(&self, node: NodeId, event: &str) -> Result<usize, TargetError> {
        let handlers: Vec<EventHandler> = self
            .nodes
            .get(node)
            .ok_or(TargetError::Missing { id: node })?
            .listeners
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in &handlers {
            handler.call();
        }
        Ok(handlers.len())
    }

    pub fn dump_tree(&self, root: NodeId) -> String {
        let mut output = String::new();
        self.dump_node(&mut output, root, 0);
        output
    }

    fn dump_node(&self, output: &mut String, id: NodeId, depth: usize) {
        let indent = "  ".repeat(depth);
        let Some(node) = self.nodes.get(id) else {
            output.push_str(&format!("{indent}[{id}] (missing)\n"));
            return;
        };
        if node.tag.is_text() {
            let value = node
                .attributes
                .get(NODE_VALUE)
                .map(Value::to_string)
                .unwrap_or_default();
            output.push_str(&format!("{indent}[{id}] {value:?}\n"));
            return;
        }
        output.push_str(&format!("{indent}[{id}] <{}", node.tag));
        for (name, value) in &node.attributes {
            output.push_str(&format!(" {name}={:?}", value.to_string()));
        }
        for (event, _) in &node.listeners {
            output.push_str(&format!(" @{event}"));
        }
        output.push_str(">\n");
        for child in &node.children {
            self.dump_node(output, *child, depth + 1);
        }
    }

    fn detach(&mut self, child: NodeId) -> Result<(), TargetError> {
        let Some(parent) = self.node_mut(child)?.parent.take() else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|id| *id != child);
        Ok(())
    }
}

impl RenderTarget for MemoryTarget {
    fn create_node(&mut self, tag: &HostTag) -> Result<NodeId, TargetError> {
        let id = self.nodes.len();
        self.nodes.push(MemoryNode::new(tag.clone()));
        self.mutations.push(Mutation::Create {
            node: id,
            tag: tag.as_str().to_owned(),
        });
        Ok(id)
    }

    fn apply_props(&mut self, id: NodeId, patch: &PropPatch) -> Result<(), TargetError> {
        let node = self.node_mut(id)?;
        for op in patch.ops() {
            match op {
                PropOp::RemoveListener { event, handler } => {
                    if let Some(index) = node
                        .listeners
                        .iter()
                        .position(|(name, bound)| name == event && bound == handler)
                    {
                        node.listeners.remove(index);
                    }
                }
                PropOp::RemoveAttribute { name } => {
                    node.attributes.shift_remove(name);
                }
                PropOp::SetAttribute { name, value } => {
                    node.attributes.insert(name.clone(), value.clone());
                }
                PropOp::AddListener { event, handler } => {
                    node.listeners.push((event.clone(), handler.clone()));
                }
            }
        }
        self.mutations.push(Mutation::ApplyProps {
            node: id,
            ops: patch.len(),
        });
        Ok(())
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TargetError> {
        if self.node_mut(parent)?.tag.is_text() {
            return Err(TargetError::NotAContainer { id: parent });
        }
        self.detach(child)?;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.mutations.push(Mutation::Append { parent, child });
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TargetError> {
        if self.node_mut(child)?.parent != Some(parent) {
            return Err(TargetError::NotAChild { parent, child });
        }
        self.detach(child)?;
        self.mutations.push(Mutation::Remove { parent, child });
        Ok(())
    }
}
