//! Immutable element descriptions.
//!
//! An [`Element`] says what a tree position should look like: a host tag or a
//! component function, plus its properties and ordered children. Elements are
//! rebuilt from scratch on every render and carry no identity; the reconciler
//! matches them against the previous fiber tree purely by position and type.

use std::fmt;
use std::ptr;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::hooks::RenderContext;
use crate::value::{EventHandler, Value};

/// Tag used for leaf elements wrapping raw text.
pub const TEXT_ELEMENT: &str = "TEXT_ELEMENT";

/// Property holding the raw value of a [`TEXT_ELEMENT`].
pub const NODE_VALUE: &str = "nodeValue";

/// Tag of a host element.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HostTag {
    Text,
    Named(Rc<str>),
}

impl HostTag {
    pub fn named(tag: &str) -> Self {
        if tag == TEXT_ELEMENT {
            HostTag::Text
        } else {
            HostTag::Named(Rc::from(tag))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            HostTag::Text => TEXT_ELEMENT,
            HostTag::Named(tag) => tag,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, HostTag::Text)
    }
}

impl fmt::Display for HostTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type RenderFn = dyn Fn(&mut RenderContext<'_>, &Props) -> Option<Element>;

/// A component function.
///
/// Components are compared by identity: two elements have the same type only
/// if they were built from clones of the same `Component`.
#[derive(Clone)]
pub struct Component {
    name: &'static str,
    render: Rc<RenderFn>,
}

impl Component {
    pub fn new<F>(name: &'static str, render: F) -> Self
    where
        F: Fn(&mut RenderContext<'_>, &Props) -> Option<Element> + 'static,
    {
        Self {
            name,
            render: Rc::new(render),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Creates an element of this component type with no properties.
    pub fn element(&self) -> Element {
        Element::new(ElementType::Component(self.clone()), Props::default())
    }

    pub(crate) fn render(&self, cx: &mut RenderContext<'_>, props: &Props) -> Option<Element> {
        (self.render)(cx, props)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        ptr::addr_eq(Rc::as_ptr(&self.render), Rc::as_ptr(&other.render))
    }
}

impl Eq for Component {}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementType {
    Host(HostTag),
    Component(Component),
}

impl ElementType {
    pub fn name(&self) -> &str {
        match self {
            ElementType::Host(tag) => tag.as_str(),
            ElementType::Component(component) => component.name(),
        }
    }
}

impl From<&str> for ElementType {
    fn from(tag: &str) -> Self {
        ElementType::Host(HostTag::named(tag))
    }
}

impl From<HostTag> for ElementType {
    fn from(tag: HostTag) -> Self {
        ElementType::Host(tag)
    }
}

impl From<Component> for ElementType {
    fn from(component: Component) -> Self {
        ElementType::Component(component)
    }
}

impl From<&Component> for ElementType {
    fn from(component: &Component) -> Self {
        ElementType::Component(component.clone())
    }
}

/// Element properties: insertion-ordered attributes plus ordered children.
#[derive(Clone, Debug, Default)]
pub struct Props {
    attrs: IndexMap<String, Value>,
    children: Vec<Element>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children(children: Vec<Element>) -> Self {
        Self {
            attrs: IndexMap::new(),
            children,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attrs.insert(name.into(), value.into());
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attrs.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }
}

/// Immutable description of one desired tree node.
#[derive(Clone, Debug)]
pub struct Element {
    ty: ElementType,
    props: Rc<Props>,
}

impl Element {
    pub fn new(ty: impl Into<ElementType>, props: Props) -> Self {
        Self {
            ty: ty.into(),
            props: Rc::new(props),
        }
    }

    pub fn host(tag: &str) -> Self {
        Self::new(HostTag::named(tag), Props::default())
    }

    /// Leaf element carrying `value` as its [`NODE_VALUE`] property.
    pub fn text(value: impl Into<Value>) -> Self {
        let mut props = Props::default();
        props.set(NODE_VALUE, value);
        Self::new(HostTag::Text, props)
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        Rc::make_mut(&mut self.props).set(name, value);
        self
    }

    /// Binds `handler` under the event-shaped property `prop` (e.g. `"onClick"`).
    pub fn on(self, prop: impl Into<String>, handler: impl Fn() + 'static) -> Self {
        self.attr(prop, EventHandler::new(handler))
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        Rc::make_mut(&mut self.props).push_child(child.into().into_element());
        self
    }

    pub fn children<I, C>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        let props = Rc::make_mut(&mut self.props);
        for child in children {
            props.push_child(child.into().into_element());
        }
        self
    }

    pub fn element_type(&self) -> &ElementType {
        &self.ty
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub(crate) fn shared_props(&self) -> Rc<Props> {
        Rc::clone(&self.props)
    }
}

/// A child passed to [`create_element`] or [`Element::child`].
///
/// Anything that is not already an element becomes a text leaf.
#[derive(Clone, Debug)]
pub enum Child {
    Element(Element),
    Value(Value),
}

impl Child {
    pub fn into_element(self) -> Element {
        match self {
            Child::Element(element) => element,
            Child::Value(value) => Element::text(value),
        }
    }
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Child::Element(element)
    }
}

macro_rules! text_child_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Child {
                fn from(value: $ty) -> Self {
                    Child::Value(Value::from(value))
                }
            }
        )*
    };
}

text_child_from!(Value, bool, i32, i64, u32, usize, f64, &str, String, Rc<str>);

/// Builds an element from a type, an attribute list and children.
///
/// Non-element children are wrapped into [`TEXT_ELEMENT`] leaves.
pub fn create_element<K, A, C>(
    ty: impl Into<ElementType>,
    attrs: A,
    children: impl IntoIterator<Item = C>,
) -> Element
where
    K: Into<String>,
    A: IntoIterator<Item = (K, Value)>,
    C: Into<Child>,
{
    let mut props = Props::default();
    for (name, value) in attrs {
        props.set(name, value);
    }
    for child in children {
        props.push_child(child.into().into_element());
    }
    Element::new(ty, props)
}
