//! Arena node types.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use tether_types::{EvalResult, Value};

use crate::event::Event;

/// Index of a node in the document arena. Stable for the document's
/// lifetime — detached nodes keep their slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The raw arena index.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single HTML attribute. Order is preserved — serialization must
/// round-trip the markup it parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// An event listener attached to an element. Evaluation errors raised by
/// a handler body propagate out of `dispatch` uncaught.
pub type Listener = Rc<dyn Fn(&Event) -> EvalResult<()>>;

/// Data carried by an element node.
#[derive(Default)]
pub struct ElementData {
    pub tag: String,
    pub attributes: Vec<Attribute>,
    /// DOM properties written through property bindings. Reflecting
    /// properties (`className`, `id`, `title`, `innerHTML`, `textContent`)
    /// never land here — they are served from the tree and attributes.
    pub properties: BTreeMap<String, Value>,
    pub listeners: Vec<(String, Listener)>,
}

impl ElementData {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }
}

impl fmt::Debug for ElementData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementData")
            .field("tag", &self.tag)
            .field("attributes", &self.attributes)
            .field("properties", &self.properties)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// What a node is.
#[derive(Debug)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

/// A node in the arena.
#[derive(Debug)]
pub struct NodeData {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl NodeData {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element(_))
    }
}
