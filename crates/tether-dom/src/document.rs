//! The document: an arena of nodes behind interior mutability.

use std::cell::RefCell;
use tether_types::{EvalResult, Value};

use crate::event::Event;
use crate::node::{Attribute, ElementData, Listener, NodeData, NodeId, NodeKind};
use crate::parse::parse_fragment;
use crate::serialize::{serialize_children, serialize_node};

/// An in-memory HTML document.
///
/// The arena never frees slots: detached nodes keep their `NodeId`, which
/// keeps stale bindings harmless (they write into detached subtrees).
pub struct Document {
    nodes: RefCell<Vec<NodeData>>,
    /// Elements inserted into the attached tree since the last drain.
    mutations: RefCell<Vec<NodeId>>,
    root: NodeId,
}

impl Document {
    /// Create a document with an empty `body` root element.
    pub fn new() -> Self {
        let body = NodeData::new(NodeKind::Element(ElementData::new("body")));
        Self {
            nodes: RefCell::new(vec![body]),
            mutations: RefCell::new(Vec::new()),
            root: NodeId(0),
        }
    }

    /// Create a document whose body holds the parsed `html`.
    pub fn from_body_html(html: &str) -> Self {
        let doc = Self::new();
        doc.set_inner_html(doc.root(), html);
        doc
    }

    /// The root (`body`) element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    // ── Node creation & structure ─────────────────────────────────────────

    /// Create a detached element node.
    pub fn create_element(&self, tag: impl Into<String>) -> NodeId {
        self.push_node(NodeData::new(NodeKind::Element(ElementData::new(tag))))
    }

    /// Create a detached text node.
    pub fn create_text(&self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeData::new(NodeKind::Text(text.into())))
    }

    fn push_node(&self, node: NodeData) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(nodes.len());
        nodes.push(node);
        id
    }

    pub(crate) fn nodes_ref(&self) -> std::cell::Ref<'_, Vec<NodeData>> {
        self.nodes.borrow()
    }

    /// Append `child` to `parent`. When the parent sits in the attached
    /// tree, the child's whole element subtree is recorded in the
    /// mutation log.
    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        {
            let mut nodes = self.nodes.borrow_mut();
            nodes[child.0].parent = Some(parent);
            nodes[parent.0].children.push(child);
        }
        if self.is_attached(parent) {
            let mut inserted = Vec::new();
            self.collect_elements(child, &mut inserted);
            self.mutations.borrow_mut().extend(inserted);
        }
    }

    /// Detach all children of `parent` (arena slots are kept).
    pub fn detach_children(&self, parent: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let children = std::mem::take(&mut nodes[parent.0].children);
        for child in children {
            nodes[child.0].parent = None;
        }
    }

    /// Whether the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.borrow()[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes.borrow()[id.0].children.clone()
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.nodes.borrow()[id.0].is_element()
    }

    /// The element's tag name, if it is an element.
    pub fn tag(&self, id: NodeId) -> Option<String> {
        match &self.nodes.borrow()[id.0].kind {
            NodeKind::Element(el) => Some(el.tag.clone()),
            NodeKind::Text(_) => None,
        }
    }

    /// Number of arena slots (attached or not). Diagnostic.
    pub fn node_count(&self) -> usize {
        self.nodes.borrow().len()
    }

    // ── Attributes ────────────────────────────────────────────────────────

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        match &self.nodes.borrow()[id.0].kind {
            NodeKind::Element(el) => el
                .attributes
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.clone()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn set_attribute(&self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element(el) = &mut self.nodes.borrow_mut()[id.0].kind {
            if let Some(attr) = el.attributes.iter_mut().find(|a| a.name == name) {
                attr.value = value.to_string();
            } else {
                el.attributes.push(Attribute {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
        }
    }

    pub fn remove_attribute(&self, id: NodeId, name: &str) {
        if let NodeKind::Element(el) = &mut self.nodes.borrow_mut()[id.0].kind {
            el.attributes.retain(|a| a.name != name);
        }
    }

    /// Snapshot of the element's attributes.
    pub fn attributes(&self, id: NodeId) -> Vec<Attribute> {
        match &self.nodes.borrow()[id.0].kind {
            NodeKind::Element(el) => el.attributes.clone(),
            NodeKind::Text(_) => Vec::new(),
        }
    }

    // ── Properties ────────────────────────────────────────────────────────

    /// Read a DOM property. Reflecting properties are served from the
    /// tree and attributes; the rest from the property table.
    pub fn property(&self, id: NodeId, name: &str) -> Option<Value> {
        match name {
            "innerHTML" => Some(Value::String(self.inner_html(id))),
            "textContent" => Some(Value::String(self.text_content(id))),
            "className" => Some(Value::String(
                self.attribute(id, "class").unwrap_or_default(),
            )),
            "id" | "title" => Some(Value::String(self.attribute(id, name).unwrap_or_default())),
            _ => match &self.nodes.borrow()[id.0].kind {
                NodeKind::Element(el) => el.properties.get(name).cloned(),
                NodeKind::Text(_) => None,
            },
        }
    }

    /// Write a DOM property, with the reflecting special cases.
    pub fn set_property(&self, id: NodeId, name: &str, value: Value) {
        match name {
            "innerHTML" => self.set_inner_html(id, &value.display_string()),
            "textContent" => self.set_text_content(id, &value.display_string()),
            "className" => self.set_attribute(id, "class", &value.display_string()),
            "id" | "title" => self.set_attribute(id, name, &value.display_string()),
            _ => {
                if let NodeKind::Element(el) = &mut self.nodes.borrow_mut()[id.0].kind {
                    el.properties.insert(name.to_string(), value);
                }
            }
        }
    }

    // ── Content ───────────────────────────────────────────────────────────

    /// Serialize the element's children to HTML.
    pub fn inner_html(&self, id: NodeId) -> String {
        serialize_children(self, id)
    }

    /// Serialize the element itself to HTML.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        serialize_node(self, id, &mut out);
        out
    }

    /// Replace the element's content with parsed `html`. Newly inserted
    /// elements land in the mutation log.
    pub fn set_inner_html(&self, id: NodeId, html: &str) {
        self.detach_children(id);
        for top in parse_fragment(self, html) {
            self.append_child(id, top);
        }
    }

    /// Replace the element's content with a single text node.
    pub fn set_text_content(&self, id: NodeId, text: &str) {
        self.detach_children(id);
        let node = self.create_text(text);
        self.append_child(id, node);
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let (text, children) = {
            let nodes = self.nodes.borrow();
            match &nodes[id.0].kind {
                NodeKind::Text(t) => (Some(t.clone()), Vec::new()),
                NodeKind::Element(_) => (None, nodes[id.0].children.clone()),
            }
        };
        if let Some(text) = text {
            out.push_str(&text);
        }
        for child in children {
            self.collect_text(child, out);
        }
    }

    // ── Events ────────────────────────────────────────────────────────────

    /// Attach a listener for `event_type` on the element.
    pub fn add_event_listener(&self, id: NodeId, event_type: &str, listener: Listener) {
        if let NodeKind::Element(el) = &mut self.nodes.borrow_mut()[id.0].kind {
            el.listeners.push((event_type.to_string(), listener));
        }
    }

    /// Dispatch an event on the element: every matching listener runs
    /// synchronously, in registration order. The first evaluation error
    /// stops dispatch and propagates to the caller.
    pub fn dispatch(&self, id: NodeId, event: &Event) -> EvalResult<()> {
        let event = event.clone().with_target(id);
        let listeners: Vec<Listener> = {
            match &self.nodes.borrow()[id.0].kind {
                NodeKind::Element(el) => el
                    .listeners
                    .iter()
                    .filter(|(t, _)| *t == event.event_type)
                    .map(|(_, l)| l.clone())
                    .collect(),
                NodeKind::Text(_) => Vec::new(),
            }
        };
        for listener in listeners {
            listener(&event)?;
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// All attached elements in tree order (including the root).
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements(self.root, &mut out);
        out
    }

    /// Attached elements carrying the given attribute, in tree order.
    pub fn elements_with_attribute(&self, name: &str) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|id| self.has_attribute(*id, name))
            .collect()
    }

    /// Element descendants of `id` (not including `id`), in tree order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for child in self.children(id) {
            self.collect_elements(child, &mut out);
        }
        out
    }

    fn collect_elements(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if self.is_element(id) {
            out.push(id);
        }
        for child in self.children(id) {
            self.collect_elements(child, out);
        }
    }

    // ── Mutation log ──────────────────────────────────────────────────────

    /// Drain the log of elements inserted since the last drain.
    pub fn take_mutations(&self) -> Vec<NodeId> {
        std::mem::take(&mut *self.mutations.borrow_mut())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_serialize() {
        let doc = Document::new();
        let div = doc.create_element("div");
        doc.set_attribute(div, "class", "card");
        let text = doc.create_text("hello");
        doc.append_child(div, text);
        doc.append_child(doc.root(), div);
        assert_eq!(doc.inner_html(doc.root()), r#"<div class="card">hello</div>"#);
    }

    #[test]
    fn test_mutation_log_records_attached_inserts_only() {
        let doc = Document::new();
        let div = doc.create_element("div");
        let inner = doc.create_element("span");
        doc.append_child(div, inner); // detached — not logged
        assert!(doc.take_mutations().is_empty());

        doc.append_child(doc.root(), div); // attaches both
        let logged = doc.take_mutations();
        assert_eq!(logged, vec![div, inner]);
    }

    #[test]
    fn test_set_inner_html_round_trip() {
        let doc = Document::from_body_html("<div interactive><span>{{ model.value }}</span></div>");
        let html = doc.inner_html(doc.root());
        assert_eq!(html, "<div interactive><span>{{ model.value }}</span></div>");
    }

    #[test]
    fn test_property_reflection() {
        let doc = Document::new();
        let div = doc.create_element("div");
        doc.append_child(doc.root(), div);
        doc.set_property(div, "className", Value::from("active"));
        assert_eq!(doc.attribute(div, "class").as_deref(), Some("active"));
        doc.set_property(div, "innerHTML", Value::from("<b>x</b>"));
        assert_eq!(doc.inner_html(div), "<b>x</b>");
    }

    #[test]
    fn test_text_content() {
        let doc = Document::from_body_html("<div>a<span>b</span>c</div>");
        let div = doc.children(doc.root())[0];
        assert_eq!(doc.text_content(div), "abc");
    }

    #[test]
    fn test_dispatch_runs_listeners_in_order() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let doc = Document::new();
        let button = doc.create_element("button");
        doc.append_child(doc.root(), button);

        let calls = Rc::new(RefCell::new(Vec::new()));
        for label in ["first", "second"] {
            let calls = calls.clone();
            doc.add_event_listener(
                button,
                "click",
                Rc::new(move |_event| {
                    calls.borrow_mut().push(label);
                    Ok(())
                }),
            );
        }
        doc.dispatch(button, &Event::new("click")).unwrap();
        assert_eq!(*calls.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_detached_nodes_keep_their_slot() {
        let doc = Document::from_body_html("<div>x</div>");
        let div = doc.children(doc.root())[0];
        doc.set_inner_html(doc.root(), "<span>y</span>");
        assert!(!doc.is_attached(div));
        // Writes to the detached node are harmless.
        doc.set_attribute(div, "class", "gone");
        assert_eq!(doc.attribute(div, "class").as_deref(), Some("gone"));
    }
}
