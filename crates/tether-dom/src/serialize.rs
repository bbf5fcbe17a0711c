//! HTML serialization — the inverse of the fragment parser.

use crate::document::Document;
use crate::node::{NodeId, NodeKind};
use crate::parse::is_void_element;

/// Serialize the children of `id` (its inner HTML).
pub(crate) fn serialize_children(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    for child in doc.children(id) {
        serialize_node(doc, child, &mut out);
    }
    out
}

/// Serialize one node (its outer HTML) into `out`.
pub(crate) fn serialize_node(doc: &Document, id: NodeId, out: &mut String) {
    // The snapshot is a clone, so no borrow is held across recursion.
    match doc.node_kind_snapshot(id) {
        NodeSnapshot::Text(text) => out.push_str(&escape_text(&text)),
        NodeSnapshot::Element { tag, attributes } => {
            out.push('<');
            out.push_str(&tag);
            for attr in attributes {
                out.push(' ');
                out.push_str(&attr.name);
                if !attr.value.is_empty() {
                    out.push_str("=\"");
                    out.push_str(&escape_attr(&attr.value));
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_element(&tag) {
                return;
            }
            for child in doc.children(id) {
                serialize_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
        }
    }
}

/// A borrow-free copy of the bits serialization needs.
pub(crate) enum NodeSnapshot {
    Text(String),
    Element {
        tag: String,
        attributes: Vec<crate::node::Attribute>,
    },
}

impl Document {
    pub(crate) fn node_kind_snapshot(&self, id: NodeId) -> NodeSnapshot {
        match &self.nodes_ref()[id.index()].kind {
            NodeKind::Text(text) => NodeSnapshot::Text(text.clone()),
            NodeKind::Element(el) => NodeSnapshot::Element {
                tag: el.tag.clone(),
                attributes: el.attributes.clone(),
            },
        }
    }
}

pub(crate) fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
