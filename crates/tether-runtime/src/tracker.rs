//! The DOM tracker: one scan of a set of candidate elements.
//!
//! Scanning is opt-in per subtree — only elements carrying the
//! `interactive` marker attribute are processed, and each processed
//! element receives the registration marker *before* any binding is
//! evaluated, so DOM writes performed during evaluation cannot re-track
//! it.

use std::rc::Rc;
use tether_dom::{resolve_property, Document, Event, NodeId};
use tether_expr::CompiledExpression;

use crate::binding::{Binding, BindingTarget};
use crate::engine::{ElementRecord, EngineInner};
use crate::error::EngineError;
use crate::store::StoreContext;

/// Boolean attribute opting an element's subtree into scanning.
pub const INTERACTIVE_ATTRIBUTE: &str = "interactive";

/// Registration marker attribute, carrying the registration counter.
pub const REGISTERED_ATTRIBUTE: &str = "tether-registered";

/// Extract `{{ … }}` occurrences: `(occurrence, body)` pairs, non-greedy,
/// multi-line bodies allowed.
pub(crate) fn extract_snippets(html: &str) -> Vec<(String, String)> {
    let mut snippets = Vec::new();
    let mut rest = html;
    while let Some(open) = rest.find("{{") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            break;
        };
        let body = &after_open[..close];
        let occurrence = &rest[open..open + 2 + close + 2];
        snippets.push((occurrence.to_string(), body.to_string()));
        rest = &after_open[close + 2..];
    }
    snippets
}

/// Clean markup extracted from serialized HTML: trim, and restore the
/// entity-escaped forms of `>`, `<`, and `&` that serialization applies
/// to text content, so escaping cannot corrupt expression source.
pub(crate) fn clean_markup(html: &str) -> String {
    html.trim()
        .replace("&amp;gt;", ">")
        .replace("&amp;lt;", "<")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&amp;", "&")
}

impl EngineInner {
    /// Track each candidate element. Returns the number of bindings
    /// created across the whole pass.
    pub(crate) fn track(&self, elements: &[NodeId]) -> Result<usize, EngineError> {
        let mut created = 0;
        for element in elements {
            created += self.track_element(*element)?;
        }
        Ok(created)
    }

    fn track_element(&self, element: NodeId) -> Result<usize, EngineError> {
        let doc = self.require_document()?;
        if !doc.is_element(element) {
            return Ok(0);
        }
        if !doc.has_attribute(element, INTERACTIVE_ATTRIBUTE) {
            self.logger().debug(&format!(
                "Skipping element {element}: no \"{INTERACTIVE_ATTRIBUTE}\" attribute"
            ));
            return Ok(0);
        }
        if doc.has_attribute(element, REGISTERED_ATTRIBUTE) {
            self.logger()
                .debug(&format!("Skipping element {element}: already registered"));
            return Ok(0);
        }

        let inner = doc.inner_html(element);
        let snippets = extract_snippets(&inner);

        // Processing this element is now committed — mark it before any
        // binding evaluates, so writes below cannot re-track it.
        let count = self.registered_count.get() + 1;
        self.registered_count.set(count);
        doc.set_attribute(element, REGISTERED_ATTRIBUTE, &count.to_string());

        let compiler = self.compiler.borrow().clone();

        // Template bindings. A compile failure aborts the whole pass.
        let mut new_bindings = Vec::new();
        for (occurrence, body) in &snippets {
            let expression = compiler.compile(&clean_markup(body), &["model", "functions"])?;
            new_bindings.push(Rc::new(Binding::new(
                clean_markup(occurrence),
                expression,
                BindingTarget::Content { element },
            )));
        }

        if !new_bindings.is_empty() {
            let mut record_bindings: Vec<Rc<Binding>> = self
                .bindings
                .borrow()
                .iter()
                .filter(|b| b.is_content() && b.element() == element)
                .cloned()
                .collect();
            record_bindings.extend(new_bindings.iter().cloned());
            self.elements.borrow_mut().insert(
                element,
                ElementRecord {
                    blueprint: clean_markup(&inner),
                    bindings: record_bindings,
                },
            );
        }

        self.logger().info(&format!(
            "Found a total of {} new bindings",
            new_bindings.len()
        ));
        self.bindings
            .borrow_mut()
            .extend(new_bindings.iter().cloned());

        // Evaluate all new bindings (registering their dependencies).
        for binding in &new_bindings {
            self.update_binding(binding)?;
        }

        // Attribute conventions — on the element and its (post-render)
        // descendants. The element itself is skipped once detached.
        let mut subnodes = doc.descendants(element);
        if doc.is_attached(element) {
            subnodes.push(element);
        }

        let mut created = new_bindings.len();
        for node in subnodes {
            created += self.track_attributes(&doc, node)?;
        }
        Ok(created)
    }

    /// Classify and compile one element's binding attributes: consuming
    /// (`[name]`) and generating (`@type`). Compile failures here are
    /// isolated per attribute — logged, the rest proceed.
    fn track_attributes(&self, doc: &Rc<Document>, node: NodeId) -> Result<usize, EngineError> {
        let compiler = self.compiler.borrow().clone();
        let mut created = 0;
        for attr in doc.attributes(node) {
            if let Some(event_type) = attr.name.strip_prefix('@') {
                match compiler.compile(&clean_markup(&attr.value), &["model", "functions", "event"])
                {
                    Ok(expression) => {
                        self.logger().debug(&format!(
                            "Registering event listener for \"{event_type}\" with \"{}\"",
                            attr.value
                        ));
                        self.attach_listener(doc, node, event_type, expression);
                    }
                    Err(err) => {
                        self.logger()
                            .error(&format!("Skipping event binding @{event_type}: {err}"));
                    }
                }
            } else if let Some(name) = attr
                .name
                .strip_prefix('[')
                .and_then(|n| n.strip_suffix(']'))
            {
                let expression =
                    match compiler.compile(&clean_markup(&attr.value), &["model", "functions"]) {
                        Ok(expression) => expression,
                        Err(err) => {
                            self.logger()
                                .error(&format!("Skipping attribute binding [{name}]: {err}"));
                            continue;
                        }
                    };
                let tag = doc.tag(node).unwrap_or_default();
                // Property write when a same-named property exists
                // (case-insensitive); the cased name is resolved here,
                // once. Attribute write otherwise.
                let target = match resolve_property(&tag, name) {
                    Some(cased) => BindingTarget::Property {
                        element: node,
                        name: cased.to_string(),
                    },
                    None => BindingTarget::Attribute {
                        element: node,
                        name: name.to_string(),
                    },
                };
                let binding = Rc::new(Binding::new(
                    format!("[{name}]=\"{}\"", attr.value),
                    expression,
                    target,
                ));
                self.bindings.borrow_mut().push(binding.clone());
                created += 1;
                self.update_binding(&binding)?;
            }
        }
        Ok(created)
    }

    /// Attach a native listener whose body evaluates the compiled handler
    /// with `(model, functions, event)`. The listener holds the engine
    /// weakly — a dropped engine turns the handler into a no-op.
    fn attach_listener(
        &self,
        doc: &Rc<Document>,
        node: NodeId,
        event_type: &str,
        expression: Rc<dyn CompiledExpression>,
    ) {
        let weak = self.self_weak.clone();
        doc.add_event_listener(
            node,
            event_type,
            Rc::new(move |event: &Event| {
                let Some(engine) = weak.upgrade() else {
                    return Ok(());
                };
                engine.run_event_handler(&expression, event)
            }),
        );
    }

    /// Evaluate an event-handler expression. Handlers are not
    /// subscribers: their reads register nothing, their writes propagate
    /// synchronously, and evaluation errors propagate to the dispatcher.
    fn run_event_handler(
        &self,
        expression: &Rc<dyn CompiledExpression>,
        event: &Event,
    ) -> tether_types::EvalResult<()> {
        let model = self.model.borrow().clone().ok_or_else(|| {
            tether_types::EvalError::Runtime("no model has been registered".to_string())
        })?;
        let functions = self.functions.borrow().clone();
        let ctx = StoreContext { engine: self };
        expression.call(&ctx, &[model, functions, event.to_value()])?;
        Ok(())
    }
}
