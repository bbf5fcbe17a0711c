//! Bindings: one compiled expression tied to one DOM location.

use std::cell::RefCell;
use std::rc::Rc;
use tether_dom::NodeId;
use tether_expr::CompiledExpression;
use tether_types::Value;

/// Where a binding writes.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingTarget {
    /// A `{{ }}` occurrence inside the element's content region. All
    /// content bindings of one element re-render the whole region
    /// together, composed from the element's blueprint.
    Content { element: NodeId },
    /// An element attribute (no same-named property exists).
    Attribute { element: NodeId, name: String },
    /// An element property; `name` is the correctly-cased property name,
    /// resolved once at binding creation.
    Property { element: NodeId, name: String },
}

impl BindingTarget {
    /// The element this target writes to.
    pub fn element(&self) -> NodeId {
        match self {
            Self::Content { element }
            | Self::Attribute { element, .. }
            | Self::Property { element, .. } => *element,
        }
    }
}

/// One compiled expression attached to one DOM location, with the cached
/// last-computed value. Created during a track pass; destroyed only by a
/// whole-engine reset.
pub struct Binding {
    /// The source occurrence as found in markup (`{{ model.value }}` for
    /// content bindings — the exact string blueprint substitution
    /// replaces).
    source: String,
    expression: Rc<dyn CompiledExpression>,
    target: BindingTarget,
    /// Last computed value. `None` until first evaluation.
    cache: RefCell<Option<Value>>,
}

impl Binding {
    pub fn new(
        source: impl Into<String>,
        expression: Rc<dyn CompiledExpression>,
        target: BindingTarget,
    ) -> Self {
        Self {
            source: source.into(),
            expression,
            target,
            cache: RefCell::new(None),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> &Rc<dyn CompiledExpression> {
        &self.expression
    }

    pub fn target(&self) -> &BindingTarget {
        &self.target
    }

    pub fn element(&self) -> NodeId {
        self.target.element()
    }

    /// The cached last value, if the binding has been evaluated.
    pub fn cache(&self) -> Option<Value> {
        self.cache.borrow().clone()
    }

    pub fn set_cache(&self, value: Value) {
        *self.cache.borrow_mut() = Some(value);
    }

    pub fn is_content(&self) -> bool {
        matches!(self.target, BindingTarget::Content { .. })
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("cache", &self.cache.borrow())
            .finish()
    }
}
