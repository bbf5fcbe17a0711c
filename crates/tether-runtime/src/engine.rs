//! The engine facade and the binding update routine.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use tether_dom::{Document, NodeId};
use tether_expr::{AstCompiler, ExpressionCompiler};
use tether_types::value::FunctionData;
use tether_types::{EvalResult, PropertyPath, Value};

use crate::binding::{Binding, BindingTarget};
use crate::error::EngineError;
use crate::interest::{ChangeHandler, InterestMatrix, Subscriber};
use crate::logger::{Logger, TracingLogger};
use crate::store::StoreContext;
use crate::tracker::{INTERACTIVE_ATTRIBUTE, REGISTERED_ATTRIBUTE};

/// Per-element record: the content blueprint and the content bindings that
/// substitute into it.
#[derive(Clone)]
pub(crate) struct ElementRecord {
    /// The element's original inner HTML, expression occurrences intact.
    pub blueprint: String,
    /// Every content binding sharing this element, in discovery order.
    pub bindings: Vec<Rc<Binding>>,
}

/// Shared engine state. The facade, event listeners, and the model handle
/// all point here; interior mutability keeps every entry point `&self`.
pub(crate) struct EngineInner {
    /// Back-reference to the owning `Rc`, for event-listener closures.
    pub(crate) self_weak: Weak<EngineInner>,
    pub(crate) document: RefCell<Option<Rc<Document>>>,
    pub(crate) logger: RefCell<Rc<dyn Logger>>,
    pub(crate) compiler: RefCell<Rc<dyn ExpressionCompiler>>,
    pub(crate) model: RefCell<Option<Value>>,
    /// The utility-function table, visible to expressions as `functions`.
    /// Never wrapped — reads of it are not dependencies.
    pub(crate) functions: RefCell<Value>,
    pub(crate) bindings: RefCell<Vec<Rc<Binding>>>,
    pub(crate) elements: RefCell<BTreeMap<NodeId, ElementRecord>>,
    pub(crate) interest: RefCell<InterestMatrix>,
    /// The evaluation-context stack: the innermost subscriber currently
    /// evaluating. Reads attribute dependencies to the top entry; push/pop
    /// keeps nested evaluation correct.
    pub(crate) eval_stack: RefCell<Vec<Subscriber>>,
    pub(crate) registered_count: Cell<u64>,
    pub(crate) watching: Cell<bool>,
}

impl EngineInner {
    pub(crate) fn logger(&self) -> Rc<dyn Logger> {
        self.logger.borrow().clone()
    }

    pub(crate) fn require_document(&self) -> Result<Rc<Document>, EngineError> {
        self.document
            .borrow()
            .clone()
            .ok_or(EngineError::MissingDocument)
    }

    // ── The update routine ────────────────────────────────────────────────

    /// Re-evaluate a binding and perform the minimal DOM write.
    ///
    /// Dependency registration happens as a side effect of evaluation:
    /// the binding is pushed onto the evaluation-context stack, so every
    /// tracked read inside the expression subscribes it.
    pub(crate) fn update_binding(&self, binding: &Rc<Binding>) -> Result<(), EngineError> {
        self.logger()
            .debug(&format!("Updating binding \"{}\"...", binding.source()));

        let model = self
            .model
            .borrow()
            .clone()
            .ok_or(EngineError::UnregisteredModel)?;
        let functions = self.functions.borrow().clone();

        let ctx = StoreContext { engine: self };
        self.eval_stack
            .borrow_mut()
            .push(Subscriber::Binding(binding.clone()));
        let result = binding.expression().call(&ctx, &[model, functions]);
        self.eval_stack.borrow_mut().pop();
        let new = result?;

        // The engine's sole caching optimization: primitive/reference
        // equality against the last computed value.
        if binding.cache().as_ref() == Some(&new) {
            return Ok(());
        }
        binding.set_cache(new.clone());

        let doc = self.require_document()?;
        match binding.target() {
            BindingTarget::Content { element } => self.render_content(&doc, *element),
            BindingTarget::Property { element, name } => {
                doc.set_property(*element, name, new);
            }
            BindingTarget::Attribute { element, name } => {
                doc.set_attribute(*element, name, &new.display_string());
            }
        }
        Ok(())
    }

    /// Re-render an element's whole content region: substitute every
    /// content binding's latest cached value into the blueprint and
    /// assign the composed string.
    fn render_content(&self, doc: &Document, element: NodeId) {
        let Some(record) = self.elements.borrow().get(&element).cloned() else {
            return;
        };
        let mut html = record.blueprint.clone();
        for binding in &record.bindings {
            let substitution = binding
                .cache()
                .map(|v| v.display_string())
                .unwrap_or_default();
            html = html.replace(binding.source(), &substitution);
        }
        self.logger().debug(&format!("Inner HTML is set to {html}"));
        doc.set_inner_html(element, &html);
    }

    // ── Notification ──────────────────────────────────────────────────────

    /// Synchronously invoke every subscriber registered for `path`.
    /// Depth-first: a write performed inside a subscriber propagates
    /// completely before the next subscriber runs.
    pub(crate) fn notify(&self, path: &PropertyPath, value: &Value) -> Result<(), EngineError> {
        let subscribers = self.interest.borrow().subscribers(path);
        for subscriber in subscribers {
            match &subscriber {
                Subscriber::Handler(handler) => {
                    self.eval_stack.borrow_mut().push(subscriber.clone());
                    handler.call(value, path.as_str());
                    self.eval_stack.borrow_mut().pop();
                }
                Subscriber::Binding(binding) => self.update_binding(binding)?,
            }
        }
        Ok(())
    }

    // ── Path access ───────────────────────────────────────────────────────

    pub(crate) fn path_get(&self, path: &PropertyPath) -> Result<Value, EngineError> {
        let model = self
            .model
            .borrow()
            .clone()
            .ok_or(EngineError::UnregisteredModel)?;
        self.path_get_from(&model, path)
    }

    pub(crate) fn path_set(&self, path: &PropertyPath, value: Value) -> Result<(), EngineError> {
        let model = self
            .model
            .borrow()
            .clone()
            .ok_or(EngineError::UnregisteredModel)?;
        self.path_set_from(&model, path, value)
    }

    /// Navigate `path` down from `root` with tracked reads.
    pub(crate) fn path_get_from(
        &self,
        root: &Value,
        path: &PropertyPath,
    ) -> Result<Value, EngineError> {
        let ctx = StoreContext { engine: self };
        let mut current = root.clone();
        for segment in path.segments() {
            current = ctx.read_segment(&current, segment)?;
        }
        Ok(current)
    }

    /// Navigate to `path`'s parent from `root` and write the final
    /// segment, notifying subscribers.
    pub(crate) fn path_set_from(
        &self,
        root: &Value,
        path: &PropertyPath,
        value: Value,
    ) -> Result<(), EngineError> {
        let mut segments: Vec<&str> = path.segments().collect();
        let Some(last) = segments.pop() else {
            return Err(EngineError::Evaluation(
                tether_types::EvalError::InvalidAssignment(
                    "cannot assign the root path".to_string(),
                ),
            ));
        };
        let ctx = StoreContext { engine: self };
        let mut current = root.clone();
        for segment in segments {
            current = ctx.read_segment(&current, segment)?;
        }
        ctx.write_segment(&current, last, value)
    }
}

/// Configuration injected before `start`.
#[derive(Default)]
pub struct EngineConfig {
    pub document: Option<Rc<Document>>,
    pub logger: Option<Rc<dyn Logger>>,
}

/// The host-facing engine.
///
/// Cheap to clone — clones share one engine instance.
#[derive(Clone)]
pub struct Engine {
    inner: Rc<EngineInner>,
}

impl Engine {
    pub fn new() -> Self {
        let inner = Rc::new_cyclic(|weak| EngineInner {
            self_weak: weak.clone(),
            document: RefCell::new(None),
            logger: RefCell::new(Rc::new(TracingLogger)),
            compiler: RefCell::new(Rc::new(AstCompiler::new())),
            model: RefCell::new(None),
            functions: RefCell::new(Value::object()),
            bindings: RefCell::new(Vec::new()),
            elements: RefCell::new(BTreeMap::new()),
            interest: RefCell::new(InterestMatrix::new()),
            eval_stack: RefCell::new(Vec::new()),
            registered_count: Cell::new(0),
            watching: Cell::new(false),
        });
        Self { inner }
    }

    /// Inject the target document and/or logger.
    pub fn configure(&self, config: EngineConfig) {
        if let Some(document) = config.document {
            *self.inner.document.borrow_mut() = Some(document);
        }
        if let Some(logger) = config.logger {
            *self.inner.logger.borrow_mut() = logger;
        }
    }

    /// Swap the expression-compilation capability.
    pub fn set_compiler(&self, compiler: Rc<dyn ExpressionCompiler>) {
        *self.inner.compiler.borrow_mut() = compiler;
    }

    /// Wrap and install the root model object. Returns a handle for path
    /// reads and writes. Replacing an already-registered, different root
    /// warns (non-fatal).
    pub fn register(&self, data: impl Into<Value>) -> Model {
        let value = data.into();
        {
            let current = self.inner.model.borrow();
            if let Some(existing) = &*current {
                if *existing != value {
                    self.inner
                        .logger()
                        .warn("By registering a new model, the old model will be overwritten");
                }
            }
        }
        if value.is_container() {
            self.inner.wrap(&value, PropertyPath::root());
        } else {
            self.inner.logger().warn("model root is not an object");
        }
        *self.inner.model.borrow_mut() = Some(value.clone());
        Model {
            root: value,
            engine: self.inner.clone(),
        }
    }

    /// Run the first track pass over every interactive, unregistered
    /// element of the configured document, then arm the mutation watcher.
    pub fn start(&self) -> Result<(), EngineError> {
        let doc = self.inner.require_document()?;
        // Observe insertions from this point on.
        doc.take_mutations();
        self.inner.watching.set(true);
        let candidates: Vec<NodeId> = doc
            .elements_with_attribute(INTERACTIVE_ATTRIBUTE)
            .into_iter()
            .filter(|id| !doc.has_attribute(*id, REGISTERED_ATTRIBUTE))
            .collect();
        self.inner.track(&candidates)?;
        Ok(())
    }

    /// Run the tracker over the given elements. Returns the number of
    /// bindings created.
    pub fn track(&self, elements: &[NodeId]) -> Result<usize, EngineError> {
        self.inner.track(elements)
    }

    /// Process pending insertions through the mutation watcher.
    pub fn flush(&self) -> Result<usize, EngineError> {
        self.inner.flush()
    }

    /// Subscribe a plain callback to a path; invoked with
    /// `(new_value, path)` on every write to it.
    pub fn register_handler(
        &self,
        path: impl Into<PropertyPath>,
        callback: impl Fn(&Value, &str) + 'static,
    ) {
        let subscriber = Subscriber::Handler(Rc::new(ChangeHandler::new(callback)));
        self.inner
            .interest
            .borrow_mut()
            .subscribe(path.into(), subscriber);
    }

    /// Add an entry to the utility-function table visible to compiled
    /// expressions as the `functions` parameter.
    pub fn register_function(
        &self,
        name: &str,
        f: impl Fn(Vec<Value>) -> EvalResult<Value> + 'static,
    ) {
        let functions = self.inner.functions.borrow().clone();
        if let Value::Object(table) = &functions {
            if table.borrow().entries.contains_key(name) {
                self.inner
                    .logger()
                    .warn(&format!("utility function \"{name}\" is being overwritten"));
            }
            table.borrow_mut().entries.insert(
                name.to_string(),
                Value::Function(Rc::new(FunctionData::new(name, f))),
            );
        }
    }

    /// Read a model value by path. Untracked (host-side reads are not
    /// dependencies).
    pub fn get(&self, path: impl Into<PropertyPath>) -> Result<Value, EngineError> {
        self.inner.path_get(&path.into())
    }

    /// Write a model value by path, notifying subscribers synchronously.
    pub fn set(
        &self,
        path: impl Into<PropertyPath>,
        value: impl Into<Value>,
    ) -> Result<(), EngineError> {
        self.inner.path_set(&path.into(), value.into())
    }

    /// Clear the model reference, dependency registry, binding list,
    /// per-element records, and registration counter; disarm the watcher
    /// and drop the document reference. The utility-function table
    /// survives, as do configured loggers.
    pub fn reset(&self) {
        *self.inner.model.borrow_mut() = None;
        self.inner.interest.borrow_mut().clear();
        self.inner.bindings.borrow_mut().clear();
        self.inner.elements.borrow_mut().clear();
        self.inner.eval_stack.borrow_mut().clear();
        self.inner.registered_count.set(0);
        self.inner.watching.set(false);
        *self.inner.document.borrow_mut() = None;
    }

    /// Number of live bindings. Diagnostic.
    pub fn binding_count(&self) -> usize {
        self.inner.bindings.borrow().len()
    }

    /// Paths with at least one subscriber. Diagnostic.
    pub fn watched_paths(&self) -> Vec<PropertyPath> {
        self.inner.interest.borrow().paths()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to the registered model: explicit `get(path)` / `set(path,
/// value)` over the wrapped object graph. Writes notify subscribers
/// exactly like writes performed inside expressions.
#[derive(Clone)]
pub struct Model {
    root: Value,
    engine: Rc<EngineInner>,
}

impl Model {
    /// The wrapped root value.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Read by path. Works off the handle's own root, so the handle
    /// survives an engine reset (writes simply stop notifying).
    pub fn get(&self, path: impl Into<PropertyPath>) -> Result<Value, EngineError> {
        self.engine.path_get_from(&self.root, &path.into())
    }

    /// Write by path, notifying whatever subscribers the engine currently
    /// holds for it.
    pub fn set(
        &self,
        path: impl Into<PropertyPath>,
        value: impl Into<Value>,
    ) -> Result<(), EngineError> {
        self.engine.path_set_from(&self.root, &path.into(), value.into())
    }
}
