//! End-to-end engine tests: tracking, rendering, events, the watcher.

use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use tether_runtime::{
    Document, Engine, EngineConfig, EngineError, EvalError, Event, NodeId, NullLogger, Value,
};

fn setup(html: &str) -> (Engine, Rc<Document>) {
    let doc = Rc::new(Document::from_body_html(html));
    let engine = Engine::new();
    engine.configure(EngineConfig {
        document: Some(doc.clone()),
        logger: Some(Rc::new(NullLogger)),
    });
    (engine, doc)
}

fn by_id(doc: &Document, id: &str) -> NodeId {
    doc.elements()
        .into_iter()
        .find(|e| doc.attribute(*e, "id").as_deref() == Some(id))
        .unwrap_or_else(|| panic!("no element with id {id}"))
}

#[test]
fn test_rendered_class_follows_model() {
    let (engine, doc) = setup(
        r#"<div interactive id="outer"><div class="{{ model.value }}"></div></div><p interactive id="static">untouched</p>"#,
    );
    engine.register(json!({ "value": "abc" }));
    engine.start().unwrap();

    let outer = by_id(&doc, "outer");
    assert_eq!(doc.inner_html(outer), r#"<div class="abc"></div>"#);

    engine.set("value", "bcd").unwrap();
    assert_eq!(doc.inner_html(outer), r#"<div class="bcd"></div>"#);

    // No other node changed.
    assert_eq!(doc.inner_html(by_id(&doc, "static")), "untouched");
}

#[test]
fn test_property_binding_from_attribute_markup() {
    let (engine, doc) = setup(r#"<div interactive id="test" [innerHTML]="model.value.toUpperCase()"></div>"#);
    engine.register(json!({ "value": "abc" }));
    engine.start().unwrap();
    assert_eq!(doc.inner_html(by_id(&doc, "test")), "ABC");
}

#[test]
fn test_property_name_resolution_is_case_insensitive() {
    let (engine, doc) = setup(r#"<input interactive id="field" [Value]="model.value">"#);
    engine.register(json!({ "value": "abc" }));
    engine.start().unwrap();

    let field = by_id(&doc, "field");
    // Resolved to the `value` property, not an attribute.
    assert_eq!(doc.property(field, "value"), Some(Value::from("abc")));
    assert_eq!(doc.attribute(field, "Value"), None);
    assert_eq!(doc.attribute(field, "value"), None);
}

#[test]
fn test_unknown_names_bind_as_attributes() {
    let (engine, doc) = setup(r#"<div interactive id="card" [data-state]="model.state"></div>"#);
    engine.register(json!({ "state": "open" }));
    engine.start().unwrap();
    assert_eq!(
        doc.attribute(by_id(&doc, "card"), "data-state").as_deref(),
        Some("open")
    );
}

#[test]
fn test_click_increments_and_renders_before_dispatch_returns() {
    let (engine, doc) = setup(
        r#"<div interactive id="counter">{{ model.value }}</div><div interactive><button id="btn" @click="model.value++">+</button></div>"#,
    );
    engine.register(json!({ "value": 0 }));
    engine.start().unwrap();

    let counter = by_id(&doc, "counter");
    let btn = by_id(&doc, "btn");
    assert_eq!(doc.text_content(counter), "0");

    doc.dispatch(btn, &Event::new("click")).unwrap();
    assert_eq!(doc.text_content(counter), "1");

    doc.dispatch(btn, &Event::new("click")).unwrap();
    assert_eq!(doc.text_content(counter), "2");
    assert_eq!(engine.get("value").unwrap(), Value::from(2.0));
}

#[test]
fn test_double_track_creates_no_new_bindings() {
    let (engine, doc) = setup(r#"<div interactive id="a">{{ model.value }}</div>"#);
    engine.register(json!({ "value": "x" }));
    engine.start().unwrap();

    let before = engine.binding_count();
    let elements = doc.elements();
    assert_eq!(engine.track(&elements).unwrap(), 0);
    assert_eq!(engine.binding_count(), before);
}

#[test]
fn test_cache_hit_skips_dom_write() {
    let (engine, doc) = setup(r#"<div interactive>{{ model.a > 0 ? model.b : 'none' }}</div>"#);
    engine.register(json!({ "a": 1, "b": "q" }));
    engine.start().unwrap();

    let nodes_after_start = doc.node_count();
    // Re-evaluates (a is a dependency) but produces the same value, so
    // no content is re-rendered and no nodes are created.
    engine.set("a", 2).unwrap();
    assert_eq!(doc.node_count(), nodes_after_start);

    // A value change does write.
    engine.set("b", "r").unwrap();
    assert!(doc.node_count() > nodes_after_start);
}

#[test]
fn test_binding_on_two_paths_reevaluates_once_per_write() {
    let (engine, _doc) = setup(r#"<div interactive>{{ functions.count(model.a + model.b) }}</div>"#);
    let evaluations = Rc::new(RefCell::new(0u32));
    let seen = evaluations.clone();
    engine.register_function("count", move |args| {
        *seen.borrow_mut() += 1;
        Ok(args.into_iter().next().unwrap_or(Value::Null))
    });
    engine.register(json!({ "a": 1, "b": 2 }));
    engine.start().unwrap();
    assert_eq!(*evaluations.borrow(), 1);

    engine.set("a", 10).unwrap();
    assert_eq!(*evaluations.borrow(), 2);

    engine.set("b", 20).unwrap();
    assert_eq!(*evaluations.borrow(), 3);
}

#[test]
fn test_duplicate_reads_subscribe_once() {
    let (engine, _doc) = setup(r#"<div interactive>{{ functions.count(model.value + model.value) }}</div>"#);
    let evaluations = Rc::new(RefCell::new(0u32));
    let seen = evaluations.clone();
    engine.register_function("count", move |args| {
        *seen.borrow_mut() += 1;
        Ok(args.into_iter().next().unwrap_or(Value::Null))
    });
    engine.register(json!({ "value": 1 }));
    engine.start().unwrap();
    assert_eq!(*evaluations.borrow(), 1);

    // One write, one re-evaluation — not one per read occurrence.
    engine.set("value", 2).unwrap();
    assert_eq!(*evaluations.borrow(), 2);
}

#[test]
fn test_nested_evaluation_keeps_outer_context() {
    // While the main view evaluates, its utility call writes `other`,
    // re-entering evaluation of the other view. Reads performed after
    // the nested evaluation returns must still belong to the main view.
    let (engine, doc) = setup(
        r#"<div interactive id="other-view">{{ model.other }}</div><div interactive id="main-view">{{ functions.touch() + model.tail }}</div>"#,
    );
    let writer = engine.clone();
    engine.register_function("touch", move |_args| {
        writer
            .set("other", 7)
            .map_err(|e| EvalError::Native(e.to_string()))?;
        Ok(Value::from(1.0))
    });
    engine.register(json!({ "other": 5, "tail": 2 }));
    engine.start().unwrap();

    let main_view = by_id(&doc, "main-view");
    let other_view = by_id(&doc, "other-view");
    assert_eq!(doc.text_content(main_view), "3");
    assert_eq!(doc.text_content(other_view), "7");

    // `tail` was read after the nested evaluation — the main view must
    // have been subscribed to it.
    engine.set("tail", 10).unwrap();
    assert_eq!(doc.text_content(main_view), "11");

    // And the main view never read `other`, so it must not re-render.
    engine.set("other", 99).unwrap();
    assert_eq!(doc.text_content(other_view), "99");
    assert_eq!(doc.text_content(main_view), "11");
}

#[test]
fn test_watcher_tracks_inserted_elements_on_flush() {
    let (engine, doc) = setup(r#"<div id="host"></div>"#);
    engine.register(json!({ "value": "abc" }));
    engine.start().unwrap();
    let before = engine.binding_count();

    let host = by_id(&doc, "host");
    doc.set_inner_html(host, r#"<div interactive id="late">{{ model.value }}</div>"#);

    // Not yet tracked — the watcher has not run.
    assert_eq!(engine.binding_count(), before);
    assert_eq!(doc.text_content(by_id(&doc, "late")), "{{ model.value }}");

    let created = engine.flush().unwrap();
    assert_eq!(created, 1);
    assert_eq!(doc.text_content(by_id(&doc, "late")), "abc");

    // Reactive from then on.
    engine.set("value", "bcd").unwrap();
    assert_eq!(doc.text_content(by_id(&doc, "late")), "bcd");
}

#[test]
fn test_template_compile_error_aborts_track_pass() {
    let (engine, _doc) = setup(r#"<div interactive>{{ model.value + }}</div>"#);
    engine.register(json!({ "value": 1 }));
    assert!(matches!(engine.start(), Err(EngineError::Compile(_))));
}

#[test]
fn test_attribute_compile_error_is_isolated() {
    let (engine, doc) = setup(r#"<div interactive id="card" [class]="model.(" [title]="model.value"></div>"#);
    engine.register(json!({ "value": "abc" }));
    engine.start().unwrap();

    let card = by_id(&doc, "card");
    // The broken binding was skipped; its sibling still applied.
    assert_eq!(doc.attribute(card, "title").as_deref(), Some("abc"));
    assert_eq!(doc.attribute(card, "class"), None);
}

#[test]
fn test_event_compile_error_is_isolated() {
    let (engine, doc) = setup(
        r#"<div interactive><button id="btn" @click="model.)">x</button><span id="view">{{ model.value }}</span></div>"#,
    );
    engine.register(json!({ "value": "ok" }));
    engine.start().unwrap();

    // Template binding on the same pass still rendered.
    assert_eq!(doc.text_content(by_id(&doc, "view")), "ok");
    // The broken handler was never attached.
    doc.dispatch(by_id(&doc, "btn"), &Event::new("click")).unwrap();
}

#[test]
fn test_evaluation_error_propagates_from_write() {
    let (engine, _doc) = setup(r#"<div interactive>{{ model.a.b }}</div>"#);
    engine.register(json!({ "a": { "b": 1 } }));
    engine.start().unwrap();

    let err = engine.set("a", Value::Null).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Evaluation(EvalError::NullAccess(_))
    ));
}

#[test]
fn test_start_without_model_is_fatal() {
    let (engine, _doc) = setup(r#"<div interactive>{{ model.value }}</div>"#);
    assert!(matches!(
        engine.start(),
        Err(EngineError::UnregisteredModel)
    ));
}

#[test]
fn test_start_without_document_is_an_error() {
    let engine = Engine::new();
    engine.configure(EngineConfig {
        document: None,
        logger: Some(Rc::new(NullLogger)),
    });
    engine.register(json!({}));
    assert!(matches!(engine.start(), Err(EngineError::MissingDocument)));
}

#[test]
fn test_reset_and_reregister_behaves_fresh() {
    let (engine, doc) = setup(r#"<div interactive id="view">{{ model.value }}</div>"#);
    engine.register(json!({ "value": "first" }));
    engine.start().unwrap();
    assert_eq!(doc.text_content(by_id(&doc, "view")), "first");

    let fired = Rc::new(RefCell::new(false));
    let seen = fired.clone();
    engine.register_handler("value", move |_, _| *seen.borrow_mut() = true);

    engine.reset();
    assert_eq!(engine.binding_count(), 0);
    assert!(engine.watched_paths().is_empty());

    // Fresh document, same model shape: works like a new engine, and no
    // residual subscriber fires.
    let doc2 = Rc::new(Document::from_body_html(
        r#"<div interactive id="view">{{ model.value }}</div>"#,
    ));
    engine.configure(EngineConfig {
        document: Some(doc2.clone()),
        logger: Some(Rc::new(NullLogger)),
    });
    engine.register(json!({ "value": "second" }));
    engine.start().unwrap();
    assert_eq!(doc2.text_content(by_id(&doc2, "view")), "second");

    engine.set("value", "third").unwrap();
    assert_eq!(doc2.text_content(by_id(&doc2, "view")), "third");
    assert!(!*fired.borrow());
}

#[test]
fn test_utility_functions_in_template_bindings() {
    let (engine, doc) = setup(r#"<div interactive id="view">{{ functions.shout(model.name) }}</div>"#);
    engine.register_function("shout", |args| {
        let s = args.first().map(|v| v.display_string()).unwrap_or_default();
        Ok(Value::String(format!("{}!", s.to_uppercase())))
    });
    engine.register(json!({ "name": "ada" }));
    engine.start().unwrap();
    assert_eq!(doc.text_content(by_id(&doc, "view")), "ADA!");
}

#[test]
fn test_event_handler_receives_event_object() {
    let (engine, doc) = setup(
        r#"<div interactive><button id="btn" @click="model.last = event.type">x</button></div>"#,
    );
    engine.register(json!({ "last": "" }));
    engine.start().unwrap();

    doc.dispatch(by_id(&doc, "btn"), &Event::new("click")).unwrap();
    assert_eq!(engine.get("last").unwrap(), Value::from("click"));
}

#[test]
fn test_multiple_bindings_share_one_element() {
    let (engine, doc) = setup(r#"<div interactive id="view">{{ model.first }} and {{ model.second }}</div>"#);
    engine.register(json!({ "first": "a", "second": "b" }));
    engine.start().unwrap();

    let view = by_id(&doc, "view");
    assert_eq!(doc.text_content(view), "a and b");

    // One binding changing re-renders the whole region with each
    // binding's own latest value.
    engine.set("first", "A").unwrap();
    assert_eq!(doc.text_content(view), "A and b");
    engine.set("second", "B").unwrap();
    assert_eq!(doc.text_content(view), "A and B");
}

#[test]
fn test_escaped_operators_in_template_source() {
    // Serialization entity-escapes `>` inside text; cleaning restores it
    // before compilation and substitution.
    let (engine, doc) = setup(r#"<div interactive id="view">{{ model.a > model.b ? 'yes' : 'no' }}</div>"#);
    engine.register(json!({ "a": 2, "b": 1 }));
    engine.start().unwrap();
    assert_eq!(doc.text_content(by_id(&doc, "view")), "yes");

    engine.set("a", 0).unwrap();
    assert_eq!(doc.text_content(by_id(&doc, "view")), "no");
}

#[test]
fn test_non_interactive_subtrees_are_ignored() {
    let (engine, doc) = setup(r#"<div id="plain">{{ model.value }}</div>"#);
    engine.register(json!({ "value": "abc" }));
    engine.start().unwrap();
    assert_eq!(engine.binding_count(), 0);
    assert_eq!(doc.text_content(by_id(&doc, "plain")), "{{ model.value }}");
}
