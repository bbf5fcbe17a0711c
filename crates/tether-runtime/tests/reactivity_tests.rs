//! Reactive-store and dependency-registry behavior, without DOM markup.

use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use tether_runtime::{Engine, EngineConfig, EngineError, NullLogger, PropertyPath, Value};

fn quiet_engine() -> Engine {
    let engine = Engine::new();
    engine.configure(EngineConfig {
        document: None,
        logger: Some(Rc::new(NullLogger)),
    });
    engine
}

#[test]
fn test_handler_fires_once_with_new_value_before_write_returns() {
    let engine = quiet_engine();
    engine.register(json!({ "value": "abc" }));

    let calls: Rc<RefCell<Vec<(String, String)>>> = Rc::new(RefCell::new(Vec::new()));
    let seen = calls.clone();
    engine.register_handler("value", move |value, path| {
        seen.borrow_mut()
            .push((value.display_string(), path.to_string()));
    });

    engine.set("value", "bcd").unwrap();
    assert_eq!(
        *calls.borrow(),
        vec![("bcd".to_string(), "value".to_string())]
    );
}

#[test]
fn test_handler_fires_on_each_write_no_deduplication() {
    let engine = quiet_engine();
    engine.register(json!({ "value": 0 }));

    let count = Rc::new(RefCell::new(0u32));
    let seen = count.clone();
    engine.register_handler("value", move |_, _| *seen.borrow_mut() += 1);

    engine.set("value", 1).unwrap();
    engine.set("value", 1).unwrap(); // same value — still notified
    engine.set("value", 2).unwrap();
    assert_eq!(*count.borrow(), 3);
}

#[test]
fn test_nested_path_write_notifies_exact_path() {
    let engine = quiet_engine();
    engine.register(json!({ "project": { "settings": { "csv": { "separator": ";" } } } }));

    let calls: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let seen = calls.clone();
    engine.register_handler("project.settings.csv.separator", move |value, _| {
        seen.borrow_mut().push(value.display_string());
    });

    engine.set("project.settings.csv.separator", ",").unwrap();
    assert_eq!(*calls.borrow(), vec![",".to_string()]);

    // A write elsewhere does not touch this handler.
    engine.set("project.settings.csv", json!({ "separator": "\t" })).unwrap();
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn test_lazy_wrapping_on_first_traversing_read() {
    let engine = quiet_engine();
    let model = engine.register(json!({ "nested": { "x": 1 } }));

    // Not wrapped at registration time.
    let Value::Object(root) = model.root().clone() else {
        panic!("expected object root");
    };
    let stored = root.borrow().entries.get("nested").cloned().unwrap();
    assert!(stored.reactive_prefix().is_none());

    // First traversing read wraps it in place.
    let read = model.get("nested").unwrap();
    assert_eq!(read.reactive_prefix(), Some(PropertyPath::new("nested")));

    // Subsequent reads return the same wrapper instance.
    let again = model.get("nested").unwrap();
    assert_eq!(read, again); // container equality is identity
}

#[test]
fn test_written_containers_are_wrapped() {
    let engine = quiet_engine();
    let model = engine.register(json!({}));
    model.set("settings", json!({ "open": true })).unwrap();
    let settings = model.get("settings").unwrap();
    assert_eq!(
        settings.reactive_prefix(),
        Some(PropertyPath::new("settings"))
    );
    // Deep reads keep extending paths.
    assert_eq!(model.get("settings.open").unwrap(), Value::Bool(true));
}

#[test]
fn test_wrapping_keeps_first_path_prefix() {
    // The dependency system is string-keyed: an object reachable under
    // two paths notifies under the path it was first wrapped with.
    let engine = quiet_engine();
    let model = engine.register(json!({ "a": { "x": 1 } }));
    let shared = model.get("a").unwrap();
    model.set("b", shared.clone()).unwrap();
    assert_eq!(
        model.get("b").unwrap().reactive_prefix(),
        Some(PropertyPath::new("a"))
    );
}

#[test]
fn test_list_index_paths() {
    let engine = quiet_engine();
    let model = engine.register(json!({ "rows": [{ "name": "first" }] }));

    let calls: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let seen = calls.clone();
    engine.register_handler("rows.0.name", move |value, _| {
        seen.borrow_mut().push(value.display_string());
    });

    model.set("rows.0.name", "renamed").unwrap();
    assert_eq!(*calls.borrow(), vec!["renamed".to_string()]);
    assert_eq!(model.get("rows.0.name").unwrap(), Value::from("renamed"));
}

#[test]
fn test_depth_first_propagation_within_one_write() {
    // A handler on `a` writes `b`; `b`'s handler must run before the
    // original `set(a)` returns, and before anything queued after it.
    let engine = quiet_engine();
    engine.register(json!({ "a": 0, "b": 0 }));

    let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    let chain = engine.clone();
    let seen = order.clone();
    engine.register_handler("a", move |value, _| {
        seen.borrow_mut().push("a-handler");
        let doubled = value.coerce_number().unwrap_or(0.0) * 2.0;
        chain.set("b", doubled).unwrap();
        seen.borrow_mut().push("a-handler-done");
    });

    let seen = order.clone();
    engine.register_handler("b", move |_, _| {
        seen.borrow_mut().push("b-handler");
    });

    engine.set("a", 3).unwrap();
    assert_eq!(
        *order.borrow(),
        vec!["a-handler", "b-handler", "a-handler-done"]
    );
    assert_eq!(engine.get("b").unwrap(), Value::from(6.0));
}

#[test]
fn test_reset_drops_subscribers_but_handle_keeps_writing() {
    let engine = quiet_engine();
    let model = engine.register(json!({ "value": "abc" }));

    engine.register_handler("value", |_, _| {
        panic!("handler fired even though the engine was reset");
    });

    engine.reset();

    // The wrapped handle still writes raw data; nothing fires.
    model.set("value", "bcd").unwrap();
    assert_eq!(model.get("value").unwrap(), Value::from("bcd"));

    // Engine-level access requires a registered model again.
    assert!(matches!(
        engine.get("value"),
        Err(EngineError::UnregisteredModel)
    ));
}

#[test]
fn test_register_warns_but_replaces_model() {
    let engine = quiet_engine();
    engine.register(json!({ "value": 1 }));
    let replacement = engine.register(json!({ "value": 2 }));
    assert_eq!(replacement.get("value").unwrap(), Value::from(2.0));
    assert_eq!(engine.get("value").unwrap(), Value::from(2.0));
}

#[test]
fn test_handler_reads_subscribe_the_handler() {
    // While a handler runs it is the evaluation context, so model reads
    // it performs register it for further paths.
    let engine = quiet_engine();
    let model = engine.register(json!({ "a": 1, "b": 2 }));

    let count = Rc::new(RefCell::new(0u32));
    let seen = count.clone();
    let reader = model.clone();
    engine.register_handler("a", move |_, _| {
        *seen.borrow_mut() += 1;
        let _ = reader.get("b").unwrap();
    });

    engine.set("a", 10).unwrap(); // fires; reads b → subscribes to b
    assert_eq!(*count.borrow(), 1);
    engine.set("b", 20).unwrap(); // now fires via the b subscription
    assert_eq!(*count.borrow(), 2);
}
