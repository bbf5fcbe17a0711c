//! DOM events.

use tether_types::Value;

use crate::node::NodeId;

/// A dispatched event. Minimal on purpose: a type and the element it was
/// dispatched on.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub target: Option<NodeId>,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            target: None,
        }
    }

    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target = Some(target);
        self
    }

    /// The shape handler expressions see as their `event` parameter:
    /// `{ type, target }`, with `target` as the element's arena index.
    pub fn to_value(&self) -> Value {
        let obj = Value::object();
        if let Value::Object(o) = &obj {
            let mut data = o.borrow_mut();
            data.entries
                .insert("type".to_string(), Value::String(self.event_type.clone()));
            data.entries.insert(
                "target".to_string(),
                match self.target {
                    Some(id) => Value::Number(id.index() as f64),
                    None => Value::Null,
                },
            );
        }
        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_value_shape() {
        let value = Event::new("click").to_value();
        let Value::Object(o) = &value else {
            panic!("expected object");
        };
        let data = o.borrow();
        assert_eq!(data.entries.get("type"), Some(&Value::String("click".into())));
        assert_eq!(data.entries.get("target"), Some(&Value::Null));
    }
}
