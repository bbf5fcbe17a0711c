//! Element property catalog.
//!
//! Supports the attribute-vs-property write decision: a binding targets a
//! *property* when the element exposes a same-named property (matched
//! case-insensitively, own or inherited), else falls back to an attribute
//! write. The correctly-cased name is resolved once, at binding creation.

/// Properties every HTML element inherits.
const BASE_PROPERTIES: &[&str] = &[
    "innerHTML",
    "textContent",
    "className",
    "id",
    "title",
    "hidden",
    "lang",
    "dir",
    "tabIndex",
];

/// Per-tag own properties, beyond the inherited base set.
fn tag_properties(tag: &str) -> &'static [&'static str] {
    match tag {
        "input" => &["value", "checked", "disabled", "placeholder", "type", "name"],
        "textarea" => &["value", "disabled", "placeholder", "rows", "cols"],
        "select" => &["value", "disabled", "multiple"],
        "option" => &["value", "selected", "disabled"],
        "button" => &["disabled", "type", "name"],
        "img" => &["src", "alt", "width", "height"],
        "a" => &["href", "target", "rel"],
        "form" => &["action", "method", "name"],
        "label" => &["htmlFor"],
        _ => &[],
    }
}

/// Resolve `name` against the element's own and inherited properties,
/// case-insensitively. Returns the correctly-cased property name, or
/// `None` when no such property exists (an attribute write, then).
pub fn resolve_property(tag: &str, name: &str) -> Option<&'static str> {
    tag_properties(tag)
        .iter()
        .chain(BASE_PROPERTIES.iter())
        .find(|p| p.eq_ignore_ascii_case(name))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_match() {
        assert_eq!(resolve_property("div", "innerhtml"), Some("innerHTML"));
        assert_eq!(resolve_property("div", "INNERHTML"), Some("innerHTML"));
        assert_eq!(resolve_property("div", "classname"), Some("className"));
    }

    #[test]
    fn test_tag_specific_properties() {
        assert_eq!(resolve_property("input", "value"), Some("value"));
        assert_eq!(resolve_property("div", "value"), None);
        assert_eq!(resolve_property("img", "SRC"), Some("src"));
    }

    #[test]
    fn test_unknown_names_fall_through() {
        assert_eq!(resolve_property("div", "data-anything"), None);
        assert_eq!(resolve_property("div", "class"), None);
    }
}
