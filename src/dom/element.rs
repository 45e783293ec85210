use kuchiki::NodeRef;

/// Lower-cased local name of an element node, `None` for text/comment/document nodes.
pub fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element()
        .map(|element| AsRef::<str>::as_ref(&element.name.local).to_ascii_lowercase())
}

pub fn is_tag(node: &NodeRef, tag: &str) -> bool {
    node.as_element()
        .map(|element| AsRef::<str>::as_ref(&element.name.local).eq_ignore_ascii_case(tag))
        .unwrap_or(false)
}

pub fn attr(node: &NodeRef, name: &str) -> Option<String> {
    let element = node.as_element()?;
    let attributes = element.attributes.borrow();
    attributes.get(name).map(str::to_string)
}

pub fn has_attr(node: &NodeRef, name: &str) -> bool {
    node.as_element()
        .map(|element| element.attributes.borrow().contains(name))
        .unwrap_or(false)
}

pub fn classes(node: &NodeRef) -> Vec<String> {
    attr(node, "class")
        .map(|value| value.split_ascii_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn has_class(node: &NodeRef, class: &str) -> bool {
    attr(node, "class")
        .map(|value| value.split_ascii_whitespace().any(|token| token == class))
        .unwrap_or(false)
}

/// The `type` of an `<input>`, lower-cased, defaulting to `text` like the parser does.
pub fn input_type(node: &NodeRef) -> String {
    attr(node, "type")
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "text".to_string())
}

/// Disabled controls are those carrying `disabled` themselves or sitting inside a
/// disabled `<fieldset>`.
pub fn is_disabled(node: &NodeRef) -> bool {
    if has_attr(node, "disabled") {
        return true;
    }
    node.ancestors()
        .any(|ancestor| is_tag(&ancestor, "fieldset") && has_attr(&ancestor, "disabled"))
}

pub fn closest_form(node: &NodeRef) -> Option<NodeRef> {
    node.inclusive_ancestors()
        .find(|ancestor| is_tag(ancestor, "form"))
}

pub fn is_submit_control(node: &NodeRef) -> bool {
    if is_tag(node, "button") {
        return attr(node, "type")
            .map(|kind| kind.trim().eq_ignore_ascii_case("submit"))
            .unwrap_or(true);
    }
    if is_tag(node, "input") {
        return matches!(input_type(node).as_str(), "submit" | "image");
    }
    false
}

/// Elements whose unprevented click triggers a default action.
pub fn is_activatable(node: &NodeRef) -> bool {
    (is_tag(node, "a") && has_attr(node, "href")) || is_submit_control(node)
}

/// Short CSS-like label (`tr#row-1.active`) used in logs and mutation records.
pub fn describe(node: &NodeRef) -> String {
    let Some(tag) = tag_name(node) else {
        return String::from("#document");
    };

    let mut label = tag;
    if let Some(id) = attr(node, "id").filter(|id| !id.is_empty()) {
        label.push('#');
        label.push_str(&id);
    }
    for class in classes(node) {
        label.push('.');
        label.push_str(&class);
    }
    label
}

pub(crate) fn set_attr_raw(node: &NodeRef, name: &str, value: &str) -> bool {
    let Some(element) = node.as_element() else {
        return false;
    };
    let mut attributes = element.attributes.borrow_mut();
    if attributes.get(name) == Some(value) {
        return false;
    }
    attributes.insert(name, value.to_string());
    true
}

pub(crate) fn remove_attr_raw(node: &NodeRef, name: &str) -> bool {
    node.as_element()
        .map(|element| element.attributes.borrow_mut().remove(name).is_some())
        .unwrap_or(false)
}

/// Set one declaration inside an inline `style` value, keeping the others in order.
pub(crate) fn merge_style(existing: &str, property: &str, value: &str) -> String {
    let mut declarations: Vec<(String, String)> = existing
        .split(';')
        .filter_map(|declaration| {
            let (name, val) = declaration.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_ascii_lowercase(), val.trim().to_string()))
        })
        .collect();

    match declarations
        .iter_mut()
        .find(|(name, _)| name.eq_ignore_ascii_case(property))
    {
        Some(entry) => entry.1 = value.to_string(),
        None => declarations.push((property.to_ascii_lowercase(), value.to_string())),
    }

    declarations
        .iter()
        .map(|(name, val)| format!("{name}: {val};"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchiki::traits::*;

    // Parents are weak links, so the document has to outlive the node.
    fn first(html: &str, selector: &str) -> (NodeRef, NodeRef) {
        let document = kuchiki::parse_html().one(html);
        let found = document.select_first(selector).expect("element");
        let node = found.as_node().clone();
        (document, node)
    }

    #[test]
    fn describes_elements() {
        let (_document, node) = first(
            r#"<table><tbody><tr id="row-1" class="active odd"><td>x</td></tr></tbody></table>"#,
            "tr",
        );
        assert_eq!(describe(&node), "tr#row-1.active.odd");
    }

    #[test]
    fn button_defaults_to_submit() {
        let (_document, plain) = first("<form><button>Go</button></form>", "button");
        assert!(is_submit_control(&plain));

        let (_other, reset) = first(r#"<form><button type="button">Go</button></form>"#, "button");
        assert!(!is_submit_control(&reset));
    }

    #[test]
    fn fieldset_disables_descendants() {
        let (_document, input) = first(
            r#"<form><fieldset disabled><input name="q"></fieldset></form>"#,
            "input",
        );
        assert!(is_disabled(&input));
    }

    #[test]
    fn enabled_fieldset_leaves_controls_enabled() {
        let (_document, input) = first(
            r#"<form><fieldset><input name="q"></fieldset></form>"#,
            "input",
        );
        assert!(!is_disabled(&input));
        assert_eq!(tag_name(&input).as_deref(), Some("input"));
        assert!(is_tag(&input, "INPUT"));
    }

    #[test]
    fn merges_style_declarations() {
        assert_eq!(merge_style("", "cursor", "pointer"), "cursor: pointer;");
        assert_eq!(
            merge_style("color: red; cursor: default", "cursor", "pointer"),
            "color: red; cursor: pointer;"
        );
    }
}
