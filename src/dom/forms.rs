use kuchiki::NodeRef;
use url::Url;

use super::element::{attr, has_attr, input_type, is_disabled, is_tag};
use crate::navigation::{FormMethod, FormSubmission};

/// Listed form controls of `form`, in tree order.
pub fn form_controls(form: &NodeRef) -> Vec<NodeRef> {
    form.descendants()
        .filter(|node| {
            is_tag(node, "input")
                || is_tag(node, "select")
                || is_tag(node, "textarea")
                || is_tag(node, "button")
        })
        .collect()
}

/// Current value of a control. Inputs keep their value in the `value` attribute.
pub fn control_value(control: &NodeRef) -> String {
    if is_tag(control, "textarea") {
        return control.text_contents();
    }
    if is_tag(control, "select") {
        return selected_option_value(control).unwrap_or_default();
    }
    if is_tag(control, "input") && matches!(input_type(control).as_str(), "checkbox" | "radio") {
        return attr(control, "value").unwrap_or_else(|| String::from("on"));
    }
    attr(control, "value").unwrap_or_default()
}

pub fn is_checked(control: &NodeRef) -> bool {
    has_attr(control, "checked")
}

fn selected_option_value(select: &NodeRef) -> Option<String> {
    let options: Vec<NodeRef> = select
        .descendants()
        .filter(|node| is_tag(node, "option"))
        .collect();
    let chosen = options
        .iter()
        .find(|option| has_attr(option, "selected"))
        .or_else(|| options.first())?;
    Some(attr(chosen, "value").unwrap_or_else(|| chosen.text_contents().trim().to_string()))
}

fn is_successful(control: &NodeRef) -> bool {
    if is_disabled(control) {
        return false;
    }
    if attr(control, "name").map(|name| name.is_empty()).unwrap_or(true) {
        return false;
    }
    if is_tag(control, "button") {
        return false;
    }
    if is_tag(control, "input") {
        let kind = input_type(control);
        if matches!(
            kind.as_str(),
            "button" | "submit" | "reset" | "file" | "image"
        ) {
            return false;
        }
        if kind == "checkbox" || kind == "radio" {
            return is_checked(control);
        }
    }
    true
}

/// Name/value pairs a submission of `form` would carry.
pub fn form_data(form: &NodeRef) -> Vec<(String, String)> {
    form_controls(form)
        .iter()
        .filter(|control| is_successful(control))
        .filter_map(|control| {
            let name = attr(control, "name")?;
            Some((name, control_value(control)))
        })
        .collect()
}

/// Resolve the form's method and action against the page URL and collect its data.
pub fn build_submission(form: &NodeRef, base_url: &Url) -> Result<FormSubmission, url::ParseError> {
    let method = FormMethod::from_attribute(attr(form, "method").as_deref());
    let action = match attr(form, "action").map(|value| value.trim().to_string()) {
        Some(action) if !action.is_empty() => base_url.join(&action)?,
        _ => base_url.clone(),
    };

    Ok(FormSubmission {
        method,
        action,
        fields: form_data(form),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchiki::traits::*;

    fn form(html: &str) -> NodeRef {
        let document = kuchiki::parse_html().one(html);
        let form = document.select_first("form").expect("form");
        form.as_node().clone()
    }

    #[test]
    fn collects_successful_controls() {
        let form = form(
            r#"<form>
                <input name="q" value="ada">
                <input name="skip" value="x" disabled>
                <input type="checkbox" name="active" checked>
                <input type="checkbox" name="archived">
                <select name="gender"><option value="m">M</option><option value="f" selected>F</option></select>
                <textarea name="notes">hello</textarea>
                <button name="go" value="1">Go</button>
            </form>"#,
        );

        assert_eq!(
            form_data(&form),
            vec![
                ("q".to_string(), "ada".to_string()),
                ("active".to_string(), "on".to_string()),
                ("gender".to_string(), "f".to_string()),
                ("notes".to_string(), "hello".to_string()),
            ]
        );
    }

    #[test]
    fn empty_action_targets_page_url() {
        let form = form(r#"<form method="GET"><input name="q" value="x"></form>"#);
        let base = Url::parse("http://records.local/students/?page=2").unwrap();
        let submission = build_submission(&form, &base).unwrap();
        assert_eq!(submission.method, FormMethod::Get);
        assert_eq!(submission.action, base);
    }

    #[test]
    fn relative_action_resolves() {
        let form = form(r#"<form method="post" action="delete/"></form>"#);
        let base = Url::parse("http://records.local/students/4/").unwrap();
        let submission = build_submission(&form, &base).unwrap();
        assert_eq!(submission.method, FormMethod::Post);
        assert_eq!(
            submission.action.as_str(),
            "http://records.local/students/4/delete/"
        );
    }
}
