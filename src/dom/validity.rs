//! Native constraint validation, the subset `form.checkValidity()` needs for
//! server-rendered CRUD forms.

use std::sync::OnceLock;

use kuchiki::NodeRef;
use regex::Regex;
use serde::Serialize;

use super::element::{attr, describe, has_attr, input_type, is_disabled, is_tag};
use super::forms::{control_value, form_controls, is_checked};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityIssue {
    ValueMissing,
    TypeMismatch,
    TooShort,
    TooLong,
    PatternMismatch,
    RangeUnderflow,
    RangeOverflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidControl {
    pub control: String,
    pub issue: ValidityIssue,
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .expect("valid email pattern")
    })
}

fn input_supports_required(kind: &str) -> bool {
    !matches!(
        kind,
        "hidden" | "range" | "color" | "button" | "submit" | "reset" | "image"
    )
}

fn supports_pattern(kind: &str) -> bool {
    matches!(
        kind,
        "text" | "search" | "tel" | "url" | "email" | "password"
    )
}

fn is_text_entry(control: &NodeRef) -> bool {
    is_tag(control, "textarea")
        || (is_tag(control, "input")
            && matches!(
                input_type(control).as_str(),
                "text" | "search" | "tel" | "url" | "email" | "password"
            ))
}

/// True when a radio in the same group (same form, same name) is checked.
fn radio_group_checked(control: &NodeRef, controls: &[NodeRef]) -> bool {
    if is_checked(control) {
        return true;
    }
    let Some(name) = attr(control, "name").filter(|name| !name.is_empty()) else {
        return false;
    };
    controls.iter().any(|candidate| {
        is_tag(candidate, "input")
            && input_type(candidate) == "radio"
            && attr(candidate, "name").as_deref() == Some(name.as_str())
            && is_checked(candidate)
    })
}

fn value_missing(control: &NodeRef, controls: &[NodeRef]) -> bool {
    if !has_attr(control, "required") {
        return false;
    }
    if is_tag(control, "input") {
        let kind = input_type(control);
        if !input_supports_required(&kind) {
            return false;
        }
        return match kind.as_str() {
            "checkbox" => !is_checked(control),
            "radio" => !radio_group_checked(control, controls),
            _ => control_value(control).is_empty(),
        };
    }
    if is_tag(control, "select") || is_tag(control, "textarea") {
        return control_value(control).is_empty();
    }
    false
}

fn type_mismatch(control: &NodeRef, value: &str) -> bool {
    if !is_tag(control, "input") || value.is_empty() {
        return false;
    }
    match input_type(control).as_str() {
        "email" => {
            if has_attr(control, "multiple") {
                value
                    .split(',')
                    .any(|address| !email_regex().is_match(address.trim()))
            } else {
                !email_regex().is_match(value)
            }
        }
        "url" => url::Url::parse(value).is_err(),
        _ => false,
    }
}

fn length_limit(control: &NodeRef, name: &str) -> Option<usize> {
    attr(control, name).and_then(|raw| raw.trim().parse::<usize>().ok())
}

fn pattern_mismatch(control: &NodeRef, value: &str) -> bool {
    if !is_tag(control, "input") || value.is_empty() || !supports_pattern(&input_type(control)) {
        return false;
    }
    let Some(pattern) = attr(control, "pattern") else {
        return false;
    };
    // An uncompilable pattern is ignored rather than blocking the form.
    match Regex::new(&format!("^(?:{pattern})$")) {
        Ok(regex) => !regex.is_match(value),
        Err(_) => false,
    }
}

fn numeric_bound(control: &NodeRef, name: &str) -> Option<f64> {
    attr(control, name).and_then(|raw| raw.trim().parse::<f64>().ok())
}

/// First failing constraint of a single control, if any.
pub fn control_validity(control: &NodeRef, controls: &[NodeRef]) -> Option<ValidityIssue> {
    if is_disabled(control) {
        return None;
    }
    if is_tag(control, "input") && input_type(control) == "hidden" {
        return None;
    }
    if is_tag(control, "button") {
        return None;
    }

    if value_missing(control, controls) {
        return Some(ValidityIssue::ValueMissing);
    }

    let value = control_value(control);
    if type_mismatch(control, &value) {
        return Some(ValidityIssue::TypeMismatch);
    }

    if is_text_entry(control) && !value.is_empty() {
        let length = value.chars().count();
        if length_limit(control, "minlength").is_some_and(|min| length < min) {
            return Some(ValidityIssue::TooShort);
        }
        if length_limit(control, "maxlength").is_some_and(|max| length > max) {
            return Some(ValidityIssue::TooLong);
        }
    }

    if pattern_mismatch(control, &value) {
        return Some(ValidityIssue::PatternMismatch);
    }

    if is_tag(control, "input") && input_type(control) == "number" {
        if let Ok(number) = value.trim().parse::<f64>() {
            if numeric_bound(control, "min").is_some_and(|min| number < min) {
                return Some(ValidityIssue::RangeUnderflow);
            }
            if numeric_bound(control, "max").is_some_and(|max| number > max) {
                return Some(ValidityIssue::RangeOverflow);
            }
        }
    }

    None
}

pub fn invalid_controls(form: &NodeRef) -> Vec<InvalidControl> {
    let controls = form_controls(form);
    controls
        .iter()
        .filter_map(|control| {
            control_validity(control, &controls).map(|issue| InvalidControl {
                control: describe(control),
                issue,
            })
        })
        .collect()
}

/// Equivalent of `form.checkValidity()`; ignores `novalidate` just like the DOM API.
pub fn check_validity(form: &NodeRef) -> bool {
    let controls = form_controls(form);
    controls
        .iter()
        .all(|control| control_validity(control, &controls).is_none())
}
