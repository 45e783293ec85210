//! The individual behaviors. Each takes the elements it works on explicitly so it
//! can be exercised against a hand-built fragment.

use std::rc::Rc;
use std::time::Duration;

use keyboard_types::Key;
use kuchiki::NodeRef;
use tracing::debug;

use crate::components::ComponentLibrary;
use crate::confirm::ConfirmProvider;
use crate::dom::element::{attr, describe, is_tag};
use crate::dom::events::EventKind;
use crate::dom::{validity, Page, PageError};

/// Close every alert once `delay` has passed. Returns how many were scheduled.
pub fn schedule_alert_dismissal(
    page: &Page,
    alerts: &[NodeRef],
    delay: Duration,
    components: Rc<dyn ComponentLibrary>,
) -> usize {
    for alert in alerts {
        let alert = alert.clone();
        let components = Rc::clone(&components);
        page.set_timeout(delay, move |page| components.close_alert(page, &alert));
    }
    alerts.len()
}

pub fn activate_tooltips(page: &Page, elements: &[NodeRef], components: &dyn ComponentLibrary) -> usize {
    for element in elements {
        components.attach_tooltip(page, element);
    }
    elements.len()
}

pub fn activate_popovers(page: &Page, elements: &[NodeRef], components: &dyn ComponentLibrary) -> usize {
    for element in elements {
        components.attach_popover(page, element);
    }
    elements.len()
}

/// Block submission of an invalid form and mark it as validated on every attempt.
pub fn bind_validation_gate(page: &Page, form: &NodeRef, validated_class: &str) {
    let gated = form.clone();
    let validated_class = validated_class.to_string();
    page.add_event_listener(form, EventKind::Submit, move |page, event| {
        if !validity::check_validity(&gated) {
            debug!(
                target = "enhancer",
                form = %describe(&gated),
                invalid = ?validity::invalid_controls(&gated),
                "blocking invalid form"
            );
            event.prevent_default();
            event.stop_propagation();
        }
        page.add_class(&gated, &validated_class);
    });
}

/// Submit a GET form when Enter is released in its first text input. Returns
/// false when the form has no such input.
pub fn bind_search_submit(page: &Page, form: &NodeRef, input_selector: &str) -> Result<bool, PageError> {
    let Some(input) = page.select_within(form, input_selector)?.into_iter().next() else {
        return Ok(false);
    };

    let search_form = form.clone();
    page.add_event_listener(&input, EventKind::KeyUp, move |page, event| {
        if event.key() == Some(&Key::Enter) {
            page.submit_form(&search_form);
        }
    });
    Ok(true)
}

/// Ask before letting a destructive button or link run its default action.
pub fn bind_delete_confirmation(
    page: &Page,
    button: &NodeRef,
    confirm: Rc<dyn ConfirmProvider>,
    prompt: Rc<str>,
) {
    page.add_event_listener(button, EventKind::Click, move |_, event| {
        if !confirm.confirm(&prompt) {
            debug!(target = "enhancer", node = %describe(event.target()), "delete declined");
            event.prevent_default();
        }
    });
}

/// Focus the first of `inputs`, if any.
pub fn autofocus_first_input(page: &Page, inputs: &[NodeRef]) -> Option<NodeRef> {
    let first = inputs.first()?;
    page.focus(first);
    Some(first.clone())
}

/// Stripe the table and turn rows carrying a link into click targets for that link.
/// Returns the number of rows made clickable.
pub fn enhance_table(
    page: &Page,
    table: &NodeRef,
    striped_class: &str,
    row_selector: &str,
    link_selector: &str,
) -> Result<usize, PageError> {
    page.add_class(table, striped_class);

    let mut clickable = 0;
    for row in page.select_within(table, row_selector)? {
        let Some(link) = page.select_within(&row, link_selector)?.into_iter().next() else {
            continue;
        };
        page.set_style_property(&row, "cursor", "pointer");
        bind_row_navigation(page, &row, link);
        clickable += 1;
    }
    Ok(clickable)
}

fn bind_row_navigation(page: &Page, row: &NodeRef, link: NodeRef) {
    let clicked_row = row.clone();
    page.add_event_listener(row, EventKind::Click, move |page, event| {
        if originates_on_control(event.target(), &clicked_row) {
            return;
        }
        if let Some(href) = attr(&link, "href") {
            page.navigate_to(&href);
        }
    });
}

/// Whether the click started on (or inside) a link or button within the row;
/// those keep their own behavior.
fn originates_on_control(target: &NodeRef, row: &NodeRef) -> bool {
    target
        .inclusive_ancestors()
        .take_while(|node| node != row)
        .any(|node| is_tag(&node, "a") || is_tag(&node, "button"))
}
