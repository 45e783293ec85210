use std::cell::RefCell;

use kuchiki::NodeRef;
use tracing::debug;

use crate::dom::element::{attr, describe, has_attr};
use crate::dom::Page;

/// The UI component library the enhancer drives (alerts, tooltips, popovers).
pub trait ComponentLibrary {
    fn attach_tooltip(&self, page: &Page, element: &NodeRef);
    fn attach_popover(&self, page: &Page, element: &NodeRef);
    /// Close an alert. Closing one that is already gone must be a no-op.
    fn close_alert(&self, page: &Page, alert: &NodeRef);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Tooltip,
    Popover,
}

/// Applies the markup effects Bootstrap's alert, tooltip and popover plugins have
/// on the elements they are constructed for.
#[derive(Default)]
pub struct BootstrapComponents {
    instances: RefCell<Vec<(ComponentKind, NodeRef)>>,
}

impl BootstrapComponents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance_count(&self, kind: ComponentKind) -> usize {
        self.instances
            .borrow()
            .iter()
            .filter(|(existing, _)| *existing == kind)
            .count()
    }

    pub fn has_instance(&self, kind: ComponentKind, element: &NodeRef) -> bool {
        self.instances
            .borrow()
            .iter()
            .any(|(existing, node)| *existing == kind && node == element)
    }

    fn register(&self, page: &Page, kind: ComponentKind, element: &NodeRef) {
        if self.has_instance(kind, element) {
            return;
        }

        // The plugins keep the title out of the native tooltip and expose it to
        // assistive tech when the trigger has no text of its own.
        if let Some(title) = attr(element, "title").filter(|title| !title.is_empty()) {
            if !has_attr(element, "aria-label") && element.text_contents().trim().is_empty() {
                page.set_attribute(element, "aria-label", &title);
            }
            page.set_attribute(element, "data-bs-original-title", &title);
            page.remove_attribute(element, "title");
        }

        debug!(target = "components", ?kind, node = %describe(element), "component attached");
        self.instances.borrow_mut().push((kind, element.clone()));
    }
}

impl ComponentLibrary for BootstrapComponents {
    fn attach_tooltip(&self, page: &Page, element: &NodeRef) {
        self.register(page, ComponentKind::Tooltip, element);
    }

    fn attach_popover(&self, page: &Page, element: &NodeRef) {
        self.register(page, ComponentKind::Popover, element);
    }

    fn close_alert(&self, page: &Page, alert: &NodeRef) {
        if alert.parent().is_none() {
            debug!(target = "components", node = %describe(alert), "alert already dismissed");
            return;
        }
        page.remove_class(alert, "show");
        page.detach(alert);
    }
}
