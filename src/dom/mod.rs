//! A parsed page plus the browser behavior the enhancer binds against: event
//! dispatch, default actions of clicks and submissions, focus and timers.

pub mod element;
pub mod events;
pub mod forms;
pub mod patch;
pub mod validity;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use keyboard_types::Key;
use kuchiki::traits::*;
use kuchiki::NodeRef;
use thiserror::Error;
use tokio::runtime::{Handle, TryCurrentError};
use tracing::{debug, warn};
use url::Url;

use crate::navigation::{NavigationRequest, Navigator};
use crate::timers::{TimerCallback, TimerId, TimerQueue};

use element::{attr, closest_form, describe, has_attr, has_class, is_activatable, is_disabled, is_tag};
use events::{DispatchOutcome, DomEvent, EventKind, Listener, ListenerRegistry};
pub use patch::DomPatch;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("invalid selector '{0}'")]
    Selector(String),
    #[error("a page needs a tokio runtime for its timers: {0}")]
    NoRuntime(#[from] TryCurrentError),
}

/// What happened to an interactive form submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Constraint validation failed on a form without `novalidate`; no submit event fired.
    Invalid,
    /// A submit listener prevented the default action.
    Cancelled,
    Submitted,
}

pub struct Page {
    document: NodeRef,
    base_url: Url,
    listeners: RefCell<ListenerRegistry>,
    focused: RefCell<Option<NodeRef>>,
    mutations: RefCell<Vec<DomPatch>>,
    timers: TimerQueue,
    navigator: Rc<dyn Navigator>,
    enhanced: Cell<bool>,
}

impl Page {
    /// Parse `html` as a full document living at `base_url`. Must be called from
    /// inside a tokio runtime.
    pub fn parse(html: &str, base_url: Url, navigator: Rc<dyn Navigator>) -> Result<Self, PageError> {
        let handle = Handle::try_current()?;
        Ok(Self {
            document: kuchiki::parse_html().one(html),
            base_url,
            listeners: RefCell::new(ListenerRegistry::default()),
            focused: RefCell::new(None),
            mutations: RefCell::new(Vec::new()),
            timers: TimerQueue::new(handle),
            navigator,
            enhanced: Cell::new(false),
        })
    }

    pub fn document(&self) -> &NodeRef {
        &self.document
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn select(&self, selector: &str) -> Result<Vec<NodeRef>, PageError> {
        self.select_within(&self.document, selector)
    }

    pub fn select_first(&self, selector: &str) -> Result<Option<NodeRef>, PageError> {
        Ok(self.select(selector)?.into_iter().next())
    }

    /// Matching elements among `root` and its descendants, in document order.
    pub fn select_within(&self, root: &NodeRef, selector: &str) -> Result<Vec<NodeRef>, PageError> {
        let matches = root
            .select(selector)
            .map_err(|_| PageError::Selector(selector.to_string()))?;
        Ok(matches.map(|element| element.as_node().clone()).collect())
    }

    pub fn to_html(&self) -> String {
        self.document.to_string()
    }

    // Events

    pub fn add_event_listener<F>(&self, node: &NodeRef, kind: EventKind, listener: F)
    where
        F: Fn(&Page, &mut DomEvent) + 'static,
    {
        let listener: Listener = Rc::new(listener);
        self.listeners
            .borrow_mut()
            .add(node.clone(), kind, listener);
    }

    pub fn is_listening(&self, kind: EventKind) -> bool {
        self.listeners.borrow().is_listening(kind)
    }

    pub fn listener_count(&self, node: &NodeRef, kind: EventKind) -> usize {
        self.listeners.borrow().count(node, kind)
    }

    /// Run listeners on the target, then on each ancestor, until propagation stops.
    pub fn dispatch(&self, mut event: DomEvent) -> DispatchOutcome {
        let path: Vec<NodeRef> = event.target().inclusive_ancestors().collect();
        for node in path {
            let listeners = self.listeners.borrow().listeners_for(&node, event.kind());
            if listeners.is_empty() {
                continue;
            }
            event.set_current_target(node);
            for listener in listeners {
                (*listener)(self, &mut event);
            }
            if event.propagation_stopped() {
                break;
            }
        }

        let outcome = event.outcome();
        debug!(
            target = "page",
            event = %event.kind(),
            node = %describe(event.target()),
            default_prevented = outcome.default_prevented,
            "dispatched event"
        );
        outcome
    }

    /// A user click: dispatch `click`, then run the default action of the nearest
    /// link or submit button unless a listener prevented it.
    pub fn click(&self, target: &NodeRef) -> DispatchOutcome {
        if is_disabled(target) {
            return DispatchOutcome::default();
        }

        let outcome = self.dispatch(DomEvent::new(EventKind::Click, target.clone()));
        if outcome.default_prevented {
            return outcome;
        }

        let Some(activatable) = target.inclusive_ancestors().find(is_activatable) else {
            return outcome;
        };
        if is_disabled(&activatable) {
            return outcome;
        }

        if is_tag(&activatable, "a") {
            self.follow_link(&activatable);
        } else if let Some(form) = closest_form(&activatable) {
            self.request_submit(&form);
        }
        outcome
    }

    pub fn key_up(&self, target: &NodeRef, key: Key) -> DispatchOutcome {
        self.dispatch(DomEvent::new(EventKind::KeyUp, target.clone()).with_key(key))
    }

    /// Interactive submission (submit button, `requestSubmit()`): validates unless
    /// the form opts out with `novalidate`, then fires `submit`.
    pub fn request_submit(&self, form: &NodeRef) -> SubmitOutcome {
        if !has_attr(form, "novalidate") && !validity::check_validity(form) {
            debug!(target = "page", form = %describe(form), "interactive validation blocked submission");
            return SubmitOutcome::Invalid;
        }

        let outcome = self.dispatch(DomEvent::new(EventKind::Submit, form.clone()));
        if outcome.default_prevented {
            return SubmitOutcome::Cancelled;
        }

        self.submit_form(form);
        SubmitOutcome::Submitted
    }

    /// Programmatic `form.submit()`: no submit event, no validation.
    pub fn submit_form(&self, form: &NodeRef) {
        match forms::build_submission(form, &self.base_url) {
            Ok(submission) => self.navigator.navigate(NavigationRequest::Form(submission)),
            Err(err) => {
                warn!(target = "page", form = %describe(form), error = %err, "form action is not a valid URL");
            }
        }
    }

    pub fn follow_link(&self, link: &NodeRef) {
        if let Some(href) = attr(link, "href") {
            self.navigate_to(&href);
        }
    }

    /// Resolve `href` against the page URL and hand it to the navigator.
    pub fn navigate_to(&self, href: &str) {
        match self.base_url.join(href.trim()) {
            Ok(url) => self.navigator.navigate(NavigationRequest::Link { url }),
            Err(err) => {
                warn!(target = "page", %href, error = %err, "ignoring navigation to invalid URL");
            }
        }
    }

    // Focus and form state

    pub fn focus(&self, node: &NodeRef) {
        *self.focused.borrow_mut() = Some(node.clone());
        self.record(DomPatch::Focus {
            node: describe(node),
        });
    }

    pub fn focused(&self) -> Option<NodeRef> {
        self.focused.borrow().clone()
    }

    /// Set a control's value as if the user had typed it.
    pub fn set_value(&self, control: &NodeRef, value: &str) {
        if is_tag(control, "textarea") {
            for child in control.children().collect::<Vec<_>>() {
                child.detach();
            }
            control.append(NodeRef::new_text(value));
            return;
        }
        self.set_attribute(control, "value", value);
    }

    pub fn set_checked(&self, control: &NodeRef, checked: bool) {
        if checked {
            self.set_attribute(control, "checked", "");
        } else {
            self.remove_attribute(control, "checked");
        }
    }

    // Mutations

    fn record(&self, patch: DomPatch) {
        self.mutations.borrow_mut().push(patch);
    }

    pub fn drain_mutations(&self) -> Vec<DomPatch> {
        std::mem::take(&mut *self.mutations.borrow_mut())
    }

    pub fn add_class(&self, node: &NodeRef, class: &str) -> bool {
        if has_class(node, class) {
            return false;
        }
        let label = describe(node);
        let mut tokens = element::classes(node);
        tokens.push(class.to_string());
        element::set_attr_raw(node, "class", &tokens.join(" "));
        self.record(DomPatch::AddClass {
            node: label,
            class: class.to_string(),
        });
        true
    }

    pub fn remove_class(&self, node: &NodeRef, class: &str) -> bool {
        if !has_class(node, class) {
            return false;
        }
        let label = describe(node);
        let tokens: Vec<String> = element::classes(node)
            .into_iter()
            .filter(|token| token != class)
            .collect();
        element::set_attr_raw(node, "class", &tokens.join(" "));
        self.record(DomPatch::RemoveClass {
            node: label,
            class: class.to_string(),
        });
        true
    }

    pub fn set_attribute(&self, node: &NodeRef, name: &str, value: &str) {
        if element::set_attr_raw(node, name, value) {
            self.record(DomPatch::SetAttribute {
                node: describe(node),
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    pub fn remove_attribute(&self, node: &NodeRef, name: &str) {
        if element::remove_attr_raw(node, name) {
            self.record(DomPatch::RemoveAttribute {
                node: describe(node),
                name: name.to_string(),
            });
        }
    }

    pub fn set_style_property(&self, node: &NodeRef, property: &str, value: &str) {
        let existing = attr(node, "style").unwrap_or_default();
        let merged = element::merge_style(&existing, property, value);
        if element::set_attr_raw(node, "style", &merged) {
            self.record(DomPatch::SetStyle {
                node: describe(node),
                property: property.to_string(),
                value: value.to_string(),
            });
        }
    }

    /// Remove `node` from the tree. Returns false if it was already detached.
    pub fn detach(&self, node: &NodeRef) -> bool {
        if node.parent().is_none() {
            return false;
        }
        node.detach();
        if self
            .focused
            .borrow()
            .as_ref()
            .is_some_and(|focused| focused.inclusive_ancestors().any(|n| n == *node))
        {
            *self.focused.borrow_mut() = None;
        }
        self.record(DomPatch::Detach {
            node: describe(node),
        });
        true
    }

    // Timers

    pub fn set_timeout<F>(&self, delay: Duration, callback: F) -> TimerId
    where
        F: FnOnce(&Page) + 'static,
    {
        let callback: TimerCallback = Box::new(callback);
        self.timers.set_timeout(delay, callback)
    }

    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.timers.clear(id)
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// Run every timer that has already fired. Returns how many ran.
    pub fn run_due_timers(&self) -> usize {
        let due = self.timers.take_due();
        let ran = due.len();
        for callback in due {
            callback(self);
        }
        ran
    }

    /// Wait until every pending timer (including ones scheduled by callbacks) has run.
    pub async fn settle(&self) -> usize {
        let mut ran = self.run_due_timers();
        while self.timers.pending() > 0 {
            let Some(id) = self.timers.next_fired().await else {
                break;
            };
            if let Some(callback) = self.timers.take(id) {
                callback(self);
                ran += 1;
            }
        }
        ran
    }

    // Enhancement bookkeeping

    /// Flag the page as enhanced; false if it already was.
    pub(crate) fn mark_enhanced(&self) -> bool {
        !self.enhanced.replace(true)
    }

    pub fn is_enhanced(&self) -> bool {
        self.enhanced.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::NavigationLog;
    use std::cell::Cell;

    fn load(html: &str) -> (Page, Rc<NavigationLog>) {
        let log = Rc::new(NavigationLog::new());
        let base = Url::parse("http://records.local/students/").unwrap();
        let page = Page::parse(html, base, log.clone()).expect("page");
        (page, log)
    }

    fn one(page: &Page, selector: &str) -> NodeRef {
        page.select_first(selector).unwrap().expect(selector)
    }

    #[tokio::test]
    async fn events_bubble_to_ancestors() {
        let (page, _) = load(r#"<div id="outer"><span id="inner">x</span></div>"#);
        let outer = one(&page, "#outer");
        let inner = one(&page, "#inner");
        let hits = Rc::new(Cell::new(0));

        let counter = hits.clone();
        page.add_event_listener(&outer, EventKind::Click, move |_, event| {
            assert_eq!(element::attr(event.target(), "id").as_deref(), Some("inner"));
            let current = event.current_target().expect("current target");
            assert_eq!(element::attr(current, "id").as_deref(), Some("outer"));
            counter.set(counter.get() + 1);
        });

        page.click(&inner);
        assert_eq!(hits.get(), 1);
    }

    #[tokio::test]
    async fn stop_propagation_halts_bubbling() {
        let (page, _) = load(r#"<div id="outer"><button id="inner" type="button">x</button></div>"#);
        let outer = one(&page, "#outer");
        let inner = one(&page, "#inner");
        let reached = Rc::new(Cell::new(false));

        page.add_event_listener(&inner, EventKind::Click, |_, event| event.stop_propagation());
        let flag = reached.clone();
        page.add_event_listener(&outer, EventKind::Click, move |_, _| flag.set(true));

        let outcome = page.click(&inner);
        assert!(outcome.propagation_stopped);
        assert!(!reached.get());
    }

    #[tokio::test]
    async fn clicking_link_content_follows_link() {
        let (page, log) = load(r#"<a href="4/"><strong id="name">Ada</strong></a>"#);
        page.click(&one(&page, "#name"));
        assert_eq!(
            log.requests(),
            vec![NavigationRequest::Link {
                url: Url::parse("http://records.local/students/4/").unwrap()
            }]
        );
    }

    #[tokio::test]
    async fn prevented_click_skips_default_action() {
        let (page, log) = load(r#"<a id="link" href="/elsewhere">go</a>"#);
        let link = one(&page, "#link");
        page.add_event_listener(&link, EventKind::Click, |_, event| event.prevent_default());
        page.click(&link);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn submit_button_validates_before_submit_event() {
        let (page, log) = load(
            r#"<form method="post" action="add/"><input name="first_name" required><button id="save">Save</button></form>"#,
        );
        let form = one(&page, "form");
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        page.add_event_listener(&form, EventKind::Submit, move |_, _| flag.set(true));

        page.click(&one(&page, "#save"));
        assert!(!fired.get());
        assert!(log.is_empty());

        page.set_value(&one(&page, "input"), "Ada");
        page.click(&one(&page, "#save"));
        assert!(fired.get());
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn programmatic_submit_bypasses_listeners() {
        let (page, log) = load(r#"<form method="get"><input name="q" value="x"></form>"#);
        let form = one(&page, "form");
        page.add_event_listener(&form, EventKind::Submit, |_, event| event.prevent_default());
        page.submit_form(&form);
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn class_and_style_changes_are_recorded() {
        let (page, _) = load(r#"<table id="students" class="table"></table>"#);
        let table = one(&page, "table");
        assert!(page.add_class(&table, "table-striped"));
        assert!(!page.add_class(&table, "table-striped"));
        page.set_style_property(&table, "cursor", "pointer");

        assert_eq!(
            page.drain_mutations(),
            vec![
                DomPatch::AddClass {
                    node: "table#students.table".into(),
                    class: "table-striped".into(),
                },
                DomPatch::SetStyle {
                    node: "table#students.table.table-striped".into(),
                    property: "cursor".into(),
                    value: "pointer".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn detaching_twice_is_a_noop() {
        let (page, _) = load(r#"<div class="alert">Saved</div>"#);
        let alert = one(&page, ".alert");
        assert!(page.detach(&alert));
        assert!(!page.detach(&alert));
        assert!(page.select(".alert").unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_selector_is_reported() {
        let (page, _) = load("<p></p>");
        assert!(matches!(page.select("p[["), Err(PageError::Selector(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn timers_run_once_due() {
        let (page, _) = load("<p></p>");
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        page.set_timeout(Duration::from_millis(100), move |_| counter.set(counter.get() + 1));

        assert_eq!(page.run_due_timers(), 0);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(page.run_due_timers(), 1);
        assert_eq!(hits.get(), 1);
        assert_eq!(page.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_timer_never_runs() {
        let (page, _) = load("<p></p>");
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let id = page.set_timeout(Duration::from_millis(10), move |_| counter.set(1));
        assert!(page.clear_timeout(id));
        assert!(!page.clear_timeout(id));
        assert_eq!(page.settle().await, 0);
        assert_eq!(hits.get(), 0);
    }
}
