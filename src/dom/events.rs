use std::fmt;
use std::rc::Rc;

use keyboard_types::Key;
use kuchiki::NodeRef;
use serde::{Deserialize, Serialize};

use super::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Click,
    Submit,
    KeyUp,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Submit => "submit",
            Self::KeyUp => "keyup",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An event travelling from its target up through the target's ancestors.
#[derive(Debug, Clone)]
pub struct DomEvent {
    kind: EventKind,
    target: NodeRef,
    current_target: Option<NodeRef>,
    key: Option<Key>,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl DomEvent {
    pub fn new(kind: EventKind, target: NodeRef) -> Self {
        Self {
            kind,
            target,
            current_target: None,
            key: None,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn with_key(mut self, key: Key) -> Self {
        self.key = Some(key);
        self
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn target(&self) -> &NodeRef {
        &self.target
    }

    /// The node whose listeners are currently running.
    pub fn current_target(&self) -> Option<&NodeRef> {
        self.current_target.as_ref()
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub(crate) fn set_current_target(&mut self, node: NodeRef) {
        self.current_target = Some(node);
    }

    pub(crate) fn outcome(&self) -> DispatchOutcome {
        DispatchOutcome {
            default_prevented: self.default_prevented,
            propagation_stopped: self.propagation_stopped,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub default_prevented: bool,
    pub propagation_stopped: bool,
}

pub type Listener = Rc<dyn Fn(&Page, &mut DomEvent)>;

struct ListenerEntry {
    node: NodeRef,
    kind: EventKind,
    listener: Listener,
}

/// Listeners keyed by node identity, kept in registration order.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    entries: Vec<ListenerEntry>,
}

impl ListenerRegistry {
    pub(crate) fn add(&mut self, node: NodeRef, kind: EventKind, listener: Listener) {
        self.entries.push(ListenerEntry {
            node,
            kind,
            listener,
        });
    }

    pub(crate) fn listeners_for(&self, node: &NodeRef, kind: EventKind) -> Vec<Listener> {
        self.entries
            .iter()
            .filter(|entry| entry.kind == kind && entry.node == *node)
            .map(|entry| Rc::clone(&entry.listener))
            .collect()
    }

    pub(crate) fn is_listening(&self, kind: EventKind) -> bool {
        self.entries.iter().any(|entry| entry.kind == kind)
    }

    pub(crate) fn count(&self, node: &NodeRef, kind: EventKind) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.kind == kind && entry.node == *node)
            .count()
    }
}
