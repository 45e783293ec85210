use serde::{Deserialize, Serialize};

/// A mutation applied to the page, recorded in the order it happened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomPatch {
    AddClass {
        node: String,
        class: String,
    },
    RemoveClass {
        node: String,
        class: String,
    },
    SetAttribute {
        node: String,
        name: String,
        value: String,
    },
    RemoveAttribute {
        node: String,
        name: String,
    },
    SetStyle {
        node: String,
        property: String,
        value: String,
    },
    Detach {
        node: String,
    },
    Focus {
        node: String,
    },
}
