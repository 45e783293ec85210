// Library exports for the binary and integration tests

pub mod components;
pub mod config;
pub mod confirm;
pub mod dom;
pub mod enhancer;
pub mod format;
pub mod navigation;
pub mod timers;

// Re-export commonly used types for tests
pub use components::{BootstrapComponents, ComponentLibrary};
pub use config::EnhancerConfig;
pub use confirm::{ConfirmProvider, FixedAnswer};
pub use dom::{DomPatch, Page, PageError, SubmitOutcome};
pub use enhancer::{EnhancementSummary, PageEnhancer};
pub use format::{format_currency, format_date, Locale};
pub use navigation::{NavigationLog, NavigationRequest, Navigator};
