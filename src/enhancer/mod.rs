//! Applies the record system's UI conventions to a loaded page.

pub mod bindings;

use std::rc::Rc;

use kuchiki::NodeRef;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::components::{BootstrapComponents, ComponentLibrary};
use crate::config::EnhancerConfig;
use crate::confirm::ConfirmProvider;
use crate::dom::element::{attr, describe};
use crate::dom::Page;

/// What a single `enhance` pass bound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancementSummary {
    pub already_enhanced: bool,
    pub alerts_scheduled: usize,
    pub tooltips: usize,
    pub popovers: usize,
    pub validation_gates: usize,
    pub search_inputs: usize,
    pub delete_guards: usize,
    pub autofocused: Option<String>,
    pub tables: usize,
    pub clickable_rows: usize,
}

pub struct PageEnhancer {
    config: EnhancerConfig,
    components: Rc<dyn ComponentLibrary>,
    confirm: Rc<dyn ConfirmProvider>,
}

impl PageEnhancer {
    pub fn new(
        config: EnhancerConfig,
        components: Rc<dyn ComponentLibrary>,
        confirm: Rc<dyn ConfirmProvider>,
    ) -> Self {
        Self {
            config,
            components,
            confirm,
        }
    }

    /// Enhancer backed by the Bootstrap markup conventions.
    pub fn bootstrap(config: EnhancerConfig, confirm: Rc<dyn ConfirmProvider>) -> Self {
        Self::new(config, Rc::new(BootstrapComponents::new()), confirm)
    }

    pub fn config(&self) -> &EnhancerConfig {
        &self.config
    }

    /// Bind every behavior once. A second call on the same page binds nothing.
    pub fn enhance(&self, page: &Page) -> EnhancementSummary {
        if !page.mark_enhanced() {
            debug!(target = "enhancer", "page already enhanced");
            return EnhancementSummary {
                already_enhanced: true,
                ..EnhancementSummary::default()
            };
        }

        let mut summary = EnhancementSummary::default();

        if let Some(alerts) = self.matching(page, &self.config.alert_selector) {
            summary.alerts_scheduled = bindings::schedule_alert_dismissal(
                page,
                &alerts,
                self.config.alert_delay(),
                Rc::clone(&self.components),
            );
        }

        if let Some(triggers) = self.matching(page, &self.config.tooltip_selector) {
            summary.tooltips = bindings::activate_tooltips(page, &triggers, self.components.as_ref());
        }
        if let Some(triggers) = self.matching(page, &self.config.popover_selector) {
            summary.popovers = bindings::activate_popovers(page, &triggers, self.components.as_ref());
        }

        if let Some(forms) = self.matching(page, &self.config.validation_selector) {
            for form in &forms {
                bindings::bind_validation_gate(page, form, &self.config.validated_class);
            }
            summary.validation_gates = forms.len();
        }

        if let Some(forms) = self.matching(page, "form") {
            for form in forms.iter().filter(|form| is_get_form(form)) {
                match bindings::bind_search_submit(page, form, &self.config.search_input_selector) {
                    Ok(true) => summary.search_inputs += 1,
                    Ok(false) => {}
                    Err(err) => {
                        error!(target = "enhancer", error = %err, "search binding skipped");
                        break;
                    }
                }
            }
        }

        if let Some(buttons) = self.matching(page, &self.config.delete_selector) {
            let prompt: Rc<str> = Rc::from(self.config.delete_prompt.as_str());
            for button in &buttons {
                bindings::bind_delete_confirmation(
                    page,
                    button,
                    Rc::clone(&self.confirm),
                    Rc::clone(&prompt),
                );
            }
            summary.delete_guards = buttons.len();
        }

        if let Some(inputs) = self.matching(page, &self.config.autofocus_selector) {
            summary.autofocused =
                bindings::autofocus_first_input(page, &inputs).map(|input| describe(&input));
        }

        if let Some(tables) = self.matching(page, &self.config.table_selector) {
            for table in &tables {
                match bindings::enhance_table(
                    page,
                    table,
                    &self.config.striped_class,
                    &self.config.table_row_selector,
                    &self.config.row_link_selector,
                ) {
                    Ok(rows) => summary.clickable_rows += rows,
                    Err(err) => {
                        error!(target = "enhancer", error = %err, "table rows skipped");
                    }
                }
            }
            summary.tables = tables.len();
        }

        info!(
            target = "enhancer",
            alerts = summary.alerts_scheduled,
            tooltips = summary.tooltips,
            popovers = summary.popovers,
            forms = summary.validation_gates,
            search = summary.search_inputs,
            deletes = summary.delete_guards,
            tables = summary.tables,
            rows = summary.clickable_rows,
            "page enhanced"
        );
        summary
    }

    /// Elements for one behavior. A bad selector disables only that behavior.
    fn matching(&self, page: &Page, selector: &str) -> Option<Vec<NodeRef>> {
        page.select(selector)
            .map_err(|err| error!(target = "enhancer", error = %err, "behavior skipped"))
            .ok()
    }
}

fn is_get_form(form: &NodeRef) -> bool {
    attr(form, "method")
        .map(|method| method.trim().eq_ignore_ascii_case("get"))
        .unwrap_or(false)
}
