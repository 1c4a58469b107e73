use action_locator::RetryBudget;
use serde::{Deserialize, Serialize};

use crate::errors::FlowError;

/// Everything about a run that is tuned to the surface rather than fixed by
/// the workflow: delays, attempt ceilings, labels and selectors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowPolicy {
    pub timings: FlowTimings,
    pub labels: FlowLabels,
    pub selectors: FlowSelectors,
}

impl FlowPolicy {
    pub fn validate(&self) -> Result<(), FlowError> {
        let t = &self.timings;
        for (name, value) in [
            ("generic_attempts", t.generic_attempts),
            ("open_attempts", t.open_attempts),
            ("select_attempts", t.select_attempts),
        ] {
            if value == 0 {
                return Err(FlowError::InvalidPolicy {
                    reason: format!("timings.{name} must be greater than 0"),
                });
            }
        }

        let l = &self.labels;
        let s = &self.selectors;
        for (name, value) in [
            ("labels.submit", &l.submit),
            ("labels.search", &l.search),
            ("labels.category", &l.category),
            ("labels.problems", &l.problems),
            ("labels.services", &l.services),
            ("labels.confirm", &l.confirm),
            ("selectors.submit", &s.submit),
            ("selectors.wait_switch", &s.wait_switch),
            ("selectors.placeholder", &s.placeholder),
            ("selectors.option", &s.option),
            ("selectors.search_input", &s.search_input),
            ("selectors.confirm", &s.confirm),
        ] {
            if value.trim().is_empty() {
                return Err(FlowError::InvalidPolicy {
                    reason: format!("{name} cannot be empty"),
                });
            }
        }
        Ok(())
    }
}

/// Delays in milliseconds and attempt ceilings. Defaults reproduce the
/// pacing the surface is known to need.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowTimings {
    pub generic_attempts: u32,
    pub generic_interval_ms: u64,
    /// Pause between building the plan and running its first step
    pub startup_pause_ms: u64,
    /// Settle delay before opening the search selector and picking the category
    pub settle_ms: u64,
    /// Wait after typing the problem label into the companion input
    pub text_entry_settle_ms: u64,
    /// Wait before the single scan of problem options
    pub problem_scan_delay_ms: u64,
    /// Wait after a dropdown option is picked
    pub post_select_ms: u64,
    pub open_attempts: u32,
    pub open_settle_ms: u64,
    pub open_spacing_ms: u64,
    pub select_attempts: u32,
    pub reopen_settle_ms: u64,
    pub select_scan_delay_ms: u64,
    pub select_spacing_ms: u64,
}

impl FlowTimings {
    pub fn generic_budget(&self) -> RetryBudget {
        RetryBudget::new(self.generic_attempts, self.generic_interval_ms)
    }
}

impl Default for FlowTimings {
    fn default() -> Self {
        Self {
            generic_attempts: 25,
            generic_interval_ms: 200,
            startup_pause_ms: 200,
            settle_ms: 1000,
            text_entry_settle_ms: 800,
            problem_scan_delay_ms: 500,
            post_select_ms: 500,
            open_attempts: 10,
            open_settle_ms: 500,
            open_spacing_ms: 300,
            select_attempts: 15,
            reopen_settle_ms: 500,
            select_scan_delay_ms: 300,
            select_spacing_ms: 300,
        }
    }
}

/// Fixed texts rendered by the surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowLabels {
    pub submit: String,
    pub search: String,
    pub category: String,
    pub problems: String,
    pub services: String,
    pub confirm: String,
}

impl Default for FlowLabels {
    fn default() -> Self {
        Self {
            submit: "Enviar".to_string(),
            search: "Pesquisar...".to_string(),
            category: "Suporte Externo".to_string(),
            problems: "Selecione os problemas".to_string(),
            services: "Selecione um serviço".to_string(),
            confirm: "Continuar".to_string(),
        }
    }
}

/// Structural selectors for each kind of element the workflow touches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSelectors {
    pub submit: String,
    pub wait_switch: String,
    pub placeholder: String,
    pub option: String,
    pub search_input: String,
    pub confirm: String,
}

impl Default for FlowSelectors {
    fn default() -> Self {
        Self {
            submit: ".icon-label".to_string(),
            wait_switch: "nz-switch#blocking button.ant-switch".to_string(),
            placeholder: ".ant-select-selection__placeholder".to_string(),
            option: ".ant-select-dropdown-menu-item".to_string(),
            search_input: ".ant-select-search__field".to_string(),
            confirm: "span.ng-star-inserted".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let policy = FlowPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.timings.generic_budget(), RetryBudget::new(25, 200));
    }

    #[test]
    fn zero_ceiling_is_rejected() {
        let mut policy = FlowPolicy::default();
        policy.timings.select_attempts = 0;
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("select_attempts"));
    }

    #[test]
    fn blank_label_is_rejected() {
        let mut policy = FlowPolicy::default();
        policy.labels.confirm = "  ".into();
        assert!(matches!(
            policy.validate(),
            Err(FlowError::InvalidPolicy { .. })
        ));
    }
}
