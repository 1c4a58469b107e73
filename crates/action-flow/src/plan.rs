//! Step plan assembly
//!
//! A plan is a fixed prefix (submit), an optional wait-for-return switch,
//! and a fixed seven-step suffix that routes the ticket to external
//! support. Problem options are matched by substring because the surface
//! embeds the label in longer descriptions; service options are matched
//! exactly because their short labels collide when matched loosely.

use action_locator::{Criterion, RetryBudget};

use crate::policy::FlowPolicy;
use crate::types::{Plan, Step, StepKind, StepRole, WorkflowParameters};

pub struct PlanBuilder<'a> {
    policy: &'a FlowPolicy,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(policy: &'a FlowPolicy) -> Self {
        Self { policy }
    }

    /// Build a fresh plan for `params`. Parameters are assumed validated.
    pub fn build(&self, params: &WorkflowParameters) -> Plan {
        let timings = &self.policy.timings;
        let labels = &self.policy.labels;
        let selectors = &self.policy.selectors;
        let generic = timings.generic_budget();

        let mut steps = vec![self.click(
            StepRole::Submit,
            Criterion::exact(&selectors.submit, &labels.submit),
            0,
        )];

        if params.wait_for_return {
            steps.push(self.click(
                StepRole::WaitForReturn,
                Criterion::structural(&selectors.wait_switch),
                0,
            ));
        }

        steps.push(self.click(
            StepRole::OpenSearch,
            Criterion::exact(&selectors.placeholder, &labels.search),
            timings.settle_ms,
        ));
        steps.push(self.click(
            StepRole::SelectCategory,
            Criterion::exact(&selectors.option, &labels.category),
            timings.settle_ms,
        ));
        steps.push(self.step(
            StepRole::OpenProblems,
            Criterion::exact(&selectors.placeholder, &labels.problems),
            generic,
            0,
            StepKind::OpenWithTextEntry {
                companion: Criterion::structural(&selectors.search_input),
                text: params.problem_label.clone(),
                settle_ms: timings.text_entry_settle_ms,
            },
        ));
        steps.push(Step {
            post_click_delay_ms: timings.post_select_ms,
            ..self.step(
                StepRole::SelectProblem,
                Criterion::substring(&selectors.option, &params.problem_label),
                generic,
                0,
                StepKind::ScanThenFallback {
                    settle_ms: timings.problem_scan_delay_ms,
                },
            )
        });
        steps.push(self.step(
            StepRole::OpenServices,
            Criterion::exact(&selectors.placeholder, &labels.services),
            RetryBudget::new(timings.open_attempts, timings.open_spacing_ms),
            0,
            StepKind::OpenUntilPopulated {
                options_selector: selectors.option.clone(),
                settle_ms: timings.open_settle_ms,
            },
        ));
        steps.push(Step {
            post_click_delay_ms: timings.post_select_ms,
            ..self.step(
                StepRole::SelectService,
                Criterion::exact(&selectors.option, &params.service_label),
                RetryBudget::new(timings.select_attempts, timings.select_spacing_ms),
                0,
                StepKind::SelectWithReopen {
                    reopen: Criterion::exact(&selectors.placeholder, &labels.services),
                    reopen_settle_ms: timings.reopen_settle_ms,
                    scan_delay_ms: timings.select_scan_delay_ms,
                    fallback: generic,
                },
            )
        });
        steps.push(self.click(
            StepRole::Confirm,
            Criterion::exact(&selectors.confirm, &labels.confirm),
            0,
        ));

        for (index, step) in steps.iter_mut().enumerate() {
            step.index = index;
        }
        Plan::new(steps)
    }

    fn click(&self, role: StepRole, criterion: Criterion, pre_delay_ms: u64) -> Step {
        self.step(
            role,
            criterion,
            self.policy.timings.generic_budget(),
            pre_delay_ms,
            StepKind::Click,
        )
    }

    fn step(
        &self,
        role: StepRole,
        criterion: Criterion,
        budget: RetryBudget,
        pre_delay_ms: u64,
        kind: StepKind,
    ) -> Step {
        Step {
            index: 0,
            role,
            criterion,
            pre_delay_ms,
            post_click_delay_ms: 0,
            max_attempts: budget.max_attempts,
            attempt_interval_ms: budget.interval_ms,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_locator::MatchMode;

    fn params(wait_for_return: bool) -> WorkflowParameters {
        WorkflowParameters::new("Instalação", "Sem sinal", wait_for_return)
    }

    fn roles(plan: &Plan) -> Vec<StepRole> {
        plan.steps().iter().map(|s| s.role).collect()
    }

    #[test]
    fn without_wait_plan_has_eight_steps() {
        let policy = FlowPolicy::default();
        let plan = PlanBuilder::new(&policy).build(&params(false));

        assert_eq!(plan.len(), 8);
        assert_eq!(plan.position(StepRole::WaitForReturn), None);
        assert_eq!(
            roles(&plan),
            vec![
                StepRole::Submit,
                StepRole::OpenSearch,
                StepRole::SelectCategory,
                StepRole::OpenProblems,
                StepRole::SelectProblem,
                StepRole::OpenServices,
                StepRole::SelectService,
                StepRole::Confirm,
            ]
        );
    }

    #[test]
    fn with_wait_switch_follows_prefix() {
        let policy = FlowPolicy::default();
        let plan = PlanBuilder::new(&policy).build(&params(true));

        assert_eq!(plan.len(), 9);
        let switch = &plan.steps()[1];
        assert_eq!(switch.role, StepRole::WaitForReturn);
        assert_eq!(switch.match_text(), None);
        assert_eq!(switch.criterion.selector(), policy.selectors.wait_switch);
        let indices: Vec<_> = plan.steps().iter().map(|s| s.index).collect();
        assert_eq!(indices, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn identical_parameters_build_equal_plans() {
        let policy = FlowPolicy::default();
        let builder = PlanBuilder::new(&policy);
        let first = builder.build(&params(true));
        let mut second = builder.build(&params(true));
        assert_eq!(first, second);

        second = PlanBuilder::new(&policy).build(&params(false));
        assert_ne!(first, second);
        assert_eq!(first.len(), 9);
    }

    #[test]
    fn matching_is_substring_for_problem_and_exact_for_service() {
        let policy = FlowPolicy::default();
        let plan = PlanBuilder::new(&policy).build(&params(false));

        let problem = &plan.steps()[plan.position(StepRole::SelectProblem).unwrap()];
        assert_eq!(problem.criterion.mode(), MatchMode::Substring);
        assert_eq!(problem.match_text(), Some("Sem sinal"));

        let service = &plan.steps()[plan.position(StepRole::SelectService).unwrap()];
        assert_eq!(service.criterion.mode(), MatchMode::Exact);
        assert_eq!(service.match_text(), Some("Instalação"));
        assert_eq!(service.max_attempts, 15);
    }

    #[test]
    fn settle_delay_only_before_search_and_category() {
        let policy = FlowPolicy::default();
        let plan = PlanBuilder::new(&policy).build(&params(true));
        let delayed: Vec<_> = plan
            .steps()
            .iter()
            .filter(|s| s.pre_delay_ms > 0)
            .map(|s| s.role)
            .collect();
        assert_eq!(delayed, vec![StepRole::OpenSearch, StepRole::SelectCategory]);
        assert!(plan.steps().iter().all(|s| s.pre_delay_ms == 0 || s.pre_delay_ms == 1000));
    }

    #[test]
    fn problem_label_flows_into_text_entry() {
        let policy = FlowPolicy::default();
        let plan = PlanBuilder::new(&policy).build(&params(false));
        let open = &plan.steps()[plan.position(StepRole::OpenProblems).unwrap()];
        match &open.kind {
            StepKind::OpenWithTextEntry { text, settle_ms, .. } => {
                assert_eq!(text, "Sem sinal");
                assert_eq!(*settle_ms, 800);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
