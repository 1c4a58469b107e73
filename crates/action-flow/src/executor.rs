//! Flow executor implementation

use action_locator::{Locator, RetryController, SurfacePort};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::errors::FlowError;
use crate::events::{EventsPort, TracingEvents};
use crate::plan::PlanBuilder;
use crate::policy::FlowPolicy;
use crate::strategies::{self, StepRuntime, StepTrace};
use crate::tempo::pause;
use crate::types::*;

/// Flow executor trait
#[async_trait]
pub trait FlowExecutor: Send + Sync {
    /// Run the whole workflow once. Failures are reported in the outcome.
    async fn run(&self, ctx: &RunCtx, params: &WorkflowParameters) -> RunReport;

    /// Plan that `run` would execute for `params`
    fn plan(&self, params: &WorkflowParameters) -> Plan;
}

/// Default flow executor implementation
pub struct DefaultFlowExecutor {
    retry: RetryController,
    policy: FlowPolicy,
    events: Arc<dyn EventsPort>,
}

impl DefaultFlowExecutor {
    /// Create an executor bound to one surface. Rejects an invalid policy.
    pub fn new(surface: Arc<dyn SurfacePort>, policy: FlowPolicy) -> Result<Self, FlowError> {
        policy.validate()?;
        Ok(Self {
            retry: RetryController::new(Locator::new(surface)),
            policy,
            events: Arc::new(TracingEvents),
        })
    }

    pub fn with_events(mut self, events: Arc<dyn EventsPort>) -> Self {
        self.events = events;
        self
    }

    pub fn policy(&self) -> &FlowPolicy {
        &self.policy
    }

    #[instrument(skip_all, fields(run = %ctx.run_id, steps = plan.len()))]
    async fn execute_plan(&self, ctx: &RunCtx, plan: &Plan, mut report: RunReport) -> RunReport {
        let mut rt = StepRuntime {
            retry: &self.retry,
            run_id: &ctx.run_id,
            events: self.events.as_ref(),
            anomalies: Vec::new(),
        };

        let mut failure = None;
        for step in plan.steps() {
            if let Err(err) = ctx.check(step.index) {
                warn!(step = step.index, %err, "run stopped between steps");
                failure = Some(err);
                break;
            }

            self.events.step_started(&ctx.run_id, step).await;
            let mut trace = StepTrace::new(step.index);
            let result = self.run_step(&mut rt, step, &mut trace).await;

            if result.is_ok() {
                trace.enter(StepPhase::Advancing);
            }
            let step_report = StepReport {
                index: step.index,
                role: step.role,
                phase: trace.phase,
                polls: trace.polls,
            };
            self.events.step_finished(&ctx.run_id, &step_report).await;
            report.steps.push(step_report);

            if let Err(err) = result {
                warn!(step = step.index, role = step.label(), %err, "step failed");
                failure = Some(err);
                break;
            }
        }

        report.anomalies = rt.anomalies;
        let outcome = match failure {
            Some(err) => ExecutionOutcome::failed(err),
            None => {
                info!(steps = plan.len(), polls = report.total_polls(), "handoff completed");
                ExecutionOutcome::Completed
            }
        };
        report.finish(outcome)
    }

    #[instrument(skip_all, fields(step = step.index, role = step.label()))]
    async fn run_step(
        &self,
        rt: &mut StepRuntime<'_>,
        step: &Step,
        trace: &mut StepTrace,
    ) -> Result<(), FlowError> {
        pause(step.pre_delay_ms).await;

        match &step.kind {
            StepKind::Click => strategies::click(rt, step, trace).await,
            StepKind::OpenWithTextEntry {
                companion,
                text,
                settle_ms,
            } => {
                strategies::open_with_text_entry(rt, step, companion, text, *settle_ms, trace)
                    .await
            }
            StepKind::ScanThenFallback { settle_ms } => {
                strategies::scan_then_fallback(rt, step, *settle_ms, trace).await
            }
            StepKind::OpenUntilPopulated {
                options_selector,
                settle_ms,
            } => {
                strategies::open_until_populated(rt, step, options_selector, *settle_ms, trace)
                    .await
            }
            StepKind::SelectWithReopen {
                reopen,
                reopen_settle_ms,
                scan_delay_ms,
                fallback,
            } => {
                strategies::select_with_reopen(
                    rt,
                    step,
                    reopen,
                    *reopen_settle_ms,
                    *scan_delay_ms,
                    *fallback,
                    trace,
                )
                .await
            }
        }
    }
}

#[async_trait]
impl FlowExecutor for DefaultFlowExecutor {
    async fn run(&self, ctx: &RunCtx, params: &WorkflowParameters) -> RunReport {
        let report = RunReport::new(ctx.run_id.clone());

        if let Err(err) = params.validate() {
            warn!(run = %ctx.run_id, %err, "handoff rejected before any step");
            return report.finish(ExecutionOutcome::failed(err));
        }

        let plan = self.plan(params);
        info!(
            run = %ctx.run_id,
            steps = plan.len(),
            wait_for_return = params.wait_for_return,
            "handoff plan built"
        );
        pause(self.policy.timings.startup_pause_ms).await;

        self.execute_plan(ctx, &plan, report).await
    }

    fn plan(&self, params: &WorkflowParameters) -> Plan {
        PlanBuilder::new(&self.policy).build(params)
    }
}
