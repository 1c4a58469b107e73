//! Run trigger
//!
//! Decides whether a catalog record should start a handoff and makes sure
//! at most one run is in flight against the surface at any time.

use std::sync::Arc;
use std::time::Duration;

use action_flow::{FlowExecutor, RunCtx, RunReport, WorkflowParameters};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::CatalogRecord;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TriggerError {
    #[error("a handoff run is already in progress")]
    RunInProgress,

    #[error("catalog record '{id}' is not routed to external support")]
    NotExternal { id: String },
}

pub struct HandoffTrigger {
    executor: Arc<dyn FlowExecutor>,
    run_guard: Mutex<()>,
    deadline: Option<Duration>,
    cancel: CancellationToken,
}

impl HandoffTrigger {
    pub fn new(executor: Arc<dyn FlowExecutor>) -> Self {
        Self {
            executor,
            run_guard: Mutex::new(()),
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort runs that are still going after `deadline`, between steps.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Token that stops the current and every later run before its next step.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.run_guard.try_lock().is_err()
    }

    /// Start a run for `record` unless it is not an external handoff.
    pub async fn fire_record(
        &self,
        record: &CatalogRecord,
        wait_override: bool,
    ) -> Result<RunReport, TriggerError> {
        if !record.externo {
            info!(record = record.display_id(), "record is not external, skipping handoff");
            return Err(TriggerError::NotExternal {
                id: record.display_id().to_string(),
            });
        }
        self.fire(record.parameters(wait_override)).await
    }

    /// Run the workflow once. Refuses instead of queueing when busy.
    pub async fn fire(&self, params: WorkflowParameters) -> Result<RunReport, TriggerError> {
        let _guard = self.run_guard.try_lock().map_err(|_| {
            warn!("handoff requested while another run is in flight");
            TriggerError::RunInProgress
        })?;

        let mut ctx = RunCtx::new().with_cancel(self.cancel.clone());
        if let Some(deadline) = self.deadline {
            ctx = ctx.with_deadline(deadline);
        }
        info!(
            run = %ctx.run_id,
            service = %params.service_label,
            problem = %params.problem_label,
            wait_for_return = params.wait_for_return,
            "starting handoff"
        );

        Ok(self.executor.run(&ctx, &params).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_flow::{ExecutionOutcome, FlowError, FlowPolicy, Plan, PlanBuilder};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tokio::time::sleep;

    /// Records what it was asked to run and takes a second to do it.
    #[derive(Default)]
    struct SlowExecutor {
        policy: FlowPolicy,
        seen: StdMutex<Vec<WorkflowParameters>>,
    }

    #[async_trait]
    impl FlowExecutor for SlowExecutor {
        async fn run(&self, ctx: &RunCtx, params: &WorkflowParameters) -> RunReport {
            self.seen.lock().unwrap().push(params.clone());
            sleep(Duration::from_secs(1)).await;
            let outcome = match ctx.check(0) {
                Ok(()) => ExecutionOutcome::Completed,
                Err(err) => ExecutionOutcome::failed(err),
            };
            RunReport::new(ctx.run_id.clone()).finish(outcome)
        }

        fn plan(&self, params: &WorkflowParameters) -> Plan {
            PlanBuilder::new(&self.policy).build(params)
        }
    }

    fn record(externo: bool, aguardar: bool) -> CatalogRecord {
        CatalogRecord {
            id: Some("3".into()),
            servico: Some("Instalação".into()),
            etiqueta_externo: Some("Sem sinal".into()),
            aguardar,
            externo,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_fire_is_refused_while_first_runs() {
        let trigger = HandoffTrigger::new(Arc::new(SlowExecutor::default()));
        let params = WorkflowParameters::new("Instalação", "Sem sinal", false);

        let (first, second) = tokio::join!(trigger.fire(params.clone()), async {
            tokio::task::yield_now().await;
            trigger.fire(params.clone()).await
        });

        assert!(first.unwrap().outcome.is_completed());
        assert_eq!(second.unwrap_err(), TriggerError::RunInProgress);
        assert!(!trigger.is_busy());
        assert!(trigger.fire(params).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn non_external_record_never_reaches_executor() {
        let executor = Arc::new(SlowExecutor::default());
        let trigger = HandoffTrigger::new(executor.clone());

        let err = trigger.fire_record(&record(false, false), true).await.unwrap_err();
        assert_eq!(err, TriggerError::NotExternal { id: "3".into() });
        assert!(executor.seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn record_fields_become_parameters() {
        let executor = Arc::new(SlowExecutor::default());
        let trigger = HandoffTrigger::new(executor.clone());

        trigger.fire_record(&record(true, true), false).await.unwrap();
        trigger.fire_record(&record(true, false), true).await.unwrap();
        trigger.fire_record(&record(true, false), false).await.unwrap();

        let waits: Vec<_> = executor
            .seen
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.wait_for_return)
            .collect();
        assert_eq!(waits, vec![true, true, false]);
        assert_eq!(executor.seen.lock().unwrap()[0].service_label, "Instalação");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_travels_in_run_ctx() {
        let trigger = HandoffTrigger::new(Arc::new(SlowExecutor::default()))
            .with_deadline(Some(Duration::from_millis(500)));
        let report = trigger
            .fire(WorkflowParameters::new("Instalação", "Sem sinal", false))
            .await
            .unwrap();
        assert_eq!(
            report.outcome.error(),
            Some(&FlowError::DeadlineExceeded { step_index: 0 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_token_reaches_the_run() {
        let trigger = HandoffTrigger::new(Arc::new(SlowExecutor::default()));
        trigger.cancel_token().cancel();
        let report = trigger
            .fire(WorkflowParameters::new("Instalação", "Sem sinal", false))
            .await
            .unwrap();
        assert_eq!(
            report.outcome.error(),
            Some(&FlowError::Cancelled { step_index: 0 })
        );
    }
}
