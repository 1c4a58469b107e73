//! Core types for flow orchestration

use action_locator::{Criterion, RetryBudget};
use chrono::{DateTime, Utc};
use handoff_core_types::RunId;
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::errors::FlowError;

/// Runtime inputs of one handoff run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowParameters {
    pub service_label: String,
    pub problem_label: String,
    pub wait_for_return: bool,
}

impl WorkflowParameters {
    pub fn new(
        service_label: impl Into<String>,
        problem_label: impl Into<String>,
        wait_for_return: bool,
    ) -> Self {
        Self {
            service_label: service_label.into(),
            problem_label: problem_label.into(),
            wait_for_return,
        }
    }

    /// Both labels are required; whitespace-only counts as missing.
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.service_label.trim().is_empty() {
            return Err(FlowError::Precondition {
                field: "service_label".to_string(),
            });
        }
        if self.problem_label.trim().is_empty() {
            return Err(FlowError::Precondition {
                field: "problem_label".to_string(),
            });
        }
        Ok(())
    }
}

/// What a step is for in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepRole {
    Submit,
    WaitForReturn,
    OpenSearch,
    SelectCategory,
    OpenProblems,
    SelectProblem,
    OpenServices,
    SelectService,
    Confirm,
}

impl StepRole {
    pub fn name(&self) -> &'static str {
        match self {
            StepRole::Submit => "submit",
            StepRole::WaitForReturn => "wait-for-return",
            StepRole::OpenSearch => "open-search",
            StepRole::SelectCategory => "select-category",
            StepRole::OpenProblems => "open-problems",
            StepRole::SelectProblem => "select-problem",
            StepRole::OpenServices => "open-services",
            StepRole::SelectService => "select-service",
            StepRole::Confirm => "confirm",
        }
    }
}

/// Execution discipline of a step. The executor dispatches on this tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    /// Poll with the step budget, then click
    Click,

    /// Open the selector, then type `text` into its companion search input
    OpenWithTextEntry {
        companion: Criterion,
        text: String,
        settle_ms: u64,
    },

    /// Wait, scan the rendered options once, and fall back to polling on a miss
    ScanThenFallback { settle_ms: u64 },

    /// Click-wait-check cycle until the option list renders; never fatal
    OpenUntilPopulated {
        options_selector: String,
        settle_ms: u64,
    },

    /// Scan-and-pick cycle that re-opens the list on later attempts, then
    /// falls back to polling with `fallback`
    SelectWithReopen {
        reopen: Criterion,
        reopen_settle_ms: u64,
        scan_delay_ms: u64,
        fallback: RetryBudget,
    },
}

impl StepKind {
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::Click => "click",
            StepKind::OpenWithTextEntry { .. } => "open-with-text-entry",
            StepKind::ScanThenFallback { .. } => "scan-then-fallback",
            StepKind::OpenUntilPopulated { .. } => "open-until-populated",
            StepKind::SelectWithReopen { .. } => "select-with-reopen",
        }
    }
}

/// One "find an element, then act on it" unit of the plan.
///
/// `max_attempts`/`attempt_interval_ms` bound whichever loop the step's
/// kind runs first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub index: usize,
    pub role: StepRole,
    pub criterion: Criterion,
    pub pre_delay_ms: u64,
    pub post_click_delay_ms: u64,
    pub max_attempts: u32,
    pub attempt_interval_ms: u64,
    pub kind: StepKind,
}

impl Step {
    pub fn budget(&self) -> RetryBudget {
        RetryBudget::new(self.max_attempts, self.attempt_interval_ms)
    }

    pub fn match_text(&self) -> Option<&str> {
        self.criterion.match_text()
    }

    pub fn label(&self) -> &'static str {
        self.role.name()
    }
}

/// Ordered steps of a single run. Built fresh per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn position(&self, role: StepRole) -> Option<usize> {
        self.steps.iter().position(|step| step.role == role)
    }
}

/// Lifecycle of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    Pending,
    Searching,
    Found,
    Acting,
    Advancing,
    TimedOut,
}

/// Conditions that are logged and recorded but never fail a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NonFatalAnomaly {
    /// Search input next to the option list was not rendered
    CompanionInputMissing { selector: String },
    /// Option list stayed empty after every open attempt
    OptionListEmpty { attempts: u32 },
    /// Single scan found no matching option; polling fallback engaged
    SingleScanMissed { text: String },
    /// Dedicated select loop exhausted; polling fallback engaged
    SelectLoopExhausted { text: String, attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedAnomaly {
    pub step_index: usize,
    #[serde(flatten)]
    pub anomaly: NonFatalAnomaly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub role: StepRole,
    pub phase: StepPhase,
    /// Surface scans performed by this step
    pub polls: u32,
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Completed,
    Failed {
        step_index: Option<usize>,
        reason: FlowError,
    },
}

impl ExecutionOutcome {
    pub fn failed(reason: FlowError) -> Self {
        ExecutionOutcome::Failed {
            step_index: reason.step_index(),
            reason,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ExecutionOutcome::Completed)
    }

    pub fn error(&self) -> Option<&FlowError> {
        match self {
            ExecutionOutcome::Completed => None,
            ExecutionOutcome::Failed { reason, .. } => Some(reason),
        }
    }
}

/// Flow execution result
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub latency_ms: u64,
    pub steps: Vec<StepReport>,
    pub anomalies: Vec<RecordedAnomaly>,
    pub outcome: ExecutionOutcome,
}

impl RunReport {
    pub fn new(run_id: RunId) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            started_at: now,
            finished_at: now,
            latency_ms: 0,
            steps: Vec::new(),
            anomalies: Vec::new(),
            outcome: ExecutionOutcome::Completed,
        }
    }

    /// Set outcome and finish time
    pub fn finish(mut self, outcome: ExecutionOutcome) -> Self {
        self.outcome = outcome;
        self.finished_at = Utc::now();
        self.latency_ms = (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;
        self
    }

    /// Total surface scans across all steps
    pub fn total_polls(&self) -> u32 {
        self.steps.iter().map(|step| step.polls).sum()
    }

    /// Roles of the steps that advanced, in execution order
    pub fn advanced_roles(&self) -> Vec<StepRole> {
        self.steps
            .iter()
            .filter(|step| step.phase == StepPhase::Advancing)
            .map(|step| step.role)
            .collect()
    }
}

/// Caller-owned controls for one run. Checked between steps only.
#[derive(Debug, Clone)]
pub struct RunCtx {
    pub run_id: RunId,
    pub deadline: Option<Instant>,
    pub cancel: CancellationToken,
}

impl RunCtx {
    pub fn new() -> Self {
        Self {
            run_id: RunId::new(),
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_deadline(mut self, budget: Duration) -> Self {
        self.deadline = Some(Instant::now() + budget);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fails if the run should not proceed to `step_index`.
    pub fn check(&self, step_index: usize) -> Result<(), FlowError> {
        if self.cancel.is_cancelled() {
            return Err(FlowError::Cancelled { step_index });
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(FlowError::DeadlineExceeded { step_index });
            }
        }
        Ok(())
    }
}

impl Default for RunCtx {
    fn default() -> Self {
        Self::new()
    }
}
