use async_trait::async_trait;
use handoff_core_types::RunId;
use tracing::{info, warn};

use crate::types::{RecordedAnomaly, Step, StepReport};

/// Progress notifications for whoever started the run.
#[async_trait]
pub trait EventsPort: Send + Sync {
    async fn step_started(&self, run: &RunId, step: &Step);
    async fn step_finished(&self, run: &RunId, report: &StepReport);
    async fn anomaly(&self, run: &RunId, anomaly: &RecordedAnomaly);
}

/// Default sink: structured log lines only.
#[derive(Clone, Debug, Default)]
pub struct TracingEvents;

#[async_trait]
impl EventsPort for TracingEvents {
    async fn step_started(&self, run: &RunId, step: &Step) {
        info!(run = %run, step = step.index, role = step.label(), target_text = step.criterion.describe(), "step started");
    }

    async fn step_finished(&self, run: &RunId, report: &StepReport) {
        info!(run = %run, step = report.index, phase = ?report.phase, polls = report.polls, "step finished");
    }

    async fn anomaly(&self, run: &RunId, anomaly: &RecordedAnomaly) {
        warn!(run = %run, step = anomaly.step_index, anomaly = ?anomaly.anomaly, "non-fatal anomaly");
    }
}
