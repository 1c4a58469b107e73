//! Per-kind step disciplines
//!
//! Each function drives one [`StepKind`] to completion or to a terminal
//! [`FlowError`]. Non-fatal conditions are recorded on the runtime and the
//! step carries on.

use action_locator::{first_match, Criterion, RetryBudget, RetryController};
use handoff_core_types::{ElementSnapshot, RunId};
use tracing::{debug, info, warn};

use crate::errors::FlowError;
use crate::events::EventsPort;
use crate::tempo::pause;
use crate::types::{NonFatalAnomaly, RecordedAnomaly, Step, StepPhase};

pub(crate) struct StepRuntime<'a> {
    pub retry: &'a RetryController,
    pub run_id: &'a RunId,
    pub events: &'a dyn EventsPort,
    pub anomalies: Vec<RecordedAnomaly>,
}

impl StepRuntime<'_> {
    async fn record(&mut self, step_index: usize, anomaly: NonFatalAnomaly) {
        let recorded = RecordedAnomaly {
            step_index,
            anomaly,
        };
        self.events.anomaly(self.run_id, &recorded).await;
        self.anomalies.push(recorded);
    }
}

/// Phase and scan count of the step in flight.
pub(crate) struct StepTrace {
    pub step_index: usize,
    pub phase: StepPhase,
    pub polls: u32,
}

impl StepTrace {
    pub fn new(step_index: usize) -> Self {
        Self {
            step_index,
            phase: StepPhase::Pending,
            polls: 0,
        }
    }

    pub fn enter(&mut self, phase: StepPhase) {
        debug!(step = self.step_index, from = ?self.phase, to = ?phase, "step phase");
        self.phase = phase;
    }
}

pub(crate) async fn click(
    rt: &mut StepRuntime<'_>,
    step: &Step,
    trace: &mut StepTrace,
) -> Result<(), FlowError> {
    poll_and_click(rt, &step.criterion, step.budget(), trace).await?;
    pause(step.post_click_delay_ms).await;
    Ok(())
}

pub(crate) async fn open_with_text_entry(
    rt: &mut StepRuntime<'_>,
    step: &Step,
    companion: &Criterion,
    text: &str,
    settle_ms: u64,
    trace: &mut StepTrace,
) -> Result<(), FlowError> {
    poll_and_click(rt, &step.criterion, step.budget(), trace).await?;

    let inputs = scan(rt, companion.selector(), trace).await?;
    let typed = match first_match(companion, &inputs) {
        Some(input) => match rt.retry.locator().surface().set_value(&input.handle, text).await {
            Ok(()) => true,
            Err(err) if err.is_retryable() => {
                debug!(%err, "companion input went stale before typing");
                false
            }
            Err(err) => return Err(FlowError::surface(err, trace.step_index)),
        },
        None => false,
    };

    if typed {
        info!(step = trace.step_index, text, "typed into companion search input");
        pause(settle_ms).await;
    } else {
        warn!(
            step = trace.step_index,
            selector = companion.selector(),
            "companion search input not found, continuing without typing"
        );
        rt.record(
            trace.step_index,
            NonFatalAnomaly::CompanionInputMissing {
                selector: companion.selector().to_string(),
            },
        )
        .await;
    }

    pause(step.post_click_delay_ms).await;
    Ok(())
}

pub(crate) async fn scan_then_fallback(
    rt: &mut StepRuntime<'_>,
    step: &Step,
    settle_ms: u64,
    trace: &mut StepTrace,
) -> Result<(), FlowError> {
    trace.enter(StepPhase::Searching);
    pause(settle_ms).await;

    let options = scan(rt, step.criterion.selector(), trace).await?;
    let texts: Vec<&str> = options.iter().map(|o| o.text.as_str()).collect();
    debug!(step = trace.step_index, candidates = ?texts, "single scan of rendered options");

    if let Some(hit) = first_match(&step.criterion, &options) {
        trace.enter(StepPhase::Found);
        if try_click(rt, hit, trace).await? {
            info!(step = trace.step_index, option = %hit.text, "picked option on single scan");
            pause(step.post_click_delay_ms).await;
            return Ok(());
        }
    }

    let text = step.criterion.describe().to_string();
    warn!(step = trace.step_index, %text, "no option matched on single scan, falling back to polling");
    rt.record(trace.step_index, NonFatalAnomaly::SingleScanMissed { text })
        .await;

    poll_and_click(rt, &step.criterion, step.budget(), trace).await?;
    pause(step.post_click_delay_ms).await;
    Ok(())
}

pub(crate) async fn open_until_populated(
    rt: &mut StepRuntime<'_>,
    step: &Step,
    options_selector: &str,
    settle_ms: u64,
    trace: &mut StepTrace,
) -> Result<(), FlowError> {
    let max_attempts = step.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        trace.enter(StepPhase::Searching);
        debug!(step = trace.step_index, attempt, max_attempts, "opening option list");

        let placeholders = scan(rt, step.criterion.selector(), trace).await?;
        if let Some(placeholder) = first_match(&step.criterion, &placeholders) {
            trace.enter(StepPhase::Found);
            if try_click(rt, placeholder, trace).await? {
                pause(settle_ms).await;
                let options = scan(rt, options_selector, trace).await?;
                if !options.is_empty() {
                    info!(
                        step = trace.step_index,
                        options = options.len(),
                        "option list rendered"
                    );
                    pause(step.post_click_delay_ms).await;
                    return Ok(());
                }
            }
        }

        if attempt < max_attempts {
            pause(step.attempt_interval_ms).await;
        }
    }

    warn!(
        step = trace.step_index,
        attempts = max_attempts,
        "option list stayed empty, continuing"
    );
    rt.record(
        trace.step_index,
        NonFatalAnomaly::OptionListEmpty {
            attempts: max_attempts,
        },
    )
    .await;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn select_with_reopen(
    rt: &mut StepRuntime<'_>,
    step: &Step,
    reopen: &Criterion,
    reopen_settle_ms: u64,
    scan_delay_ms: u64,
    fallback: RetryBudget,
    trace: &mut StepTrace,
) -> Result<(), FlowError> {
    let max_attempts = step.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        trace.enter(StepPhase::Searching);
        debug!(step = trace.step_index, attempt, max_attempts, target_text = step.criterion.describe(), "selecting option");

        // The list may have collapsed since the previous attempt.
        if attempt > 1 {
            let placeholders = scan(rt, reopen.selector(), trace).await?;
            if let Some(placeholder) = first_match(reopen, &placeholders) {
                if try_click(rt, placeholder, trace).await? {
                    debug!(step = trace.step_index, "re-opened option list");
                    pause(reopen_settle_ms).await;
                }
                trace.enter(StepPhase::Searching);
            }
        }

        pause(scan_delay_ms).await;
        let options = scan(rt, step.criterion.selector(), trace).await?;
        if let Some(hit) = first_match(&step.criterion, &options) {
            trace.enter(StepPhase::Found);
            if try_click(rt, hit, trace).await? {
                info!(step = trace.step_index, option = %hit.text, attempt, "picked option");
                pause(step.post_click_delay_ms).await;
                return Ok(());
            }
        }

        if attempt < max_attempts {
            pause(step.attempt_interval_ms).await;
        }
    }

    let text = step.criterion.describe().to_string();
    warn!(
        step = trace.step_index,
        %text,
        attempts = max_attempts,
        "select loop exhausted, falling back to polling"
    );
    rt.record(
        trace.step_index,
        NonFatalAnomaly::SelectLoopExhausted {
            text,
            attempts: max_attempts,
        },
    )
    .await;

    poll_and_click(rt, &step.criterion, fallback, trace).await?;
    pause(step.post_click_delay_ms).await;
    Ok(())
}

async fn poll_and_click(
    rt: &mut StepRuntime<'_>,
    criterion: &Criterion,
    budget: RetryBudget,
    trace: &mut StepTrace,
) -> Result<ElementSnapshot, FlowError> {
    trace.enter(StepPhase::Searching);
    match rt.retry.click_first(criterion, budget).await {
        Ok(found) => {
            trace.polls += found.polls;
            trace.enter(StepPhase::Found);
            trace.enter(StepPhase::Acting);
            Ok(found.element)
        }
        Err(err) => {
            if let action_locator::LocatorError::Timeout { attempts, .. } = &err {
                trace.polls += attempts;
                trace.enter(StepPhase::TimedOut);
            }
            Err(FlowError::from_locator(err, trace.step_index))
        }
    }
}

/// One scan; a transient failure reads as an empty snapshot.
async fn scan(
    rt: &StepRuntime<'_>,
    selector: &str,
    trace: &mut StepTrace,
) -> Result<Vec<ElementSnapshot>, FlowError> {
    trace.polls += 1;
    match rt.retry.locator().locate_all(selector).await {
        Ok(elements) => Ok(elements),
        Err(err) if err.is_retryable() => {
            debug!(%err, selector, "transient scan failure");
            Ok(Vec::new())
        }
        Err(err) => Err(FlowError::surface(err, trace.step_index)),
    }
}

/// Click a scanned element. `Ok(false)` when it went stale in between.
async fn try_click(
    rt: &StepRuntime<'_>,
    element: &ElementSnapshot,
    trace: &mut StepTrace,
) -> Result<bool, FlowError> {
    trace.enter(StepPhase::Acting);
    match rt.retry.locator().surface().click(&element.handle).await {
        Ok(()) => Ok(true),
        Err(err) if err.is_retryable() => {
            debug!(%err, element = %element.handle, "element went stale before click");
            Ok(false)
        }
        Err(err) => Err(FlowError::surface(err, trace.step_index)),
    }
}
