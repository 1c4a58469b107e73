//! Bounded polling around the single-scan locator

use handoff_core_types::ElementSnapshot;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::LocatorError;
use crate::resolver::Locator;
use crate::types::{Criterion, RetryBudget};

/// A successful lookup and the number of scans it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Found {
    pub element: ElementSnapshot,
    pub polls: u32,
}

/// Turns "not found yet" into "not found after the budget is exhausted".
///
/// Polls are strictly sequential: the surface mutates between scans, so
/// concurrent scans would observe inconsistent snapshots.
#[derive(Clone)]
pub struct RetryController {
    locator: Locator,
}

impl RetryController {
    pub fn new(locator: Locator) -> Self {
        Self { locator }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Poll until `criterion` matches or `budget.max_attempts` scans have missed.
    ///
    /// A hit returns immediately. No sleep follows the final miss. A budget
    /// of zero attempts still scans once.
    pub async fn find(
        &self,
        criterion: &Criterion,
        budget: RetryBudget,
    ) -> Result<Found, LocatorError> {
        self.poll(criterion, budget, false).await
    }

    /// Like [`find`](Self::find), but clicks the hit inside the same attempt.
    ///
    /// A click on an element that went stale since the scan counts as a miss.
    pub async fn click_first(
        &self,
        criterion: &Criterion,
        budget: RetryBudget,
    ) -> Result<Found, LocatorError> {
        self.poll(criterion, budget, true).await
    }

    async fn poll(
        &self,
        criterion: &Criterion,
        budget: RetryBudget,
        click: bool,
    ) -> Result<Found, LocatorError> {
        let max_attempts = budget.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                attempt,
                max_attempts,
                target_text = criterion.describe(),
                "searching"
            );

            match self.locator.locate(criterion).await {
                Ok(Some(element)) => {
                    if !click {
                        return Ok(Found {
                            element,
                            polls: attempt,
                        });
                    }
                    match self.locator.surface().click(&element.handle).await {
                        Ok(()) => {
                            debug!(target_text = criterion.describe(), attempt, "clicked");
                            return Ok(Found {
                                element,
                                polls: attempt,
                            });
                        }
                        Err(err) if err.is_retryable() => {
                            debug!(%err, attempt, "click hit a stale element, retrying");
                        }
                        Err(err) => return Err(LocatorError::Surface(err)),
                    }
                }
                Ok(None) => {}
                Err(err) if err.is_retryable() => {
                    debug!(%err, attempt, "transient scan failure counted as a miss");
                }
                Err(err) => return Err(LocatorError::Surface(err)),
            }

            if attempt >= max_attempts {
                warn!(
                    attempts = attempt,
                    criterion = %criterion,
                    "polling budget exhausted"
                );
                return Err(LocatorError::Timeout {
                    criterion: criterion.clone(),
                    attempts: attempt,
                });
            }

            sleep(budget.interval()).await;
        }
    }
}
