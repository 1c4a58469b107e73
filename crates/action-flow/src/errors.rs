//! Flow execution error types

use action_locator::{Criterion, LocatorError};
use handoff_core_types::SurfaceError;
use serde::Serialize;
use thiserror::Error;

/// Terminal failures of a workflow run.
///
/// Non-fatal anomalies are not errors; see [`crate::types::NonFatalAnomaly`].
#[derive(Debug, Error, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowError {
    /// Required parameter missing or empty; raised before any step runs
    #[error("required parameter '{field}' is missing or empty")]
    Precondition { field: String },

    /// Locator never matched within the step's budget
    #[error("step {step_index} timed out after {attempts} attempts waiting for {criterion}")]
    StepTimeout {
        step_index: usize,
        criterion: Criterion,
        attempts: u32,
    },

    /// Surface failed in a way the step cannot recover from
    #[error("step {step_index} surface failure: {source}")]
    Surface {
        step_index: usize,
        #[source]
        source: SurfaceError,
    },

    /// Policy rejected before the run
    #[error("invalid flow policy: {reason}")]
    InvalidPolicy { reason: String },

    /// Caller cancelled the run between steps
    #[error("run cancelled before step {step_index}")]
    Cancelled { step_index: usize },

    /// Caller's run deadline passed between steps
    #[error("run deadline exceeded before step {step_index}")]
    DeadlineExceeded { step_index: usize },
}

impl FlowError {
    /// Lift a locator failure into the step that raised it.
    pub fn from_locator(err: LocatorError, step_index: usize) -> Self {
        match err {
            LocatorError::Timeout {
                criterion,
                attempts,
            } => FlowError::StepTimeout {
                step_index,
                criterion,
                attempts,
            },
            LocatorError::Surface(source) => FlowError::Surface { step_index, source },
        }
    }

    pub fn surface(err: SurfaceError, step_index: usize) -> Self {
        FlowError::Surface {
            step_index,
            source: err,
        }
    }

    /// Plan index the run stopped at, `None` when no step was reached.
    pub fn step_index(&self) -> Option<usize> {
        match self {
            FlowError::StepTimeout { step_index, .. }
            | FlowError::Surface { step_index, .. }
            | FlowError::Cancelled { step_index }
            | FlowError::DeadlineExceeded { step_index } => Some(*step_index),
            FlowError::Precondition { .. } | FlowError::InvalidPolicy { .. } => None,
        }
    }

    /// Criterion that could not be satisfied, for timeouts.
    pub fn criterion(&self) -> Option<&Criterion> {
        match self {
            FlowError::StepTimeout { criterion, .. } => Some(criterion),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_timeout_keeps_criterion_and_index() {
        let criterion = Criterion::exact(".opt", "Instalação");
        let err = FlowError::from_locator(
            LocatorError::Timeout {
                criterion: criterion.clone(),
                attempts: 25,
            },
            6,
        );
        assert_eq!(err.step_index(), Some(6));
        assert_eq!(err.criterion(), Some(&criterion));
        assert!(err.to_string().contains("Instalação"));
    }

    #[test]
    fn precondition_has_no_step() {
        let err = FlowError::Precondition {
            field: "problem_label".into(),
        };
        assert_eq!(err.step_index(), None);
        assert_eq!(err.criterion(), None);
    }
}
