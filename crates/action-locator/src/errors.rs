//! Error types for the locator layer

use handoff_core_types::SurfaceError;
use thiserror::Error;

use crate::types::Criterion;

/// Locator error enumeration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocatorError {
    /// Polling budget exhausted without a match
    #[error("element not found after {attempts} attempts: {criterion}")]
    Timeout { criterion: Criterion, attempts: u32 },

    /// Surface failed in a way polling cannot recover from
    #[error("surface error: {0}")]
    Surface(#[from] SurfaceError),
}

impl LocatorError {
    /// Criterion that could not be satisfied, if this is a timeout
    pub fn criterion(&self) -> Option<&Criterion> {
        match self {
            LocatorError::Timeout { criterion, .. } => Some(criterion),
            LocatorError::Surface(_) => None,
        }
    }
}
