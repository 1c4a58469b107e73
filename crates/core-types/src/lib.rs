use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Failure reported by the external surface while scanning or acting.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(tag = "kind", content = "detail", rename_all = "snake_case"))]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// Element was detached or re-rendered between the scan and the action
    #[error("stale element: {0}")]
    StaleElement(String),

    /// Surface could not be reached at all
    #[error("surface transport error: {0}")]
    Transport(String),

    /// Element exists but cannot take the requested action
    #[error("unsupported action: {0}")]
    Unsupported(String),
}

impl SurfaceError {
    /// Stale handles are expected on a re-rendering surface; polling loops
    /// may count them as a miss.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SurfaceError::StaleElement(_))
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to an element owned by the surface. Only valid until
/// the surface re-renders it.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ElementHandle(pub String);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One element as observed by a single scan.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ElementSnapshot {
    pub handle: ElementHandle,
    pub text: String,
}

impl ElementSnapshot {
    pub fn new(handle: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            handle: ElementHandle(handle.into()),
            text: text.into(),
        }
    }
}
