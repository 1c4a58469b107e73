//! Element location against an external, independently re-rendering surface
//!
//! This crate provides the two lowest layers of the handoff engine:
//! - `Locator`: exactly one scan of the surface, exact or substring text matching
//! - `RetryController`: bounded, strictly sequential polling around the locator
//! - `SurfacePort`: the boundary every surface implementation plugs into
//! - `fixture`: a scripted in-memory surface for dry runs and tests

pub mod errors;
pub mod fixture;
pub mod ports;
pub mod resolver;
pub mod retry;
pub mod types;

pub use errors::*;
pub use ports::*;
pub use resolver::*;
pub use retry::*;
pub use types::*;
