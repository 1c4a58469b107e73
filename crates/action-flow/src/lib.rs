//! Flow Orchestration Layer
//!
//! Builds the ordered step plan for one handoff run and drives it to
//! completion against the external surface: per-step settle delays,
//! conditional step injection, exact vs substring matching, and the
//! dedicated bounded loops for slow-rendering option lists.

pub mod errors;
pub mod events;
pub mod executor;
pub mod plan;
pub mod policy;
mod strategies;
mod tempo;
pub mod types;

pub use errors::FlowError;
pub use events::{EventsPort, TracingEvents};
pub use executor::{DefaultFlowExecutor, FlowExecutor};
pub use plan::PlanBuilder;
pub use policy::{FlowLabels, FlowPolicy, FlowSelectors, FlowTimings};
pub use types::*;
