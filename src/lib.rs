//! Handoff library
//!
//! Exposes modules for integration testing

pub mod catalog;
pub mod config;
pub mod trigger;

pub use catalog::{Catalog, CatalogError, CatalogRecord};
pub use config::{Config, ConfigError, TriggerSettings};
pub use trigger::{HandoffTrigger, TriggerError};
