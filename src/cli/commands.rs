use clap::Subcommand;

use super::config::ConfigArgs;
use super::plan::PlanArgs;
use super::simulate::SimulateArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Print the step plan a catalog record would run
    Plan(PlanArgs),

    /// Run a catalog record against a scripted surface
    Simulate(SimulateArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),
}
