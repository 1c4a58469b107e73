use super::config::cmd_config;
use super::env::CliArgs;
use super::plan::cmd_plan;
use super::simulate::cmd_simulate;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Plan(args) => cmd_plan(args, ctx).await,
        Commands::Simulate(args) => cmd_simulate(args, ctx).await,
        Commands::Config(args) => cmd_config(args, ctx).await,
    }
}
