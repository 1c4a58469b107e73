use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use action_flow::{DefaultFlowExecutor, ExecutionOutcome, RunReport};
use action_locator::fixture::{ScriptedSurface, SurfaceAction, SurfaceScript};
use anyhow::{anyhow, Context, Result};
use clap::Args;
use handoff_cli::config::parse_deadline;
use handoff_cli::HandoffTrigger;
use serde::Serialize;
use tokio::fs;
use tracing::warn;

use crate::cli::context::CliContext;
use crate::cli::output::{print_structured, render_report};
use crate::cli::plan::load_record;

#[derive(Args, Clone, Debug)]
pub struct SimulateArgs {
    /// Catalog JSON file (array of records)
    #[arg(long, value_name = "FILE")]
    pub catalog: PathBuf,

    /// Record id to hand off
    #[arg(long)]
    pub id: String,

    /// Scripted surface fixture (YAML)
    #[arg(long, value_name = "FIXTURE")]
    pub surface: PathBuf,

    /// Turn the wait-for-return switch on even if the record does not
    #[arg(long)]
    pub wait_for_return: bool,

    /// Abort between steps once this much time has passed (e.g. 30s)
    #[arg(long, value_parser = parse_deadline_arg)]
    pub deadline: Option<Duration>,
}

fn parse_deadline_arg(value: &str) -> Result<Duration, String> {
    parse_deadline(value).map_err(|err| err.to_string())
}

#[derive(Serialize)]
struct SimulationView<'a> {
    report: &'a RunReport,
    actions: &'a [SurfaceAction],
}

pub async fn cmd_simulate(args: SimulateArgs, ctx: &CliContext) -> Result<()> {
    let record = load_record(&args.catalog, &args.id).await?;
    let surface = Arc::new(ScriptedSurface::new(load_script(&args.surface).await?));

    let executor = DefaultFlowExecutor::new(surface.clone(), ctx.config().flow.clone())?;
    let deadline = match args.deadline {
        Some(deadline) => Some(deadline),
        None => ctx.config().trigger.deadline()?,
    };
    let trigger = HandoffTrigger::new(Arc::new(executor)).with_deadline(deadline);

    let cancel = trigger.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping before the next step");
            cancel.cancel();
        }
    });

    let wait = args.wait_for_return || ctx.config().trigger.wait_for_return;
    let report = trigger.fire_record(&record, wait).await?;
    let actions = surface.actions();

    let view = SimulationView {
        report: &report,
        actions: &actions,
    };
    if !print_structured(&ctx.output(), &view)? {
        print!("{}", render_report(&report, &actions));
    }

    match report.outcome {
        ExecutionOutcome::Completed => Ok(()),
        ExecutionOutcome::Failed { reason, .. } => Err(anyhow!(reason).context("handoff failed")),
    }
}

async fn load_script(path: &Path) -> Result<SurfaceScript> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read surface fixture {}", path.display()))?;
    serde_yaml::from_str(&raw).context("Failed to parse surface fixture")
}
