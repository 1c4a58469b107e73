use std::path::{Path, PathBuf};

use action_flow::PlanBuilder;
use anyhow::{bail, Context, Result};
use clap::Args;
use handoff_cli::{Catalog, CatalogRecord};
use serde::Serialize;

use crate::cli::context::CliContext;
use crate::cli::output::{print_structured, render_plan};

#[derive(Args, Clone, Debug)]
pub struct PlanArgs {
    /// Catalog JSON file (array of records)
    #[arg(long, value_name = "FILE")]
    pub catalog: PathBuf,

    /// Record id to hand off
    #[arg(long)]
    pub id: String,

    /// Turn the wait-for-return switch on even if the record does not
    #[arg(long)]
    pub wait_for_return: bool,
}

#[derive(Serialize)]
struct PlanView<'a> {
    record: &'a CatalogRecord,
    plan: &'a action_flow::Plan,
}

pub async fn cmd_plan(args: PlanArgs, ctx: &CliContext) -> Result<()> {
    let record = load_record(&args.catalog, &args.id).await?;
    if !record.externo {
        bail!("record '{}' is not routed to external support", args.id);
    }

    let wait = args.wait_for_return || ctx.config().trigger.wait_for_return;
    let params = record.parameters(wait);
    params
        .validate()
        .with_context(|| format!("record '{}' cannot be handed off", args.id))?;

    let plan = PlanBuilder::new(&ctx.config().flow).build(&params);
    let view = PlanView {
        record: &record,
        plan: &plan,
    };
    if !print_structured(&ctx.output(), &view)? {
        print!(
            "{}",
            render_plan(&format!("Plan for record {} \"{}\"", record.display_id(), record.titulo), &plan)
        );
    }
    Ok(())
}

pub(crate) async fn load_record(catalog: &Path, id: &str) -> Result<CatalogRecord> {
    let catalog = Catalog::load(catalog)
        .await
        .with_context(|| format!("Failed to load catalog {}", catalog.display()))?;
    Ok(catalog.find(id)?.clone())
}
