use action_flow::{ExecutionOutcome, Plan, RunReport};
use action_locator::fixture::SurfaceAction;
use anyhow::Result;
use chrono::SecondsFormat;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

/// Print any serializable value in a machine format; `false` for human.
pub fn print_structured<T: Serialize>(format: &OutputFormat, value: &T) -> Result<bool> {
    match format {
        OutputFormat::Human => Ok(false),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(true)
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(value)?);
            Ok(true)
        }
    }
}

pub fn render_plan(title: &str, plan: &Plan) -> String {
    let mut out = format!("{title} ({} steps)\n", plan.len());
    for step in plan.steps() {
        out.push_str(&format!(
            "{:>3}  {:<16} {:<22} {}\n",
            step.index,
            step.label(),
            step.kind.name(),
            step.criterion
        ));
    }
    out
}

pub fn render_report(report: &RunReport, actions: &[SurfaceAction]) -> String {
    let status = match &report.outcome {
        ExecutionOutcome::Completed => "completed".to_string(),
        ExecutionOutcome::Failed { reason, .. } => format!("failed: {reason}"),
    };
    let mut out = format!(
        "Run {} {} in {} ms ({} polls, started {})\n",
        report.run_id,
        status,
        report.latency_ms,
        report.total_polls(),
        report.started_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    );

    for step in &report.steps {
        out.push_str(&format!(
            "{:>3}  {:<16} {:<10} {} poll(s)\n",
            step.index,
            step.role.name(),
            format!("{:?}", step.phase).to_lowercase(),
            step.polls
        ));
    }

    if !report.anomalies.is_empty() {
        out.push_str("Anomalies:\n");
        for anomaly in &report.anomalies {
            out.push_str(&format!("  step {}: {:?}\n", anomaly.step_index, anomaly.anomaly));
        }
    }

    if !actions.is_empty() {
        out.push_str("Surface actions:\n");
        for action in actions {
            match action {
                SurfaceAction::Click { text } => out.push_str(&format!("  click \"{text}\"\n")),
                SurfaceAction::SetValue { text, value } => {
                    out.push_str(&format!("  set \"{text}\" = \"{value}\"\n"))
                }
            }
        }
    }
    out
}
