use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::context::CliContext;
use crate::cli::output::print_structured;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (default)
    Show,

    /// Print the path the configuration was looked up at
    Path,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    match args.action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            if !print_structured(&ctx.output(), ctx.config())? {
                println!("Effective configuration ({}):", ctx.config_path().display());
                print!("{}", ctx.config().to_yaml()?);
            }
        }
        ConfigAction::Path => println!("{}", ctx.config_path().display()),
    }
    Ok(())
}
