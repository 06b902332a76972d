use anyhow::{Context, Result};
use clap::Parser;

use taskfusion::cli::{Cli, CliCommand};
use taskfusion::Session;

fn main() -> Result<()> {
    let cli = Cli::parse();
    taskfusion::logging::init(cli.log_filter.clone())?;

    let config = taskfusion::config::from_cli(&cli)?;
    let mut session = Session::from_config(&config);
    let stdout = std::io::stdout();

    match cli.command {
        CliCommand::Focus(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to build tokio runtime")?;
            runtime.block_on(taskfusion::focus::run(&mut session, &args, stdout.lock()))?;
        }
        command => {
            taskfusion::commands::execute(&mut session, command, stdout.lock())?;
        }
    }

    Ok(())
}
