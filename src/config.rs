pub use taskfusion_core::config::*;

use crate::cli::{Cli, CliCommand};

pub fn from_cli(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::discover(cli.data_dir.clone())?;
    if let Some(backend) = cli.backend {
        config = config.with_backend(backend);
    }
    if let CliCommand::Focus(args) = &cli.command {
        config = config.with_timer(args.timer_config());
    }
    Ok(config)
}
