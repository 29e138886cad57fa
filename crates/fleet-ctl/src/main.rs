use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use fleet_ctl::{Cli, CtlConfig, app};
use fleet_observe::init_logger;

fn main() -> Result<ExitCode> {
    // 1) flags + config
    let cli = Cli::parse();
    cli.validate()?;
    let config = CtlConfig::resolve(&cli)?;

    // 2) logger, before the runtime so the local offset can be read
    init_logger(&config.logger)?;
    debug!(config = ?config, "configuration resolved");

    // 3) runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    // 4) actions
    let summary = runtime.block_on(app::execute(&cli, config))?;
    print!("{summary}");
    info!(status = summary.status(), "run finished");
    Ok(summary.exit_code())
}
