//! Wiring of the concrete collaborators and the end-of-run summary.
use std::{fmt, path::Path, process::ExitCode, sync::Arc};

use anyhow::Context;
use fleet_core::{MetricsHandle, error::CoreError, orchestrator::ClusterOrchestrator};
use fleet_exec::{agent::AgentClient, docker::DockerRuntime};
use fleet_observe::{ErrorChannelHandle, ErrorCollector, ErrorReport};
use fleet_prometheus::PrometheusMetrics;
use tracing::{error, info};

use crate::{cli::Cli, settings::CtlConfig};

/// What the operator is told once every requested action has run or one aborted.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Non-fatal failures, in the order they were reported.
    pub reports: Vec<ErrorReport>,
    /// The error that aborted the run, if any.
    pub fatal: Option<String>,
    pub fingerprint: Option<String>,
    pub addresses: usize,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.fatal.is_none() && self.reports.is_empty()
    }

    /// 0 when clean, 1 when some instances failed, 2 when the run aborted.
    pub fn status(&self) -> u8 {
        match (&self.fatal, self.reports.is_empty()) {
            (Some(_), _) => 2,
            (None, false) => 1,
            (None, true) => 0,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.status())
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(fp) = &self.fingerprint {
            writeln!(f, "master fingerprint: {fp}")?;
        }
        if self.addresses > 0 {
            writeln!(f, "minion addresses recorded: {}", self.addresses)?;
        }
        if !self.reports.is_empty() {
            writeln!(f, "{} instance error(s):", self.reports.len())?;
            for report in &self.reports {
                writeln!(f, "  {report}")?;
            }
        }
        if let Some(fatal) = &self.fatal {
            writeln!(f, "aborted: {fatal}")?;
        }
        Ok(())
    }
}

/// Build the docker/agent/prometheus stack and run the requested actions.
///
/// Errors returned here are setup failures (bad config, unreachable selinuxfs
/// lookup). Action failures end up in the [`RunSummary`].
pub async fn execute(cli: &Cli, config: CtlConfig) -> anyhow::Result<RunSummary> {
    let runtime = DockerRuntime::connect(&config.docker)
        .await
        .context("docker runtime")?;
    let agent = AgentClient::new(&config.agent).context("configuration agent")?;
    let metrics = PrometheusMetrics::new().context("metrics registry")?;
    let collector = Arc::new(ErrorCollector::new());

    let mut orchestrator = ClusterOrchestrator::new(
        config.cluster,
        cli.fleet.clone(),
        cli.master.clone(),
        Arc::new(runtime),
        Arc::new(agent),
        Arc::new(config.recipe),
    )
    .context("cluster setup")?
    .with_errors(collector.clone() as ErrorChannelHandle)
    .with_metrics(Arc::new(metrics.clone()) as MetricsHandle);

    let actions = cli.actions();
    info!(
        master = %orchestrator.state().master.name(),
        minions = orchestrator.state().minions.len(),
        actions = ?actions,
        "starting run"
    );
    let result = orchestrator.run(actions, cli.scope(), cli.force).await;

    if let Some(path) = &cli.metrics_file {
        write_metrics(&metrics, path).await?;
    }

    let state = orchestrator.state();
    Ok(RunSummary {
        reports: collector.reports(),
        fatal: result.err().map(|e| describe(&e)),
        fingerprint: state.master_fingerprint.clone(),
        addresses: state.ip_table.len(),
    })
}

fn describe(err: &CoreError) -> String {
    error!(kind = err.kind(), error = %err, "run aborted");
    format!("{err} [{}]", err.kind())
}

async fn write_metrics(metrics: &PrometheusMetrics, path: &Path) -> anyhow::Result<()> {
    let text = metrics.encode_text().context("encoding metrics")?;
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("writing metrics to {}", path.display()))
}
