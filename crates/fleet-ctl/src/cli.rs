use std::{collections::BTreeSet, path::PathBuf};

use anyhow::bail;
use clap::{ArgAction, Parser};
use fleet_core::orchestrator::{Action, Scope};
use fleet_model::{Tag, TagDistribution};
use fleet_observe::LoggerFormat;

/// Build, run, and configure a salt master plus a fleet of minion containers.
///
/// When several actions are given they run in the order
/// create, start, configure, stop, delete, purge.
#[derive(Debug, Parser)]
#[command(name = "fleet-ctl", version, disable_version_flag = true)]
pub struct Cli {
    /// Minion fleet: `count:base:version:source` groups separated by `,`
    #[arg(long, short = 't', env = "FLEET_SPEC", value_parser = TagDistribution::parse)]
    pub fleet: TagDistribution,

    /// Master build: `base:version:source`
    #[arg(long, env = "FLEET_MASTER", value_parser = Tag::parse_master)]
    pub master: Tag,

    /// JSON config file; flags given here override its values
    #[arg(long, env = "FLEET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base name of the master instance
    #[arg(long, short = 'M')]
    pub master_prefix: Option<String>,

    /// Base name of every minion instance
    #[arg(long, short = 'm')]
    pub minion_prefix: Option<String>,

    /// Docker CLI used for image builds
    #[arg(long, short = 'd')]
    pub docker: Option<PathBuf>,

    /// Docker engine API socket
    #[arg(long, env = "DOCKER_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Configuration agent port on every instance
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Concurrent per-minion jobs
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Mount the host selinuxfs read-only on /selinux (create only)
    #[arg(long, short = 'H')]
    pub selinux_hack: bool,

    /// Build images and create containers
    #[arg(long, short = 'c')]
    pub create: bool,

    /// Recreate containers and rebuild images that already exist (create only)
    #[arg(long, short = 'f')]
    pub force: bool,

    /// Start the master and restart the minions
    #[arg(long, short = 's')]
    pub start: bool,

    /// Push master and minion configuration to running instances
    #[arg(long, short = 'C')]
    pub configure: bool,

    /// Stop running instances
    #[arg(long, short = 'S')]
    pub stop: bool,

    /// Delete instances; implies --stop
    #[arg(long, short = 'D')]
    pub delete: bool,

    /// Remove the fleet's images
    #[arg(long)]
    pub purge: bool,

    /// Restrict the actions to one minion
    #[arg(long, short = 'i', value_parser = clap::value_parser!(u32).range(1..))]
    pub instance: Option<u32>,

    /// Show progress messages
    #[arg(long, short = 'V')]
    pub verbose: bool,

    /// Log output: text, json or journald
    #[arg(long)]
    pub log_format: Option<LoggerFormat>,

    /// Write Prometheus metrics here when the run ends
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,

    /// Print version
    #[arg(long, short = 'v', action = ArgAction::Version)]
    version: Option<bool>,
}

impl Cli {
    /// Requested actions. `delete` pulls in `stop`.
    pub fn actions(&self) -> BTreeSet<Action> {
        let flags = [
            (self.create, Action::Create),
            (self.start, Action::Start),
            (self.configure, Action::Configure),
            (self.stop || self.delete, Action::Stop),
            (self.delete, Action::Delete),
            (self.purge, Action::Purge),
        ];
        flags
            .into_iter()
            .filter_map(|(on, action)| on.then_some(action))
            .collect()
    }

    pub fn scope(&self) -> Scope {
        Scope::from(self.instance)
    }

    /// Flag combinations clap cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.actions().is_empty() {
            bail!(
                "no action given; pass at least one of --create, --start, --configure, --stop, --delete, --purge"
            );
        }
        if self.force && !self.create {
            bail!("--force can only be used with --create");
        }
        if self.selinux_hack && !self.create {
            bail!("--selinux-hack can only be used with --create");
        }
        if let Some(n) = self.instance {
            let total = self.fleet.total_count();
            if n > total {
                bail!("--instance {n} is outside the fleet (1..={total})");
            }
        }
        Ok(())
    }
}
