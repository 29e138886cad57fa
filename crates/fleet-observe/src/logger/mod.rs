mod clock;
mod error;
mod format;
mod level;

pub use clock::{LoggerTimeZone, Rfc3339Timer};
pub use error::{LoggerError, LoggerResult};
pub use format::LoggerFormat;
pub use level::LoggerLevel;

use std::io::IsTerminal;

use serde::{Deserialize, Serialize};
use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logger configuration, usually embedded in the tool's config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: LoggerLevel,
    pub tz: LoggerTimeZone,
    /// Print the module path of each event.
    pub with_targets: bool,
    /// Allow ANSI colors (still off when stdout is not a terminal).
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: false,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Replace the level with the one implied by `--verbose`.
    pub fn with_verbosity(mut self, verbose: bool) -> Self {
        if verbose {
            self.level = LoggerLevel::for_verbosity(true);
        }
        self
    }

    fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }
}

/// Install the global tracing subscriber.
///
/// Call from `main()` before the tokio runtime starts so that
/// `LoggerTimeZone::Local` can detect the offset.
///
/// ```rust
/// use fleet_observe::{LoggerConfig, init_logger};
///
/// init_logger(&LoggerConfig::default()).expect("logger");
/// tracing::info!("ready");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    let filter = cfg.level.to_env_filter();
    let timer = Rfc3339Timer::new(cfg.tz);
    let registry = tracing_subscriber::registry().with(filter);

    match cfg.format {
        LoggerFormat::Text => install(
            registry.with(
                fmt::layer()
                    .with_ansi(cfg.should_use_color())
                    .with_target(cfg.with_targets)
                    .with_timer(timer),
            ),
        ),
        LoggerFormat::Json => install(
            registry.with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_target(cfg.with_targets)
                    .with_timer(timer),
            ),
        ),
        LoggerFormat::Journald => journald(registry),
    }
}

#[cfg(target_os = "linux")]
fn journald<S>(registry: S) -> LoggerResult<()>
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync + 'static,
{
    let layer =
        tracing_journald::layer().map_err(|e| LoggerError::JournaldInitFailed(e.to_string()))?;
    install(registry.with(layer))
}

#[cfg(not(target_os = "linux"))]
fn journald<S>(_registry: S) -> LoggerResult<()> {
    Err(LoggerError::JournaldNotSupported)
}

fn install<S>(subscriber: S) -> LoggerResult<()>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}
