//! `fleet-ctl`: command-line driver for a salt test cluster.
//!
//! The binary parses [`Cli`], resolves a [`CtlConfig`], installs the logger,
//! and hands both to [`app::execute`].
pub mod app;
pub mod cli;
pub mod settings;

pub use app::RunSummary;
pub use cli::Cli;
pub use settings::CtlConfig;
