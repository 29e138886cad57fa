//! Observability for the fleet tools: logger setup and the operator error channel.
mod logger;
pub use logger::*;

mod report;
pub use report::{
    ErrorChannel, ErrorChannelHandle, ErrorCollector, ErrorReport, TracingErrorChannel,
    tracing_channel,
};
