use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

use crate::logger::error::LoggerError;

/// Timezone used for log timestamps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggerTimeZone {
    #[default]
    Utc,
    /// System timezone, detected once when the logger is installed.
    Local,
}

impl FromStr for LoggerTimeZone {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utc" => Ok(Self::Utc),
            "local" => Ok(Self::Local),
            _ => Err(LoggerError::InvalidTimeZone(s.to_string())),
        }
    }
}

impl fmt::Display for LoggerTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoggerTimeZone::Utc => "utc",
            LoggerTimeZone::Local => "local",
        })
    }
}

/// RFC3339 timestamps at a fixed offset.
///
/// Local offset detection is only reliable while the process is still
/// single-threaded, so the offset is resolved once in [`Rfc3339Timer::new`]
/// and falls back to UTC when detection fails.
#[derive(Debug, Clone, Copy)]
pub struct Rfc3339Timer {
    offset: UtcOffset,
}

impl Rfc3339Timer {
    pub fn new(tz: LoggerTimeZone) -> Self {
        let offset = match tz {
            LoggerTimeZone::Utc => UtcOffset::UTC,
            LoggerTimeZone::Local => UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        };
        Self { offset }
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }
}

impl FormatTime for Rfc3339Timer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let now = OffsetDateTime::now_utc().to_offset(self.offset);
        match now.format(&Rfc3339) {
            Ok(ts) => w.write_str(&ts),
            Err(_) => w.write_str("<invalid-time>"),
        }
    }
}
