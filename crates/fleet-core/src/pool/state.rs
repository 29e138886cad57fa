use std::fmt;

use thiserror::Error;

/// Pool lifecycle. Moves forward only: `Idle → Running → Draining → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PoolState {
    /// Created; jobs may be queued but nothing runs yet.
    Idle,
    /// Workers are pulling jobs.
    Running,
    /// `drain()` is waiting for outstanding jobs; new jobs are refused.
    Draining,
    /// Barrier passed, workers told to exit.
    Stopped,
}

impl PoolState {
    #[inline]
    pub fn accepts_jobs(&self) -> bool {
        matches!(self, PoolState::Idle | PoolState::Running)
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PoolState::Idle => "idle",
            PoolState::Running => "running",
            PoolState::Draining => "draining",
            PoolState::Stopped => "stopped",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("pool is {0}; no more jobs accepted")]
    Closed(PoolState),

    #[error("pool already started (state: {0})")]
    AlreadyStarted(PoolState),

    #[error("pool has {0} queued jobs but was never started")]
    NotStarted(usize),

    #[error("worker count must be at least 1")]
    NoWorkers,
}
