use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("instance number {instance} is outside the fleet range 1..={total}")]
    Naming { instance: u32, total: u32 },

    #[error("unknown package source: {0}")]
    UnknownPackageSource(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
