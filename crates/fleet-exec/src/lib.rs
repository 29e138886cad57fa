mod error;
pub use error::ExecError;

pub mod http;
pub mod recipe;
pub use recipe::DockerfileRecipe;

pub mod selinux;

#[cfg(feature = "agent")]
pub mod agent;

#[cfg(all(feature = "docker", unix))]
pub mod docker;

#[cfg(test)]
pub(crate) mod testing;
