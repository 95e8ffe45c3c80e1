//! Deployment lifecycle manager for a single containerized Telegram bot
//! instance.
//!
//! The binary sequences four idempotent stages: provisioning the container
//! runtime, installing the compose plugin, persisting the bot token into
//! the env file, and driving `docker compose` to bring the composition up
//! or down. The backup coordinator stops the service, archives the project
//! directory and restarts the service, in that order; the restart is
//! attempted even when archiving fails.
//!
//! Exactly one orchestrator instance may run against a composition at a
//! time; concurrent runs against the same project are undefined behavior.
//! An interrupted backup can leave the service stopped, in which case
//! recovery is a manual `botctl up`.

pub mod commands;
pub mod config;
pub mod error;
pub mod exec;

// re-export selected public API
pub use commands::backup::{BackupCoordinator, BackupReport};
pub use commands::lifecycle::{ComposeBackend, DockerCompose};
pub use commands::provision::{HostPackages, RuntimeEnvironment};
pub use commands::secret::{CredentialSource, EnvSource, PromptSource};
pub use config::{DeployConfig, DeployOverrides};
pub use error::DeployError;
