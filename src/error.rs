//! Operator-facing failure classes and the exit-code taxonomy.

/// Failure classes that abort the lifecycle sequence.
///
/// Each class maps to a distinct process exit code so schedulers and
/// wrapper scripts can tell a failed build from a failed backup.
/// Warnings (group membership, archival failures during a backup run)
/// are logged and never constructed as errors.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Container runtime installation failed.
    #[error("container runtime provisioning failed: {0}")]
    RuntimeProvision(String),

    /// Compose plugin installation failed.
    #[error("compose plugin installation failed: {0}")]
    ComposeInstall(String),

    /// Credential collection or persistence failed.
    #[error("credential configuration failed: {0}")]
    Credential(String),

    /// Image build failed. Any running instance is left untouched.
    #[error("image build failed: {0}")]
    Build(String),

    /// Containers failed to start.
    #[error("service start failed: {0}")]
    Start(String),

    /// Containers failed to stop.
    #[error("service stop failed: {0}")]
    Stop(String),

    /// Backup could not proceed at all.
    #[error("backup failed: {0}")]
    Backup(String),
}

impl DeployError {
    /// Process exit code for this class. Unclassified errors exit with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            DeployError::RuntimeProvision(_) => 2,
            DeployError::ComposeInstall(_) => 3,
            DeployError::Credential(_) => 4,
            DeployError::Build(_) => 5,
            DeployError::Start(_) => 6,
            DeployError::Stop(_) => 7,
            DeployError::Backup(_) => 8,
        }
    }
}
