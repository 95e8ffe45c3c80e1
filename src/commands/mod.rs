pub use backup::{BackupCoordinator, BackupReport};
pub use install::run_install;
pub use lifecycle::{ComposeBackend, DockerCompose};
pub use provision::{Host, HostPackages, RuntimeEnvironment};
pub use secret::{CredentialSource, EnvSource, PromptSource};

pub mod backup;
pub mod install;
pub mod lifecycle;
pub mod provision;
pub mod secret;
pub mod spec;
