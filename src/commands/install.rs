//! Initial bring-up: provision the host, configure the token, validate
//! the descriptor, then build and start the composition. Provisioning
//! failures abort before any service state is touched.

use anyhow::Result;

use crate::commands::lifecycle::{self, ComposeBackend};
use crate::commands::provision::{self, HostPackages, RuntimeEnvironment};
use crate::commands::secret::{self, CredentialSource};
use crate::commands::spec;
use crate::config::DeployConfig;

pub fn run_install(
    host: &mut dyn HostPackages,
    source: &dyn CredentialSource,
    backend: &dyn ComposeBackend,
    config: &DeployConfig,
) -> Result<RuntimeEnvironment> {
    let mut runtime_env = provision::ensure_runtime_present(host)?;
    runtime_env.compose_present = provision::ensure_compose_present(host)?;

    secret::configure(source, &config.env_file)?;

    let compose = spec::parse_spec(&config.compose_file)?;
    spec::validate(&compose, &config.env_file)?;

    lifecycle::up(backend, true)?;
    Ok(runtime_env)
}
