//! Idempotent host provisioning: the container runtime itself and the
//! compose plugin that drives multi-container applications.

use std::env;
use std::fs;

use anyhow::{Context, Result, anyhow};
use nix::unistd::{Group, User, geteuid, getgroups, getuid};
use tracing::{debug, warn};

use crate::error::DeployError;
use crate::exec;

pub const RUNTIME_BIN: &str = "docker";
const RUNTIME_GROUP: &str = "docker";
const COMPOSE_PACKAGE: &str = "docker-compose-plugin";
const INSTALL_SCRIPT_URL: &str = "https://get.docker.com";

/// Presence of the runtime pieces on this host after provisioning.
/// Fields only ever flip from false to true.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeEnvironment {
    pub runtime_present: bool,
    pub compose_present: bool,
    /// Whether runtime group membership is effective for the invoking
    /// user in the current session. A fresh `usermod` only takes effect
    /// at the next login.
    pub group_active: bool,
}

/// Narrow capability surface over the host's package state. The real
/// implementation shells out to the distribution tooling; tests
/// substitute a fake so idempotency is checkable without mutating a host.
pub trait HostPackages {
    fn has_runtime(&self) -> bool;
    fn has_compose(&self) -> bool;
    fn install_runtime(&mut self) -> Result<()>;
    fn install_compose(&mut self) -> Result<()>;
    /// Whether runtime group membership is already effective.
    fn group_membership_active(&self) -> Result<bool>;
    fn add_user_to_runtime_group(&mut self) -> Result<()>;
}

/// Ensure the container runtime is installed and usable without
/// elevation. Present runtime means a clean no-op; a failed installation
/// aborts provisioning. Group membership problems are reported and left
/// to manual remediation, never fatal.
pub fn ensure_runtime_present(host: &mut dyn HostPackages) -> Result<RuntimeEnvironment> {
    let mut runtime_env = RuntimeEnvironment::default();

    if host.has_runtime() {
        debug!("container runtime already installed, skipping");
    } else {
        println!("Installing the container runtime...");
        host.install_runtime()
            .map_err(|err| DeployError::RuntimeProvision(format!("{err:#}")))?;
    }
    runtime_env.runtime_present = true;

    match host.group_membership_active() {
        Ok(true) => runtime_env.group_active = true,
        Ok(false) => {
            if let Err(err) = host.add_user_to_runtime_group() {
                warn!(
                    "could not add the current user to the {RUNTIME_GROUP} group: {err:#}; \
                     run `sudo usermod -aG {RUNTIME_GROUP} $USER` manually"
                );
            } else {
                warn!(
                    "added the current user to the {RUNTIME_GROUP} group; \
                     membership takes effect at the next login session"
                );
            }
        }
        Err(err) => warn!("could not check {RUNTIME_GROUP} group membership: {err:#}"),
    }

    Ok(runtime_env)
}

/// Ensure the compose plugin is installed. Re-running on a provisioned
/// host is a no-op; a package-manager failure aborts the lifecycle.
pub fn ensure_compose_present(host: &mut dyn HostPackages) -> Result<bool> {
    if host.has_compose() {
        debug!("compose plugin already installed, skipping");
        return Ok(true);
    }
    println!("Installing the compose plugin...");
    host.install_compose()
        .map_err(|err| DeployError::ComposeInstall(format!("{err:#}")))?;
    Ok(true)
}

/// The real host: PATH probes, the upstream convenience script for the
/// runtime, the distribution package manager for the compose plugin.
pub struct Host;

impl HostPackages for Host {
    fn has_runtime(&self) -> bool {
        exec::find_executable(RUNTIME_BIN).is_some()
    }

    fn has_compose(&self) -> bool {
        exec::probe(RUNTIME_BIN, &["compose", "version"])
    }

    fn install_runtime(&mut self) -> Result<()> {
        let script = fetch_install_script()?;
        let script_path = env::temp_dir().join("get-docker.sh");
        fs::write(&script_path, script)
            .with_context(|| format!("failed to write {}", script_path.display()))?;
        let script_arg = script_path.display().to_string();
        exec::run_elevated("sh", &[script_arg.as_str()])
    }

    fn install_compose(&mut self) -> Result<()> {
        exec::run_elevated("apt-get", &["install", "-y", COMPOSE_PACKAGE])
    }

    fn group_membership_active(&self) -> Result<bool> {
        if geteuid().is_root() {
            return Ok(true);
        }
        let Some(group) = Group::from_name(RUNTIME_GROUP)? else {
            return Ok(false);
        };
        // Supplementary groups of this process reflect the login session,
        // not the passwd database.
        Ok(getgroups()?.contains(&group.gid))
    }

    fn add_user_to_runtime_group(&mut self) -> Result<()> {
        let user = User::from_uid(getuid())?
            .ok_or_else(|| anyhow!("current uid has no passwd entry"))?;
        exec::run_elevated("usermod", &["-aG", RUNTIME_GROUP, &user.name])
    }
}

fn fetch_install_script() -> Result<String> {
    let response = reqwest::blocking::get(INSTALL_SCRIPT_URL)
        .with_context(|| format!("failed to fetch {INSTALL_SCRIPT_URL}"))?
        .error_for_status()
        .with_context(|| format!("{INSTALL_SCRIPT_URL} returned an error status"))?;
    response
        .text()
        .context("failed to read the install script body")
}
