//! Compose lifecycle control. Reconciling an already-running instance and
//! tolerating a `down` with nothing running are the orchestration tool's
//! own guarantees; this layer only sequences operations on top of them.

use std::path::PathBuf;

use anyhow::Result;

use crate::config::DeployConfig;
use crate::error::DeployError;
use crate::exec;

/// Narrow capability surface over the orchestration tool.
pub trait ComposeBackend {
    /// Build the service images.
    fn build(&self) -> Result<()>;
    /// Start the composition detached. Reconciles an already-running
    /// instance instead of duplicating it.
    fn up(&self) -> Result<()>;
    /// Stop and remove the composition's containers. A no-op when
    /// nothing is running.
    fn down(&self) -> Result<()>;
    /// Whether any of the composition's containers are running.
    fn is_running(&self) -> Result<bool>;
}

/// `docker compose` backend.
pub struct DockerCompose {
    compose_file: PathBuf,
    project_name: String,
}

impl DockerCompose {
    pub fn new(config: &DeployConfig) -> Self {
        Self {
            compose_file: config.compose_file.clone(),
            project_name: config.project_name.clone(),
        }
    }

    fn base_args(&self) -> Vec<String> {
        vec![
            "compose".to_string(),
            "-f".to_string(),
            self.compose_file.display().to_string(),
            "--project-name".to_string(),
            self.project_name.clone(),
        ]
    }

    fn run(&self, tail: &[&str]) -> Result<()> {
        let mut args = self.base_args();
        args.extend(tail.iter().map(|arg| arg.to_string()));
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        exec::run("docker", &argv)
    }
}

impl ComposeBackend for DockerCompose {
    fn build(&self) -> Result<()> {
        self.run(&["build"])
    }

    fn up(&self) -> Result<()> {
        self.run(&["up", "-d"])
    }

    fn down(&self) -> Result<()> {
        self.run(&["down"])
    }

    fn is_running(&self) -> Result<bool> {
        let mut args = self.base_args();
        args.extend(
            ["ps", "--status", "running", "--quiet"]
                .iter()
                .map(|arg| arg.to_string()),
        );
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = exec::output("docker", &argv)?;
        Ok(!out.trim().is_empty())
    }
}

/// Build (when requested) and start the composition. The build runs
/// strictly before `up`, so a failed build never touches a running
/// instance.
pub fn up(backend: &dyn ComposeBackend, build: bool) -> Result<()> {
    if build {
        backend
            .build()
            .map_err(|err| DeployError::Build(format!("{err:#}")))?;
    }
    backend
        .up()
        .map_err(|err| DeployError::Start(format!("{err:#}")))?;
    println!("Service is up");
    Ok(())
}

pub fn down(backend: &dyn ComposeBackend) -> Result<()> {
    backend
        .down()
        .map_err(|err| DeployError::Stop(format!("{err:#}")))?;
    println!("Service is stopped");
    Ok(())
}

pub fn restart(backend: &dyn ComposeBackend) -> Result<()> {
    down(backend)?;
    up(backend, false)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_base_args_carry_file_and_project() {
        let config = DeployConfig {
            project_name: "tgbot".to_string(),
            project_dir: PathBuf::from("/srv/tgbot"),
            compose_file: PathBuf::from("/srv/tgbot/docker-compose.yml"),
            env_file: PathBuf::from("/srv/tgbot/.env"),
            backup_dir: PathBuf::from("/opt/tgbot-backups"),
        };
        let backend = DockerCompose::new(&config);
        assert_eq!(
            backend.base_args(),
            vec![
                "compose",
                "-f",
                "/srv/tgbot/docker-compose.yml",
                "--project-name",
                "tgbot",
            ]
        );
    }
}
