use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use botctl::commands::lifecycle::ComposeBackend;
use botctl::commands::provision::HostPackages;
use botctl::commands::secret::CredentialSource;
use botctl::config::DeployConfig;

/// Calls recorded by [`FakeBackend`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum BackendEvent {
    Build,
    Down,
    Up { archive_present: bool },
}

/// Test double standing in for `docker compose`. `down` optionally drops
/// a marker file into the project dir, so an archive taken afterwards
/// proves the service was stopped before archiving started; `up` records
/// whether the backup directory already holds an archive.
#[derive(Default)]
pub struct FakeBackend {
    pub events: Mutex<Vec<BackendEvent>>,
    pub running: Mutex<bool>,
    pub stop_marker: Option<PathBuf>,
    pub archive_probe_dir: Option<PathBuf>,
    pub fail_build: bool,
    pub fail_down: bool,
}

#[allow(dead_code)]
impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BackendEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ComposeBackend for FakeBackend {
    fn build(&self) -> Result<()> {
        if self.fail_build {
            anyhow::bail!("simulated build failure");
        }
        self.events.lock().unwrap().push(BackendEvent::Build);
        Ok(())
    }

    fn up(&self) -> Result<()> {
        let archive_present = self
            .archive_probe_dir
            .as_deref()
            .map(dir_has_entries)
            .unwrap_or(false);
        self.events
            .lock()
            .unwrap()
            .push(BackendEvent::Up { archive_present });
        *self.running.lock().unwrap() = true;
        Ok(())
    }

    fn down(&self) -> Result<()> {
        if self.fail_down {
            anyhow::bail!("simulated stop failure");
        }
        if let Some(marker) = &self.stop_marker {
            fs::write(marker, "stopped")?;
        }
        self.events.lock().unwrap().push(BackendEvent::Down);
        *self.running.lock().unwrap() = false;
        Ok(())
    }

    fn is_running(&self) -> Result<bool> {
        Ok(*self.running.lock().unwrap())
    }
}

fn dir_has_entries(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Test double for the host's package state, counting installations.
#[derive(Default)]
#[allow(dead_code)]
pub struct FakeHost {
    pub runtime: bool,
    pub compose: bool,
    pub in_group: bool,
    pub runtime_installs: usize,
    pub compose_installs: usize,
}

impl HostPackages for FakeHost {
    fn has_runtime(&self) -> bool {
        self.runtime
    }

    fn has_compose(&self) -> bool {
        self.compose
    }

    fn install_runtime(&mut self) -> Result<()> {
        self.runtime_installs += 1;
        self.runtime = true;
        Ok(())
    }

    fn install_compose(&mut self) -> Result<()> {
        self.compose_installs += 1;
        self.compose = true;
        Ok(())
    }

    fn group_membership_active(&self) -> Result<bool> {
        Ok(self.in_group)
    }

    fn add_user_to_runtime_group(&mut self) -> Result<()> {
        self.in_group = true;
        Ok(())
    }
}

/// Credential source returning a fixed value.
#[allow(dead_code)]
pub struct StaticSource(pub &'static str);

impl CredentialSource for StaticSource {
    fn token(&self) -> Result<String> {
        Ok(self.0.to_string())
    }
}

#[allow(dead_code)]
pub fn test_config(project_dir: &Path, backup_dir: &Path) -> DeployConfig {
    DeployConfig {
        project_name: "tgbot".to_string(),
        project_dir: project_dir.to_path_buf(),
        compose_file: project_dir.join("docker-compose.yml"),
        env_file: project_dir.join(".env"),
        backup_dir: backup_dir.to_path_buf(),
    }
}

/// Minimal descriptor wiring the env file into a single service.
#[allow(dead_code)]
pub fn write_descriptor(project_dir: &Path) {
    fs::write(
        project_dir.join("docker-compose.yml"),
        r#"name: tgbot
services:
  tgbot:
    build: .
    restart: unless-stopped
    env_file:
      - .env
"#,
    )
    .unwrap();
}
