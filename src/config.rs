//! Deployment configuration. Every path the components touch is resolved
//! once here and passed in explicitly, so nothing below this layer relies
//! on filesystem conventions.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::commands::spec;

/// Fallback compose project name when neither the CLI nor the descriptor
/// names one. Also the backup archive prefix.
pub const DEFAULT_PROJECT_NAME: &str = "tgbot";

const COMPOSE_FILE_CANDIDATES: [&str; 4] = [
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// Optional CLI overrides for [`DeployConfig::resolve`].
#[derive(Debug, Default, Clone)]
pub struct DeployOverrides {
    pub project_dir: Option<PathBuf>,
    pub compose_file: Option<PathBuf>,
    pub project_name: Option<String>,
    pub env_file: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Compose project name, also the backup archive prefix.
    pub project_name: String,
    /// Directory holding the service's working state and the descriptor.
    pub project_dir: PathBuf,
    /// Composition descriptor handed to `docker compose -f`.
    pub compose_file: PathBuf,
    /// Env file carrying the bot token, wired into the composition.
    pub env_file: PathBuf,
    /// Directory receiving timestamped backup archives.
    pub backup_dir: PathBuf,
}

impl DeployConfig {
    /// Resolve the effective configuration from CLI overrides and
    /// defaults. The project name falls back to the descriptor's `name:`
    /// field when one is set.
    pub fn resolve(overrides: DeployOverrides) -> Result<Self> {
        let project_dir = match overrides.project_dir {
            Some(dir) => dir,
            None => env::current_dir().context("failed to resolve the current directory")?,
        };
        let compose_file = match overrides.compose_file {
            Some(file) => file,
            None => discover_compose_file(&project_dir)?,
        };
        let env_file = overrides
            .env_file
            .unwrap_or_else(|| project_dir.join(".env"));
        let project_name = overrides
            .project_name
            .or_else(|| descriptor_name(&compose_file))
            .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string());
        let backup_dir = overrides
            .backup_dir
            .unwrap_or_else(|| PathBuf::from(format!("/opt/{project_name}-backups")));

        Ok(Self {
            project_name,
            project_dir,
            compose_file,
            env_file,
            backup_dir,
        })
    }

    /// Archive path for a backup taken at `timestamp`
    /// (`<backup_dir>/<name>_backup_<timestamp>.tar.gz`).
    pub fn archive_path(&self, timestamp: &str) -> PathBuf {
        self.backup_dir
            .join(format!("{}_backup_{}.tar.gz", self.project_name, timestamp))
    }
}

fn discover_compose_file(project_dir: &Path) -> Result<PathBuf> {
    for candidate in COMPOSE_FILE_CANDIDATES {
        let path = project_dir.join(candidate);
        if path.exists() {
            return Ok(path);
        }
    }
    bail!(
        "no composition descriptor ({}) in {}",
        COMPOSE_FILE_CANDIDATES.join(", "),
        project_dir.display()
    );
}

fn descriptor_name(compose_file: &Path) -> Option<String> {
    spec::parse_spec(compose_file).ok()?.name
}
