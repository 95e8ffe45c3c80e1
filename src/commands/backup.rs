//! Stop-archive-restart snapshots of the service working directory.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use chrono::Local;
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::warn;

use crate::commands::lifecycle::ComposeBackend;
use crate::config::DeployConfig;
use crate::error::DeployError;

/// Outcome of a backup run. The archive path is absent when archiving
/// failed but the service was still restarted.
#[derive(Debug)]
pub struct BackupReport {
    pub archive: Option<PathBuf>,
    pub archive_error: Option<String>,
}

pub struct BackupCoordinator<'a> {
    backend: &'a dyn ComposeBackend,
    config: &'a DeployConfig,
}

impl<'a> BackupCoordinator<'a> {
    pub fn new(backend: &'a dyn ComposeBackend, config: &'a DeployConfig) -> Self {
        Self { backend, config }
    }

    /// Stop the service, archive the project directory, restart the
    /// service, in that order. The stop must complete before the first
    /// byte is archived: archiving a live working directory tears the
    /// snapshot. The restart runs even when archiving fails.
    pub fn run(&self) -> Result<BackupReport> {
        let timestamp = timestamp_id();
        let archive_path = self.config.archive_path(&timestamp);

        self.backend
            .down()
            .map_err(|err| DeployError::Stop(format!("refusing to archive a running service: {err:#}")))?;

        let archived = archive_dir(&self.config.project_dir, &archive_path);
        if archived.is_err() {
            // Never leave a torn archive behind under a valid snapshot name.
            let _ = fs::remove_file(&archive_path);
        }

        let restarted = self.backend.up();

        if let Err(err) = &archived {
            warn!("backup archiving failed, restarting the service anyway: {err:#}");
        }
        restarted.map_err(|err| DeployError::Start(format!("{err:#}")))?;

        match archived {
            Ok(()) => {
                println!("Backup written to {}", archive_path.display());
                Ok(BackupReport {
                    archive: Some(archive_path),
                    archive_error: None,
                })
            }
            Err(err) => Ok(BackupReport {
                archive: None,
                archive_error: Some(format!("{err:#}")),
            }),
        }
    }
}

/// Second-resolution timestamp identifier. Two backups within the same
/// second collide on the same name; that edge is accepted, not
/// deduplicated.
pub fn timestamp_id() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Archive `src_dir` into a gzip-compressed tarball at `archive_path`,
/// creating the backup directory when absent.
pub fn archive_dir(src_dir: &Path, archive_path: &Path) -> Result<()> {
    if archive_path.starts_with(src_dir) {
        bail!(
            "backup directory {} must live outside the project directory {}",
            archive_path.display(),
            src_dir.display()
        );
    }

    let backup_dir = archive_path
        .parent()
        .ok_or_else(|| anyhow!("archive path {} has no parent", archive_path.display()))?;
    fs::create_dir_all(backup_dir)
        .with_context(|| format!("failed to create backup directory {}", backup_dir.display()))?;

    let file = File::create(archive_path)
        .with_context(|| format!("failed to create {}", archive_path.display()))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let root = src_dir
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| ".".into());
    builder
        .append_dir_all(&root, src_dir)
        .with_context(|| format!("failed to archive {}", src_dir.display()))?;

    let encoder = builder
        .into_inner()
        .context("failed to finish the archive")?;
    encoder
        .finish()
        .context("failed to flush the compressed archive")?;
    Ok(())
}
