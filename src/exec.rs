//! Plumbing for the external tools this crate drives (docker, apt-get,
//! sh, usermod). Every invocation blocks until the child exits.

use std::env;
use std::ffi::OsStr;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use nix::unistd::geteuid;
use tracing::debug;

/// Run a command inheriting stdio, failing on a non-zero exit.
pub fn run(program: &str, args: &[&str]) -> Result<()> {
    exec(program, args, false)
}

/// Run a command with elevated privileges. Prefixes `sudo` unless the
/// current effective user is already root.
pub fn run_elevated(program: &str, args: &[&str]) -> Result<()> {
    exec(program, args, true)
}

fn exec(program: &str, args: &[&str], elevate: bool) -> Result<()> {
    debug!("exec: {} {}", program, args.join(" "));
    let status = command(program, args, elevate)
        .status()
        .with_context(|| format!("failed to run {program}"))?;
    if !status.success() {
        bail!("{program} exited with status {status}");
    }
    Ok(())
}

fn command(program: &str, args: &[&str], elevate: bool) -> Command {
    if elevate && !geteuid().is_root() {
        let mut cmd = Command::new("sudo");
        cmd.arg(program).args(args);
        cmd
    } else {
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd
    }
}

/// Whether a command exits successfully, with its output discarded.
/// Spawn failures count as "no"; this is a presence probe, not an error
/// path.
pub fn probe(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Run a command and capture its stdout, failing on a non-zero exit.
pub fn output(program: &str, args: &[&str]) -> Result<String> {
    debug!("exec (capture): {} {}", program, args.join(" "));
    let out = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to run {program}"))?;
    if !out.status.success() {
        bail!(
            "{program} exited with status {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Resolve an executable by searching the entries of `PATH`.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    env::var_os("PATH").and_then(|path| find_in_path_list(&path, name))
}

fn find_in_path_list(list: &OsStr, name: &str) -> Option<PathBuf> {
    env::split_paths(list)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    path.is_file()
        && fs::metadata(path)
            .map(|meta| meta.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    fn touch_with_mode(path: &Path, mode: u32) {
        File::create(path).unwrap();
        let mut perms = fs::metadata(path).unwrap().permissions();
        perms.set_mode(mode);
        fs::set_permissions(path, perms).unwrap();
    }

    #[test]
    fn test_find_in_path_list() {
        let dir = tempdir().unwrap();
        touch_with_mode(&dir.path().join("mytool"), 0o755);

        let list = env::join_paths([dir.path()]).unwrap();
        let found = find_in_path_list(&list, "mytool").unwrap();
        assert_eq!(found, dir.path().join("mytool"));
        assert!(find_in_path_list(&list, "missing").is_none());
    }

    #[test]
    fn test_find_skips_non_executable() {
        let dir = tempdir().unwrap();
        touch_with_mode(&dir.path().join("notes.txt"), 0o644);

        let list = env::join_paths([dir.path()]).unwrap();
        assert!(find_in_path_list(&list, "notes.txt").is_none());
    }

    #[test]
    fn test_first_path_entry_wins() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        touch_with_mode(&first.path().join("mytool"), 0o755);
        touch_with_mode(&second.path().join("mytool"), 0o755);

        let list = env::join_paths([first.path(), second.path()]).unwrap();
        let found = find_in_path_list(&list, "mytool").unwrap();
        assert_eq!(found, first.path().join("mytool"));
    }
}
