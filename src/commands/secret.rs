//! Bot-token collection and persistence into the env file consumed by
//! the composition's environment substitution.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::error::DeployError;

/// Env key the composition substitutes into the bot container.
pub const TOKEN_KEY: &str = "TELEGRAM_BOT_TOKEN";

const ENV_FILE_MODE: u32 = 0o600;

/// Where the token value comes from. The interactive prompt blocks on
/// operator input with no timeout; automated deployments substitute a
/// non-blocking source.
pub trait CredentialSource {
    fn token(&self) -> Result<String>;
}

/// Blocking interactive prompt on stdin.
pub struct PromptSource {
    pub prompt: String,
}

impl CredentialSource for PromptSource {
    fn token(&self) -> Result<String> {
        print!("{}: ", self.prompt);
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("failed to read the token from stdin")?;
        Ok(line.trim().to_string())
    }
}

/// Reads the token from a named environment variable.
pub struct EnvSource {
    pub var: String,
}

impl CredentialSource for EnvSource {
    fn token(&self) -> Result<String> {
        std::env::var(&self.var)
            .map(|value| value.trim().to_string())
            .with_context(|| format!("environment variable {} is not set", self.var))
    }
}

/// Collect a token and persist it as the single `KEY=VALUE` line of the
/// env file. Re-running fully replaces a stale token.
///
/// The value's format is not validated here; a malformed token surfaces
/// when the bot fails to authenticate. Only the empty string is rejected,
/// since it can never authenticate.
pub fn configure(source: &dyn CredentialSource, env_file: &Path) -> Result<()> {
    let token = source
        .token()
        .map_err(|err| DeployError::Credential(format!("{err:#}")))?;
    let token = token.trim();
    if token.is_empty() {
        return Err(DeployError::Credential("token must not be empty".to_string()).into());
    }
    write_env_file(env_file, token)?;
    println!("Token saved to {}", env_file.display());
    Ok(())
}

/// Write the token line, truncating any prior content. The file is
/// created owner-only readable.
pub fn write_env_file(env_file: &Path, token: &str) -> Result<()> {
    if let Some(parent) = env_file.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(ENV_FILE_MODE)
        .open(env_file)
        .with_context(|| format!("failed to open {}", env_file.display()))?;
    writeln!(file, "{TOKEN_KEY}={token}")
        .with_context(|| format!("failed to write {}", env_file.display()))?;

    tighten_permissions(env_file)
}

// The mode set through OpenOptions only applies on creation; a
// pre-existing file keeps whatever mode it had. A world-readable token
// file is a reportable misconfiguration, fixed after reporting.
fn tighten_permissions(env_file: &Path) -> Result<()> {
    let metadata = fs::metadata(env_file)?;
    let mode = metadata.permissions().mode() & 0o777;
    if mode & 0o077 != 0 {
        warn!(
            "{} was readable by other users (mode {:03o}), tightening to {:03o}",
            env_file.display(),
            mode,
            ENV_FILE_MODE
        );
        let mut perms = metadata.permissions();
        perms.set_mode(ENV_FILE_MODE);
        fs::set_permissions(env_file, perms)
            .with_context(|| format!("failed to restrict {}", env_file.display()))?;
    }
    Ok(())
}

/// Current token value, if one is configured.
pub fn read_token(env_file: &Path) -> Result<Option<String>> {
    if !env_file.exists() {
        return Ok(None);
    }
    for item in dotenvy::from_path_iter(env_file)
        .with_context(|| format!("failed to read {}", env_file.display()))?
    {
        let (key, value) = item?;
        if key == TOKEN_KEY {
            return Ok(Some(value));
        }
    }
    Ok(None)
}
