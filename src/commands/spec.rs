//! Composition descriptor model. Only the fields this tool interprets are
//! modeled; real descriptors carry many more keys, and `docker compose`
//! stays the consumer of record, so unknown fields pass through untouched.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Serialize, Deserialize)]
pub struct ComposeSpec {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub services: HashMap<String, ServiceSpec>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceSpec {
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub build: Option<BuildSpec>,

    #[serde(default)]
    pub env_file: Option<EnvFiles>,

    #[serde(default)]
    pub container_name: Option<String>,
}

/// `build:` is either a bare context path or a detailed mapping.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildSpec {
    Context(String),
    Detailed {
        context: String,
        #[serde(default)]
        dockerfile: Option<String>,
    },
}

/// `env_file:` accepts a single path or a list of paths.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvFiles {
    One(String),
    Many(Vec<String>),
}

impl EnvFiles {
    pub fn paths(&self) -> Vec<&str> {
        match self {
            EnvFiles::One(path) => vec![path.as_str()],
            EnvFiles::Many(paths) => paths.iter().map(String::as_str).collect(),
        }
    }
}

pub fn parse_spec(path: &Path) -> Result<ComposeSpec> {
    let reader = File::open(path)
        .with_context(|| format!("failed to open composition descriptor {}", path.display()))?;
    serde_yaml::from_reader(reader)
        .with_context(|| format!("composition descriptor {} is not valid YAML", path.display()))
}

/// The descriptor must declare at least one service. A service that does
/// not wire the env file never sees the token, which `docker compose`
/// will not complain about, so it is flagged here.
pub fn validate(spec: &ComposeSpec, env_file: &Path) -> Result<()> {
    if spec.services.is_empty() {
        bail!("composition descriptor declares no services");
    }

    let env_name = env_file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(".env");
    let wired = spec.services.values().any(|service| {
        service.env_file.as_ref().is_some_and(|files| {
            files.paths().iter().any(|path| {
                Path::new(path).file_name().and_then(|name| name.to_str()) == Some(env_name)
            })
        })
    });
    if !wired {
        warn!("no service in the descriptor reads {env_name}; the token will not reach the bot");
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_build_context_and_single_env_file() {
        let yaml = r#"
name: tgbot
services:
  tgbot:
    build: .
    restart: unless-stopped
    env_file: .env
"#;
        let spec: ComposeSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.name, Some("tgbot".to_string()));
        let service = &spec.services["tgbot"];
        assert!(matches!(service.build, Some(BuildSpec::Context(ref c)) if c == "."));
        assert_eq!(service.env_file.as_ref().unwrap().paths(), vec![".env"]);
    }

    #[test]
    fn test_parse_env_file_list_and_detailed_build() {
        let yaml = r#"
services:
  tgbot:
    build:
      context: .
      dockerfile: Dockerfile
    env_file:
      - .env
      - extra.env
"#;
        let spec: ComposeSpec = serde_yaml::from_str(yaml).unwrap();
        let service = &spec.services["tgbot"];
        assert!(matches!(service.build, Some(BuildSpec::Detailed { .. })));
        assert_eq!(
            service.env_file.as_ref().unwrap().paths(),
            vec![".env", "extra.env"]
        );
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let yaml = r#"
services:
  tgbot:
    image: tgbot:latest
    volumes:
      - ./downloads:/app/downloads
    ports:
      - "8443:8443"
"#;
        let spec: ComposeSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.services.len(), 1);
    }

    #[test]
    fn test_validate_rejects_empty_services() {
        let spec: ComposeSpec = serde_yaml::from_str("services: {}\n").unwrap();
        assert!(validate(&spec, &PathBuf::from("/srv/tgbot/.env")).is_err());
    }

    #[test]
    fn test_validate_accepts_wired_service() {
        let yaml = r#"
services:
  tgbot:
    build: .
    env_file:
      - .env
"#;
        let spec: ComposeSpec = serde_yaml::from_str(yaml).unwrap();
        assert!(validate(&spec, &PathBuf::from("/srv/tgbot/.env")).is_ok());
    }
}
