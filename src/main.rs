use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use botctl::commands::lifecycle::{self, ComposeBackend, DockerCompose};
use botctl::commands::provision::Host;
use botctl::commands::secret::{self, CredentialSource, EnvSource, PromptSource};
use botctl::commands::{BackupCoordinator, run_install};
use botctl::config::{DeployConfig, DeployOverrides};
use botctl::error::DeployError;

#[derive(Parser)]
#[command(name = "botctl")]
#[command(about = "Deployment lifecycle manager for the bot's compose stack", long_about = None)]
struct Cli {
    #[command(flatten)]
    deploy: DeployArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Paths and names shared by every subcommand.
#[derive(Args)]
struct DeployArgs {
    /// Directory holding the service state and the composition descriptor
    #[arg(long, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    /// Composition descriptor (discovered in the project dir when omitted)
    #[arg(short = 'f', long, value_name = "COMPOSE_YAML")]
    compose_file: Option<PathBuf>,

    /// Compose project name, also the backup archive prefix
    #[arg(long, value_name = "NAME")]
    project_name: Option<String>,

    /// Env file receiving the bot token
    #[arg(long, value_name = "FILE")]
    env_file: Option<PathBuf>,

    /// Directory receiving backup archives
    #[arg(long, value_name = "DIR")]
    backup_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Provision the host, configure the bot token and start the service")]
    Install {
        /// Read the token from this environment variable instead of prompting
        #[arg(long, value_name = "VAR")]
        token_env: Option<String>,
    },
    #[command(about = "Start the composition, optionally rebuilding images first")]
    Up {
        #[arg(long)]
        build: bool,
    },
    #[command(about = "Stop and remove the composition's containers")]
    Down,
    #[command(about = "Stop and start the composition")]
    Restart,
    #[command(about = "Snapshot the project directory while the service is stopped")]
    Backup,
    #[command(about = "Show whether the service is running and a token is configured")]
    Status,
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        let code = err
            .downcast_ref::<DeployError>()
            .map(DeployError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = DeployConfig::resolve(DeployOverrides {
        project_dir: cli.deploy.project_dir,
        compose_file: cli.deploy.compose_file,
        project_name: cli.deploy.project_name,
        env_file: cli.deploy.env_file,
        backup_dir: cli.deploy.backup_dir,
    })?;

    match cli.command {
        Commands::Install { token_env } => {
            let source: Box<dyn CredentialSource> = match token_env {
                Some(var) => Box::new(EnvSource { var }),
                None => Box::new(PromptSource {
                    prompt: "Enter your Telegram bot token".to_string(),
                }),
            };
            let backend = DockerCompose::new(&config);
            run_install(&mut Host, &*source, &backend, &config).map(|_| ())
        }
        Commands::Up { build } => lifecycle::up(&DockerCompose::new(&config), build),
        Commands::Down => lifecycle::down(&DockerCompose::new(&config)),
        Commands::Restart => lifecycle::restart(&DockerCompose::new(&config)),
        Commands::Backup => {
            let backend = DockerCompose::new(&config);
            BackupCoordinator::new(&backend, &config).run().map(|_| ())
        }
        Commands::Status => status(&config),
    }
}

fn status(config: &DeployConfig) -> Result<()> {
    let backend = DockerCompose::new(config);
    let running = backend.is_running()?;
    let token = secret::read_token(&config.env_file)?;

    println!("service: {}", if running { "running" } else { "stopped" });
    println!(
        "token: {}",
        if token.is_some() {
            "configured"
        } else {
            "not configured"
        }
    );
    Ok(())
}
