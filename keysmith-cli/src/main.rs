//! Keysmith CLI
//!
//! Command-line interface for reading and writing secrets.
//!
//! # Usage
//!
//! ```bash
//! # List organizations and their workspaces
//! keysmith list-organizations
//! keysmith list-workspaces --organization 0a1b2c3d4e5f
//!
//! # List every secret of an environment, across all folders
//! keysmith list-secrets --workspace 012345abcdefg --environment dev
//!
//! # Print one value (no trailing newline)
//! keysmith print -w 012345abcdefg -e dev --key /folder/SECRET_KEY_1
//!
//! # Create, update and delete
//! keysmith create -w 012345abcdefg -e dev --key /folder/NEW_KEY --value NEW_VALUE
//! keysmith update -w 012345abcdefg -e dev --key /folder/NEW_KEY --value UPDATED
//! keysmith delete -w 012345abcdefg -e dev --key /folder/NEW_KEY
//! ```

mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use keysmith_client::{
    ClientConfig, CreateSecretOptions, DeleteSecretOptions, KeysmithClient, ListSecretsOptions,
    SecretLocation, SecretType, UpdateSecretOptions, WorkspaceId,
};

#[derive(Parser, Debug)]
#[command(name = "keysmith")]
#[command(about = "Read and write secrets with client-side end-to-end encryption")]
#[command(version)]
struct Cli {
    /// Dump HTTP requests and responses for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to <config dir>/keysmith/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List your organizations (needs an API key)
    ListOrganizations,

    /// List the workspaces of an organization (needs an API key)
    ListWorkspaces {
        /// Organization id
        #[arg(short, long)]
        organization: String,
    },

    /// List secrets of one folder, or of every folder when none is given
    ListSecrets {
        #[command(flatten)]
        target: Target,

        /// Folder path such as /folder1/folder2
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Print a secret value without a trailing newline
    Print {
        #[command(flatten)]
        secret: SecretArgs,
    },

    /// Create a secret
    Create {
        #[command(flatten)]
        secret: SecretArgs,

        /// Secret value
        #[arg(short = 's', long)]
        value: String,

        /// Secret comment
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// Update the value of a secret
    Update {
        #[command(flatten)]
        secret: SecretArgs,

        /// New secret value
        #[arg(short = 's', long)]
        value: String,

        /// New secret comment
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// Delete a secret
    Delete {
        #[command(flatten)]
        secret: SecretArgs,
    },
}

#[derive(Args, Debug)]
struct Target {
    /// Workspace id
    #[arg(short, long)]
    workspace: String,

    /// Environment slug (dev, staging, prod, ...)
    #[arg(short, long)]
    environment: String,
}

#[derive(Args, Debug)]
struct SecretArgs {
    #[command(flatten)]
    target: Target,

    /// Key path such as /folder/SECRET_KEY
    #[arg(short, long)]
    key: String,

    /// Secret type (shared or personal)
    #[arg(short = 't', long = "type")]
    secret_type: Option<SecretType>,
}

impl SecretArgs {
    fn location(&self) -> Result<SecretLocation> {
        SecretLocation::parse(&self.key).with_context(|| format!("invalid key path '{}'", self.key))
    }

    fn workspace(&self) -> WorkspaceId {
        WorkspaceId::new(self.target.workspace.as_str())
    }
}

fn init_tracing(verbose: bool) {
    let builder = FmtSubscriber::builder().with_writer(std::io::stderr);
    if verbose {
        builder.with_max_level(Level::DEBUG).init();
    } else {
        builder
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let config = match &cli.config {
        Some(path) => ClientConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => ClientConfig::load().context("Failed to load config")?,
    };

    let mut config = config.with_env_overrides();
    config.verbose |= cli.verbose;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(config.verbose);

    debug!(config_path = ?config.config_path, "Loaded configuration");
    let client = KeysmithClient::from_config(&config).context("Failed to build client")?;

    run(&client, cli.command).await
}

async fn run(client: &KeysmithClient, command: Commands) -> Result<()> {
    let mut stdout = std::io::stdout().lock();

    match command {
        Commands::ListOrganizations => {
            let organizations = client
                .list_organizations()
                .await
                .context("Failed to list organizations")?;
            write!(stdout, "{}", output::organizations(&organizations))?;
        }

        Commands::ListWorkspaces { organization } => {
            let workspaces = client
                .list_workspaces(&organization)
                .await
                .with_context(|| format!("Failed to list workspaces of {}", organization))?;
            write!(stdout, "{}", output::workspaces(&organization, &workspaces))?;
        }

        Commands::ListSecrets { target, folder } => {
            let workspace = WorkspaceId::new(target.workspace.as_str());
            let secrets = match folder {
                Some(folder) => {
                    let options = ListSecretsOptions::new().with_path(&folder);
                    client
                        .retrieve_secrets(&workspace, &target.environment, &options)
                        .await
                }
                None => {
                    client
                        .retrieve_all_secrets(&workspace, &target.environment)
                        .await
                }
            }
            .context("Failed to list secrets")?;
            write!(stdout, "{}", output::secrets(&secrets))?;
        }

        Commands::Print { secret } => {
            let secret_type = secret.secret_type.unwrap_or(SecretType::Personal);
            let value = client
                .retrieve_secret_value(
                    &secret.key,
                    &secret.workspace(),
                    &secret.target.environment,
                    secret_type,
                )
                .await
                .with_context(|| format!("Failed to read {}", secret.key))?;
            write!(stdout, "{}", value.expose())?;
        }

        Commands::Create { secret, value, comment } => {
            let location = secret.location()?;
            let mut options = CreateSecretOptions::new()
                .with_path(location.folder.as_str())
                .with_type(secret.secret_type.unwrap_or(SecretType::Shared));
            if let Some(comment) = comment {
                options = options.with_comment(comment);
            }
            client
                .create_secret(
                    &location.key,
                    &secret.workspace(),
                    &secret.target.environment,
                    &value,
                    &options,
                )
                .await
                .with_context(|| format!("Failed to create {}", location))?;
            writeln!(stdout, "Created {}", location)?;
        }

        Commands::Update { secret, value, comment } => {
            let location = secret.location()?;
            let mut options = UpdateSecretOptions::new()
                .with_path(location.folder.as_str())
                .with_type(secret.secret_type.unwrap_or(SecretType::Shared));
            if let Some(comment) = comment {
                options = options.with_comment(comment);
            }
            client
                .update_secret(
                    &location.key,
                    &secret.workspace(),
                    &secret.target.environment,
                    &value,
                    &options,
                )
                .await
                .with_context(|| format!("Failed to update {}", location))?;
            writeln!(stdout, "Updated {}", location)?;
        }

        Commands::Delete { secret } => {
            let location = secret.location()?;
            let options = DeleteSecretOptions::new()
                .with_path(location.folder.as_str())
                .with_type(secret.secret_type.unwrap_or(SecretType::Personal));
            client
                .delete_secret(
                    &location.key,
                    &secret.workspace(),
                    &secret.target.environment,
                    &options,
                )
                .await
                .with_context(|| format!("Failed to delete {}", location))?;
            writeln!(stdout, "Deleted {}", location)?;
        }
    }

    stdout.flush()?;
    Ok(())
}
