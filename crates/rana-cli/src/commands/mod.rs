//! Command implementations

mod config;
mod file;
mod schematisation;
mod watch;

use crate::cli::{Cli, Commands, FileCommand, SchematisationCommand};
use crate::config_loader::{load_config, settings_path};
use crate::errors::{missing_tenant, missing_token, CliError};
use crate::host::{ConsoleCommunication, DialoguerPrompt};
use crate::output::OutputWriter;
use anyhow::{Context, Result};
use rana_client::{EnvToken, RanaClient, ThreediClient};
use rana_core::config::LayeredConfig;
use rana_core::ports::CredentialProvider;
use rana_store::FileSettingsStore;
use rana_sync::SyncContext;
use std::path::PathBuf;
use std::sync::Arc;

const RANA_TOKEN_VAR: &str = "RANA_TOKEN";
const THREEDI_TOKEN_VAR: &str = "THREEDI_TOKEN";

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config = load_config(cli.config.as_deref(), cli.overrides())?;
    let app = App { config, settings_path: settings_path(cli.config.as_deref()), json: cli.json };

    let result = match cli.command {
        Commands::Schematisation(SchematisationCommand::Download(args)) => {
            schematisation::download(args, &app, &output).await
        }
        Commands::Schematisation(SchematisationCommand::Load(args)) => {
            schematisation::load(args, &app, &output)
        }
        Commands::Schematisation(SchematisationCommand::List) => schematisation::list(&app, &output),
        Commands::File(FileCommand::Download(args)) => file::download(args, &app, &output).await,
        Commands::File(FileCommand::Upload(args)) => file::upload(args, &app, &output).await,
        Commands::Watch(args) => watch::execute(args, &app, &output).await,
        Commands::Config => config::execute(&app, &output),
    };

    match result {
        Err(e) => match e.downcast_ref::<CliError>() {
            Some(cli_error) => {
                cli_error.display();
                std::process::exit(1);
            }
            None => Err(e),
        },
        ok => ok,
    }
}

/// Configuration plus factories for the collaborators commands need
pub struct App {
    pub config: LayeredConfig,
    pub settings_path: PathBuf,
    pub json: bool,
}

impl App {
    pub fn working_dir(&self) -> PathBuf {
        self.config.working_dir.value.clone()
    }

    pub fn settings(&self) -> Result<Arc<FileSettingsStore>> {
        let store = FileSettingsStore::open(&self.settings_path)
            .with_context(|| format!("Failed to open settings at {}", self.settings_path.display()))?;
        Ok(Arc::new(store))
    }

    pub fn communication(&self) -> Arc<ConsoleCommunication> {
        Arc::new(ConsoleCommunication::new(self.json))
    }

    pub fn threedi(&self) -> Result<Arc<ThreediClient>> {
        let credentials = token_from_env(THREEDI_TOKEN_VAR)?;
        Ok(Arc::new(ThreediClient::new(self.config.threedi_api_url.value.clone(), credentials)))
    }

    pub fn rana(&self) -> Result<Arc<RanaClient>> {
        let tenant = self.config.require_tenant().map_err(|_| missing_tenant())?;
        let credentials = token_from_env(RANA_TOKEN_VAR)?;
        Ok(Arc::new(RanaClient::new(self.config.api_url(), tenant, credentials)))
    }

    pub fn sync_context(&self) -> Result<SyncContext> {
        Ok(SyncContext::new(
            self.threedi()?,
            Arc::new(DialoguerPrompt),
            self.communication(),
            self.settings()?,
            self.working_dir(),
        ))
    }
}

/// Token provider for `var`, checked once up front for a clear error
fn token_from_env(var: &str) -> Result<Arc<dyn CredentialProvider>> {
    let provider = EnvToken::new(var);
    provider.token().map_err(|_| missing_token(var))?;
    Ok(Arc::new(provider))
}
