use clap::{Args, Parser, Subcommand};
use rana_core::config::CliConfigOverrides;
use std::path::PathBuf;

/// Rana - Schematisation sync and project files for Rana Water Intelligence
#[derive(Parser, Debug)]
#[command(name = "rana")]
#[command(about = "Schematisation sync and project files for Rana Water Intelligence", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Rana base URL
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Tenant to work in
    #[arg(long, global = true)]
    pub tenant: Option<String>,

    /// Directory where schematisations and project files are stored
    #[arg(long, global = true, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn overrides(&self) -> CliConfigOverrides {
        CliConfigOverrides {
            base_url: self.base_url.clone(),
            tenant: self.tenant.clone(),
            working_dir: self.working_dir.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download, load and list schematisations
    #[command(subcommand)]
    Schematisation(SchematisationCommand),

    /// Transfer project files
    #[command(subcommand)]
    File(FileCommand),

    /// Follow jobs and publications of a project until interrupted
    Watch(WatchArgs),

    /// Show the effective configuration and where each value comes from
    Config,
}

#[derive(Subcommand, Debug)]
pub enum SchematisationCommand {
    /// Download a remote revision and load it
    Download(DownloadArgs),

    /// Load a locally stored schematisation
    Load(LoadArgs),

    /// List locally stored schematisations
    List,
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Schematisation id
    pub id: i64,

    /// Revision id (defaults to the latest revision)
    #[arg(long)]
    pub revision: Option<i64>,
}

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Schematisation id
    pub id: i64,
}

#[derive(Subcommand, Debug)]
pub enum FileCommand {
    /// Download a project file into the working directory
    Download(FileArgs),

    /// Upload a file from the working directory to its project
    Upload(FileArgs),
}

#[derive(Args, Debug)]
pub struct FileArgs {
    /// Project id
    pub project: String,

    /// File path within the project
    pub path: String,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Project id
    pub project: String,
}
