pub mod toml_config;

pub use toml_config::ProvisionerConfig;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "scheduler-provisioner")]
#[command(about = "Prepare a GCP project for scheduled Notebook runs")]
pub struct CliConfig {
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Print results and logs as JSON")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show which services are enabled and which resources exist
    Status,
    /// Enable missing APIs, then create the bucket and Cloud Function
    Init,
    /// Create the App Engine application that hosts Cloud Scheduler
    CreateApp {
        #[arg(long)]
        region: String,
    },
    /// List regions where an App Engine application can be created
    AppLocations,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 有指定 `--config` 時從檔案載入，否則使用預設值
    pub fn load_provisioner_config(&self) -> Result<ProvisionerConfig> {
        match &self.config {
            Some(path) => ProvisionerConfig::from_file(path),
            None => Ok(ProvisionerConfig::default()),
        }
    }
}
