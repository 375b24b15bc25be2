pub mod catalog;
pub mod cli;
pub mod core;
pub mod services;
pub mod store;

pub use catalog::Catalog;
pub use cli::Command as AppCommand;

use crate::core::config::AppConfig;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Autocat starting...");

    let config_path = match config_path {
        Some(path) => PathBuf::from(path),
        None => AppConfig::default_config_path()?,
    };
    let config = AppConfig::load_from_path(&config_path)?;
    debug!("Loaded config: {config:#?}");

    let catalog = Catalog::open(&config)?;

    match command {
        AppCommand::Currency(cmd) => cli::currency::run(cmd, &catalog, &config, &config_path),
        AppCommand::Product(cmd) => cli::product::run(cmd, &catalog).await,
        AppCommand::Customer(cmd) => cli::customer::run_customer(cmd, &catalog).await,
        AppCommand::Comment(cmd) => cli::customer::run_comment(cmd, &catalog).await,
        AppCommand::Payment(cmd) => cli::payment::run(cmd, &catalog).await,
    }
}
