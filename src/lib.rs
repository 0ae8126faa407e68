pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

pub use crate::core::config;

use crate::cli::convert::ConvertArgs;
use crate::core::{ConversionForm, HistoryStore, RateSource};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Currencies { query: Option<String> },
    Convert(ConvertArgs),
    History { clear: bool, assume_yes: bool },
    Interactive,
}

/// Options shared by every command.
#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    pub config_path: Option<String>,
    /// Keep history in memory only.
    pub ephemeral: bool,
}

pub async fn run_command(command: AppCommand, options: &RunOptions) -> Result<()> {
    info!("fxconv starting...");

    let config = match options.config_path.as_deref() {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let rates: Arc<dyn RateSource> =
        Arc::new(providers::CurrencyApiClient::new(&config.api.base_url)?);

    let open_form = || -> Result<(ConversionForm, Arc<HistoryStore>)> {
        let storage = store::open_storage(&config, options.ephemeral)?;
        let history = Arc::new(HistoryStore::open(storage));
        let form = ConversionForm::new(Arc::clone(&rates), Arc::clone(&history), &config.defaults);
        Ok((form, history))
    };

    match command {
        AppCommand::Currencies { query } => {
            cli::currencies::run(rates.as_ref(), query.as_deref()).await
        }
        AppCommand::Convert(args) => {
            let (mut form, _) = open_form()?;
            cli::convert::run(&mut form, rates.as_ref(), args).await
        }
        AppCommand::History { clear, assume_yes } => {
            let (_, history) = open_form()?;
            cli::history::run(&history, clear, assume_yes)
        }
        AppCommand::Interactive => {
            let (mut form, history) = open_form()?;
            cli::interactive::run(&mut form, rates.as_ref(), &history).await
        }
    }
}
