use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use fxconv::cli::convert::ConvertArgs;
use fxconv::core::amount::parse_amount;
use fxconv::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Keep conversion history in memory for this run only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// List available currencies
    Currencies {
        /// Filter by code or name
        query: Option<String>,
    },
    /// Convert an amount between two currencies
    Convert {
        /// Amount to convert, at most two decimal places
        #[arg(value_parser = parse_amount)]
        amount: Option<f64>,
        /// Source currency code
        #[arg(short, long)]
        from: Option<String>,
        /// Target currency code
        #[arg(short, long)]
        to: Option<String>,
        /// Use the rate of a past date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Convert back the other way after the first result
        #[arg(short, long)]
        swap: bool,
    },
    /// Show past conversions
    History {
        /// Clear all saved conversions
        #[arg(long)]
        clear: bool,
        /// Do not ask for confirmation
        #[arg(short, long, requires = "clear")]
        yes: bool,
    },
    /// Fill in the conversion form line by line
    Interactive,
}

impl From<Commands> for fxconv::AppCommand {
    fn from(cmd: Commands) -> fxconv::AppCommand {
        match cmd {
            Commands::Currencies { query } => fxconv::AppCommand::Currencies { query },
            Commands::Convert {
                amount,
                from,
                to,
                date,
                swap,
            } => fxconv::AppCommand::Convert(ConvertArgs {
                amount,
                from,
                to,
                date,
                swap,
            }),
            Commands::History { clear, yes } => fxconv::AppCommand::History {
                clear,
                assume_yes: yes,
            },
            Commands::Interactive => fxconv::AppCommand::Interactive,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let options = fxconv::RunOptions {
        config_path: cli.config_path,
        ephemeral: cli.ephemeral,
    };

    let result = match cli.command {
        Some(Commands::Setup) => fxconv::cli::setup::setup(),
        Some(cmd) => fxconv::run_command(cmd.into(), &options).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
