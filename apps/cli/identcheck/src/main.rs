use identcheck::cli::{Cli, Command};
use identcheck::commands::{self, resolve_config};
use identcheck::error::IdentcheckError;
use identcheck::logger::{initialize as LoggerInitialize, level_for};

use ident_core::{IdentClient, SameUserEvaluator};

use std::process::ExitCode;

use clap::Parser;
use log::{debug, error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logger FIRST
    if let Err(e) = LoggerInitialize(cli.global.log_dir.as_deref(), level_for(cli.global.verbose))
    {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, IdentcheckError> {
    match dotenvy::dotenv() {
        Ok(path) => info!("Loaded .env from: {}", path.display()),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => return Err(IdentcheckError::identcheck(format!("Invalid .env file: {e}"))),
    }

    let config = resolve_config(&cli.global)?;
    debug!("Ident config: port {}, timeout {}s", config.port, config.timeout_secs);

    let client = IdentClient::new(config);

    match cli.command {
        Command::Query(args) => commands::query::run(&client, &args).await,
        Command::SameUser(args) => {
            let evaluator = SameUserEvaluator::initialize()?;
            commands::same_user::run(&client, &evaluator, &args).await
        }
        Command::Whoami => {
            let evaluator = SameUserEvaluator::initialize()?;
            commands::whoami::run(&evaluator)
        }
        Command::Serve(args) => {
            let evaluator = SameUserEvaluator::initialize()?;
            commands::serve::run(args.listen, client, evaluator).await
        }
    }
}
