use clap::Parser;
use seatwatch::app::App;
use seatwatch::cli::Args;
use seatwatch::config::Config;
use seatwatch::logging::setup_logging;
use std::process::ExitCode;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Config is loaded before logging so a bad value is reported even without a subscriber.
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = setup_logging(&config, args.tracing) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    let command = args.selected_command();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        command = ?command,
        "starting seatwatch"
    );

    App::new(config).run(command).await
}
