//! mp3-capture CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mp3_capture::cli::{
    app::{load_merged_config, run_record, RecordOptions, EXIT_ERROR, EXIT_USAGE_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    presenter::Presenter,
};
use mp3_capture::domain::config::{AppConfig, EncoderPreference};
use mp3_capture::infrastructure::XdgConfigStore;

/// Logs go to stderr; `RUST_LOG` wins over `-v`
fn init_tracing(verbose: bool) {
    let default = if verbose { "mp3_capture=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let presenter = Presenter::new();

    // Handle subcommands
    if let Some(Commands::Config { action }) = cli.command {
        let store = XdgConfigStore::new();
        if let Err(e) = handle_config_command(action, &store, &presenter).await {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
        return ExitCode::SUCCESS;
    }

    // Build CLI config from args
    let cli_config = AppConfig {
        max_duration: cli.max_duration.clone(),
        max_size_bytes: cli.max_size,
        bitrate: cli.bitrate,
        sample_rate: cli.sample_rate,
        encoder: cli
            .inline_encoder
            .then(|| EncoderPreference::Inline.to_string()),
    };

    // Merge config
    let config = load_merged_config(cli_config).await;

    let options = match RecordOptions::from_config(&config, cli.json) {
        Ok(options) => options,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    run_record(options).await
}
