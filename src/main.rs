//! Birdsight CLI application
//!
//! Command-line client for the streaming bird identification backend.

use std::process;

use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use birdsight::cli::{
    handle_auth, handle_feedback, handle_history, handle_identify, handle_media, handle_usage,
    Cli, Commands,
};
use birdsight::config::{AppConfig, LoggingConfig};
use birdsight::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!("{} failure: {}", e.category(), e);
        eprintln!("Error: {}", e.user_message());
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    // Logging follows the loaded config, so it starts after loading
    if cli.global.config.is_none() {
        AppConfig::initialize_first_run().await?;
    }
    let mut config = AppConfig::load(cli.global.config.clone()).await?;

    init_logging(&cli, &config.logging)?;

    info!("Birdsight v{} starting", env!("CARGO_PKG_VERSION"));

    if let Some(base_url) = &cli.global.base_url {
        config.client.base_url = base_url.clone();
    }

    match cli.command {
        Commands::Identify(args) => {
            info!("Executing identify command");
            handle_identify(args, &config).await
        }
        Commands::Media(args) => {
            info!("Executing media command");
            handle_media(args, &config).await
        }
        Commands::Usage(args) => {
            info!("Executing usage command");
            handle_usage(args, &config).await
        }
        Commands::History(args) => {
            info!("Executing history command");
            handle_history(args, &config).await
        }
        Commands::Feedback(args) => {
            info!("Executing feedback command");
            handle_feedback(args, &config).await
        }
        Commands::Auth(args) => {
            info!("Executing auth command");
            handle_auth(args, &config).await
        }
    }
}

/// Initialize logging from the `[logging]` section and CLI verbosity flags
fn init_logging(cli: &Cli, logging: &LoggingConfig) -> Result<()> {
    let log_level = cli.log_level(logging.level()?);

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("birdsight={}", log_level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .with_ansi(logging.colored_output)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
    Ok(())
}
