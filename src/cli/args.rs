//! Command-line argument parsing for Birdsight
//!
//! This module defines the CLI structure using clap derive macros: running an
//! identification, looking up media, inspecting usage credits, managing the
//! local history, sending feedback and managing credentials.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::app::models::FeedbackType;

/// Birdsight - Identify birds from photos and recordings
#[derive(Parser, Debug)]
#[command(
    name = "birdsight",
    version,
    about = "Identify birds from photos and sound recordings",
    long_about = "A client for a streaming bird identification backend.
Shows candidates as they arrive, decorates them with photos and sounds, and keeps a local history."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the backend base URL
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Identify a bird from a photo and/or a recording
    Identify(IdentifyArgs),

    /// Look up photos, range map and sounds for a species
    Media(MediaArgs),

    /// Show or consume usage credits
    Usage(UsageArgs),

    /// Manage the local search history
    History(HistoryArgs),

    /// Send feedback about a result
    Feedback(FeedbackArgs),

    /// Manage authentication credentials
    Auth(AuthArgs),
}

/// Arguments for the identify command
#[derive(Args, Debug, Clone)]
pub struct IdentifyArgs {
    /// Photo to identify
    #[arg(short, long, value_name = "FILE")]
    pub image: Option<PathBuf>,

    /// Sound recording to identify
    #[arg(short, long, value_name = "FILE")]
    pub audio: Option<PathBuf>,

    /// Do not record the top result in the history
    #[arg(long)]
    pub no_history: bool,

    /// Do not consume a usage credit
    #[arg(long)]
    pub no_count: bool,

    /// Print the full candidate records as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the media command
#[derive(Args, Debug, Clone)]
pub struct MediaArgs {
    /// Scientific name, e.g. "Erithacus rubecula"
    #[arg(value_name = "SCIENTIFIC_NAME")]
    pub scientific_name: String,

    /// Print the full media record as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for usage management
#[derive(Args, Debug)]
pub struct UsageArgs {
    #[command(subcommand)]
    pub action: UsageAction,
}

/// Usage actions
#[derive(Subcommand, Debug)]
pub enum UsageAction {
    /// Show used and remaining credits
    Show,

    /// Consume one credit
    Increment,
}

/// Arguments for history management
#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub action: HistoryAction,
}

/// History actions
#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// List entries, most recent first
    List,

    /// Record an entry by hand
    Add {
        /// Entry id (usually the scientific name)
        id: String,

        /// Name stored with the entry
        #[arg(long)]
        name: Option<String>,

        /// Display name; falls back to the name
        #[arg(long)]
        display_name: Option<String>,

        /// Thumbnail URL
        #[arg(long)]
        thumbnail: Option<String>,
    },

    /// Remove all entries
    Clear,
}

/// Feedback kinds accepted on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Like,
    IncorrectId,
    ContentError,
    Suggestion,
}

impl From<FeedbackKind> for FeedbackType {
    fn from(kind: FeedbackKind) -> Self {
        match kind {
            FeedbackKind::Like => FeedbackType::Like,
            FeedbackKind::IncorrectId => FeedbackType::IncorrectId,
            FeedbackKind::ContentError => FeedbackType::ContentError,
            FeedbackKind::Suggestion => FeedbackType::Suggestion,
        }
    }
}

/// Arguments for the feedback command
#[derive(Args, Debug, Clone)]
pub struct FeedbackArgs {
    /// Scientific name the feedback is about
    #[arg(value_name = "SCIENTIFIC_NAME")]
    pub scientific_name: String,

    /// Kind of feedback
    #[arg(short = 't', long = "type", value_enum)]
    pub kind: FeedbackKind,

    /// Section of the result the feedback refers to
    #[arg(long)]
    pub section: Option<String>,

    /// Free-text message
    #[arg(short, long)]
    pub message: Option<String>,

    /// Media URL the feedback refers to
    #[arg(long)]
    pub media_url: Option<String>,
}

/// Arguments for authentication management
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// Authentication actions
#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Store an API token and user id
    Setup,

    /// Show authentication status
    Status,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level: verbosity flags win over the configured level
    pub fn log_level(&self, configured: tracing::Level) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            configured
        }
    }
}

impl IdentifyArgs {
    /// At least one capture must be given
    pub fn validate(&self) -> Result<(), String> {
        if self.image.is_none() && self.audio.is_none() {
            return Err("Provide --image, --audio or both".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_args_validation() {
        let mut args = IdentifyArgs {
            image: None,
            audio: None,
            no_history: false,
            no_count: false,
            json: false,
        };
        assert!(args.validate().is_err());

        args.audio = Some(PathBuf::from("song.m4a"));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_feedback_command() {
        let cli = Cli::try_parse_from([
            "birdsight",
            "feedback",
            "Turdus merula",
            "--type",
            "incorrect-id",
            "-m",
            "Looks like a thrush",
        ])
        .unwrap();

        match cli.command {
            Commands::Feedback(args) => {
                assert_eq!(args.scientific_name, "Turdus merula");
                assert_eq!(FeedbackType::from(args.kind), FeedbackType::IncorrectId);
                assert_eq!(args.message.as_deref(), Some("Looks like a thrush"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_log_level() {
        let cli_quiet = Cli::try_parse_from(["birdsight", "-q", "auth", "status"]).unwrap();
        let cli_verbose = Cli::try_parse_from(["birdsight", "usage", "show", "-v"]).unwrap();
        let cli_debug =
            Cli::try_parse_from(["birdsight", "--very-verbose", "history", "list"]).unwrap();

        assert_eq!(cli_quiet.log_level(tracing::Level::TRACE), tracing::Level::ERROR);
        assert_eq!(cli_verbose.log_level(tracing::Level::WARN), tracing::Level::INFO);
        assert_eq!(cli_debug.log_level(tracing::Level::WARN), tracing::Level::DEBUG);
    }

    #[test]
    fn test_configured_level_used_without_flags() {
        let cli = Cli::try_parse_from(["birdsight", "history", "list"]).unwrap();
        assert_eq!(cli.log_level(tracing::Level::TRACE), tracing::Level::TRACE);
        assert_eq!(cli.log_level(tracing::Level::WARN), tracing::Level::WARN);
    }
}
