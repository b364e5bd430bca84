//! Command-line interface components
//!
//! This module contains CLI-specific code for the Birdsight application,
//! including argument parsing, command handlers and the stream display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{
    AuthAction, AuthArgs, Cli, Commands, FeedbackArgs, FeedbackKind, GlobalArgs, HistoryAction,
    HistoryArgs, IdentifyArgs, MediaArgs, UsageAction, UsageArgs,
};
pub use commands::{
    handle_auth, handle_feedback, handle_history, handle_identify, handle_media, handle_usage,
};
pub use progress::{IdentificationProgress, ProgressConfig};
