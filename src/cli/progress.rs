//! Live display of an identification stream
//!
//! A spinner on stderr shows the server's progress messages and how many
//! candidates have arrived so far. When stderr is not a terminal the display
//! falls back to one plain line per change.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::app::stream::{Completion, IdentificationOutcome, IdentificationState};

/// Configuration for the stream display
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Show the spinner when attached to a terminal
    pub enable_spinner: bool,
    /// Spinner tick interval
    pub tick_interval: Duration,
    /// Print progress lines even without a terminal
    pub text_fallback: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_spinner: true,
            tick_interval: Duration::from_millis(120),
            text_fallback: true,
        }
    }
}

/// Spinner (or plain text) tracking one identification
pub struct IdentificationProgress {
    spinner: Option<ProgressBar>,
    text_fallback: bool,
    last_line: String,
}

impl IdentificationProgress {
    pub fn new(config: ProgressConfig) -> Self {
        let is_terminal = atty::is(atty::Stream::Stderr);

        let spinner = (config.enable_spinner && is_terminal).then(|| {
            let spinner = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                spinner.set_style(style.tick_strings(&["◐", "◓", "◑", "◒", "●"]));
            }
            spinner.set_message("Sending capture...");
            spinner.enable_steady_tick(config.tick_interval);
            spinner
        });

        Self {
            spinner,
            text_fallback: config.text_fallback && !is_terminal,
            last_line: String::new(),
        }
    }

    /// Reflect the state after one applied event
    pub fn observe(&mut self, kind: &str, state: &IdentificationState) {
        let line = status_line(kind, state);
        if line == self.last_line {
            return;
        }

        match &self.spinner {
            Some(spinner) => spinner.set_message(line.clone()),
            None if self.text_fallback => eprintln!("{}", line),
            None => {}
        }
        self.last_line = line;
    }

    /// Clear the spinner and print a one-line summary
    pub fn finish(&self, outcome: &IdentificationOutcome) {
        let summary = match outcome.completion {
            Completion::Done => match outcome.duration {
                Some(duration) => format!(
                    "✅ {} candidates in {:.1}s",
                    outcome.candidates.len(),
                    duration.as_secs_f64()
                ),
                None => format!("✅ {} candidates", outcome.candidates.len()),
            },
            Completion::EndOfStream => format!(
                "⚠️  Stream ended early with {} candidates",
                outcome.candidates.len()
            ),
            Completion::Cancelled => "Cancelled".to_string(),
        };

        match &self.spinner {
            Some(spinner) => spinner.finish_with_message(summary),
            None => eprintln!("{}", summary),
        }
    }

    /// Clear the spinner without a summary, e.g. before printing an error
    pub fn abandon(&self) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
    }
}

fn status_line(kind: &str, state: &IdentificationState) -> String {
    let count = state.enriched().len();
    match (kind, state.last_progress()) {
        ("progress", Some(message)) if count == 0 => message.to_string(),
        ("progress", Some(message)) => format!("{} ({} candidates)", message, count),
        (_, _) if count == 0 => "Waiting for candidates...".to_string(),
        (_, _) => match state.primary() {
            Some(top) => format!(
                "{} candidates, top: {} ({}%)",
                count,
                top.name,
                top.confidence_percent()
            ),
            None => format!("{} candidates", count),
        },
    }
}
