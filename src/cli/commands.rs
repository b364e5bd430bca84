//! Command handlers for the Birdsight CLI
//!
//! This module implements the command handlers that connect CLI arguments to
//! the core components built by [`AppContext`].

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::models::{BirdMedia, CandidateRecord, FeedbackRecord, HistoryItem};
use crate::app::stream::run_identification;
use crate::app::{
    AppContext, Completion, IdentificationOutcome, IdentifyRequest, SearchHistory,
};
use crate::auth::{setup_credentials, show_auth_status, Credentials};
use crate::cli::{
    AuthAction, AuthArgs, FeedbackArgs, HistoryAction, HistoryArgs, IdentificationProgress,
    IdentifyArgs, MediaArgs, ProgressConfig, UsageAction, UsageArgs,
};
use crate::config::AppConfig;
use crate::constants::history;
use crate::errors::{AppError, Result};

/// Build the full context from the environment credentials
fn build_context(config: &AppConfig) -> Result<AppContext> {
    let credentials = Credentials::from_env()?;
    AppContext::from_config(config, credentials)
}

/// Cancel `token` when the user presses Ctrl-C
fn cancel_on_interrupt(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling identification");
            token.cancel();
        }
    })
}

/// Handle the identify command
///
/// Streams the identification, then on a completed result consumes a usage
/// credit and records the top candidate in the history.
pub async fn handle_identify(args: IdentifyArgs, config: &AppConfig) -> Result<()> {
    args.validate().map_err(AppError::generic)?;
    let context = build_context(config)?;

    if let Some(usage) = &context.usage {
        usage.fetch_count().await?;
        if usage.is_gated() {
            return Err(AppError::generic(format!(
                "No identifications left ({} of {} used)",
                usage.used(),
                usage.limit()
            )));
        }
        debug!("{} identifications remaining", usage.remaining());
    }

    if !context.onboarding.is_complete().await? {
        println!("👋 Welcome to Birdsight! Press Ctrl-C at any time to stop an identification.");
        println!();
        context.onboarding.mark_complete().await?;
    }

    let request = IdentifyRequest::from_files(args.image.as_deref(), args.audio.as_deref()).await?;

    let cancel = CancellationToken::new();
    let watcher = cancel_on_interrupt(cancel.clone());
    let mut progress = IdentificationProgress::new(ProgressConfig::default());

    let result = run_identification(&context.client, &request, &cancel, |kind, state| {
        progress.observe(kind, state)
    })
    .await;
    watcher.abort();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            progress.abandon();
            return Err(e.into());
        }
    };
    progress.finish(&outcome);

    if args.json {
        let json = serde_json::to_string_pretty(&outcome.candidates)
            .map_err(|e| AppError::generic(format!("Failed to encode candidates: {}", e)))?;
        println!("{}", json);
    } else {
        print_candidates(&outcome);
    }

    if outcome.completion != Completion::Done {
        return Ok(());
    }
    let Some(primary) = &outcome.primary else {
        return Ok(());
    };

    if !args.no_count {
        if let Some(usage) = &context.usage {
            let used = usage.increment().await;
            println!();
            println!("Credits: {} used, {} remaining", used, usage.remaining());
        }
    }

    if !args.no_history {
        context.history.record(HistoryItem::from(primary)).await?;
        debug!("Recorded {} in history", primary.scientific_name);
    }

    Ok(())
}

fn print_candidates(outcome: &IdentificationOutcome) {
    if outcome.candidates.is_empty() {
        println!("No candidates identified.");
        return;
    }

    println!();
    for (rank, candidate) in outcome.candidates.iter().enumerate() {
        print_candidate(rank + 1, candidate);
    }
}

fn print_candidate(rank: usize, candidate: &CandidateRecord) {
    println!(
        "{}. {} ({}) - {}%",
        rank,
        candidate.name,
        candidate.scientific_name,
        candidate.confidence_percent()
    );
    if !candidate.rarity.is_empty() {
        println!("   Rarity: {}", candidate.rarity);
    }
    if !candidate.fact.is_empty() {
        println!("   {}", candidate.fact);
    }
    if let Some(url) = candidate.photo_url() {
        println!("   Photo: {}", url);
    }
}

/// Handle the media command
pub async fn handle_media(args: MediaArgs, config: &AppConfig) -> Result<()> {
    let context = build_context(config)?;
    let media = context.media.fetch(&args.scientific_name).await?;

    if args.json {
        let json = serde_json::to_string_pretty(&media)
            .map_err(|e| AppError::generic(format!("Failed to encode media: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    print_media(&args.scientific_name, &media);
    Ok(())
}

fn print_media(scientific_name: &str, media: &BirdMedia) {
    println!("📷 Media for {}", scientific_name);
    if media.is_empty() {
        println!("   Nothing available.");
        return;
    }

    if let Some(photo) = &media.photo {
        match &photo.attribution {
            Some(attribution) => println!("   Photo: {} ({})", photo.url, attribution),
            None => println!("   Photo: {}", photo.url),
        }
    }
    if let Some(map) = &media.map {
        println!("   Range map: {}", map.url);
    }
    if let Some(photos) = &media.inaturalist_photos {
        println!("   Community photos: {}", photos.len());
    }
    if let Some(sounds) = &media.sounds {
        for sound in sounds {
            let recordist = sound.recordist.as_deref().unwrap_or("unknown recordist");
            println!("   Sound: {} ({})", sound.url, recordist);
        }
    }
}

/// Handle usage commands
pub async fn handle_usage(args: UsageArgs, config: &AppConfig) -> Result<()> {
    let context = build_context(config)?;
    let usage = context.usage.as_ref().ok_or_else(|| {
        AppError::generic("Usage tracking needs a user id. Set BIRDSIGHT_USER_ID or run 'auth setup'")
    })?;

    match args.action {
        UsageAction::Show => {
            usage.fetch_count().await?;
        }
        UsageAction::Increment => {
            usage.try_increment().await?;
        }
    }

    println!("Usage for {}", usage.user_id());
    println!("   Used:      {}", usage.used());
    println!("   Remaining: {} of {}", usage.remaining(), usage.limit());
    if usage.is_gated() {
        println!("   ⛔ Identification is currently gated");
    }
    Ok(())
}

/// Handle history commands
pub async fn handle_history(args: HistoryArgs, config: &AppConfig) -> Result<()> {
    let history = SearchHistory::with_limits(
        AppContext::local_store(config)?,
        history::STORAGE_KEY,
        config.history.max_entries,
    );

    match args.action {
        HistoryAction::List => {
            let entries = history.list().await?;
            if entries.is_empty() {
                println!("History is empty.");
            }
            for entry in entries {
                println!(
                    "{}  {} ({})",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.display_name,
                    entry.id
                );
            }
        }
        HistoryAction::Add {
            id,
            name,
            display_name,
            thumbnail,
        } => {
            let entries = history
                .record(HistoryItem {
                    name: name.unwrap_or_else(|| id.clone()),
                    id,
                    display_name,
                    thumbnail,
                })
                .await?;
            println!("✅ History now holds {} entries", entries.len());
        }
        HistoryAction::Clear => {
            history.clear().await?;
            println!("🗑️  History cleared");
        }
    }

    Ok(())
}

/// Handle the feedback command
pub async fn handle_feedback(args: FeedbackArgs, config: &AppConfig) -> Result<()> {
    let context = build_context(config)?;

    let mut record = FeedbackRecord::new(&args.scientific_name, args.kind.into());
    if let Some(section) = args.section {
        record = record.with_section(section);
    }
    if let Some(message) = args.message {
        record = record.with_message(message);
    }
    if let Some(url) = args.media_url {
        record = record.with_media_url(url);
    }

    if let Err(e) = context.feedback.submit(record).await {
        warn!("Feedback submission failed: {}", e);
        return Err(e.into());
    }

    println!("✅ Thanks! Feedback sent for {}", args.scientific_name);
    Ok(())
}

/// Handle authentication commands
pub async fn handle_auth(args: AuthArgs, config: &AppConfig) -> Result<()> {
    let client_config = config.client.to_runtime_config();
    match args.action {
        AuthAction::Setup => setup_credentials(&client_config).await?,
        AuthAction::Status => show_auth_status(&client_config).await?,
    }

    Ok(())
}
