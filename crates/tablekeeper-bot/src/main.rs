//! tablekeeper - keeps event tables on the board in sync with RSVPs.
//!
//! Polls the events source, reconciles every upcoming event's board and
//! announces the changes on Slack.

mod announce;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tablekeeper_core::{
    AnnouncementLedger, Config, CredentialStore, Credentials, Engine, EngineSettings, MeetupClient,
    PassReport, Secret, TrelloClient,
};

use announce::{problems_text, SlackNotifier};

/// Directory for daily log files, in addition to stderr
const LOG_DIR_ENV: &str = "TABLEKEEPER_LOG_DIR";

type BotEngine = Engine<MeetupClient, TrelloClient>;

const USAGE: &str = "Usage: tablekeeper [--once] [--dry-run]
       tablekeeper --store-secret <name>   (value read from stdin)
       tablekeeper --delete-secret <name>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SecretCommand {
    Store(Secret),
    Delete(Secret),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Cli {
    once: bool,
    dry_run: bool,
    secret: Option<SecretCommand>,
}

impl Cli {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut cli = Cli::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--once" => cli.once = true,
                "--dry-run" => cli.dry_run = true,
                "--store-secret" => cli.secret = Some(SecretCommand::Store(secret_arg(args.next())?)),
                "--delete-secret" => cli.secret = Some(SecretCommand::Delete(secret_arg(args.next())?)),
                "-h" | "--help" => {
                    println!("{}", USAGE);
                    std::process::exit(0);
                }
                other => anyhow::bail!("Unknown argument: {} (try --help)", other),
            }
        }
        Ok(cli)
    }
}

fn secret_arg(name: Option<String>) -> Result<Secret> {
    let name = name.context("Missing secret name")?;
    Secret::from_name(&name).with_context(|| {
        let known: Vec<&str> = Secret::ALL.iter().map(|s| s.account()).collect();
        format!("Unknown secret {:?}, expected one of: {}", name, known.join(", "))
    })
}

/// Store or delete one keychain entry.
fn manage_secret(command: SecretCommand) -> Result<()> {
    match command {
        SecretCommand::Store(secret) => {
            eprintln!("Enter {} and press enter:", secret.account());
            let mut value = String::new();
            io::stdin()
                .read_line(&mut value)
                .context("Failed to read secret from stdin")?;
            let value = value.trim();
            if value.is_empty() {
                anyhow::bail!("Empty value, nothing stored");
            }
            CredentialStore::store(secret, value)?;
            info!(secret = secret.account(), "Secret stored in keychain");
        }
        SecretCommand::Delete(secret) => {
            CredentialStore::delete(secret)?;
            info!(secret = secret.account(), "Secret removed from keychain");
        }
    }
    Ok(())
}

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the file log on drop.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "tablekeeper.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse(std::env::args().skip(1))?;
    let _log_guard = init_tracing();
    if let Some(command) = cli.secret {
        return manage_secret(command);
    }

    let mut config = Config::load()?;
    config.apply_env();
    if cli.dry_run {
        config.dry_run = true;
    }
    let group_id = config
        .meetup_group_id
        .clone()
        .context("No Meetup group configured (set MEETUP_GROUP_ID)")?;

    let credentials = Credentials::resolve()?;
    let meetup = MeetupClient::new(&credentials.meetup_api_key, &group_id)?;
    let trello = TrelloClient::new(&credentials.trello_api_key, &credentials.trello_token)?;
    let notifier = SlackNotifier::new(&credentials.slack_token, &config)?;
    let mut ledger = AnnouncementLedger::open(&config.cache_dir()?)?;

    let engine = Engine::new(meetup, trello, EngineSettings::from(&config));
    info!(
        group = %group_id,
        poll_secs = config.poll_interval_secs,
        dry_run = config.dry_run,
        "tablekeeper starting"
    );
    if !config.dry_run {
        if let Err(e) = notifier.tell_lab("Reporting for duty!").await {
            warn!(error = %e, "Could not greet the lab channel");
        }
    }

    let interval = Duration::from_secs(config.poll_interval_secs);
    loop {
        run_cycle(&engine, &notifier, &mut ledger, config.dry_run).await;
        if cli.once {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    info!("tablekeeper shutting down");
    Ok(())
}

async fn run_cycle(
    engine: &BotEngine,
    notifier: &SlackNotifier,
    ledger: &mut AnnouncementLedger,
    dry_run: bool,
) {
    let reports = match engine.run_cycle().await {
        Ok(reports) => reports,
        Err(e) => {
            error!(error = %e, "Could not list upcoming events");
            return;
        }
    };

    let seed_only = ledger.is_fresh();
    if seed_only {
        info!(events = reports.len(), "First run, recording current events without announcing");
    }

    for report in &reports {
        let event = &report.event;
        if seed_only {
            ledger.mark_announced(&event.id);
        } else if !ledger.is_announced(&event.id) {
            if dry_run {
                info!(event = %event.name, "Dry run, not announcing new event");
            } else {
                // Unannounced events are retried next cycle
                match notifier.announce_new_event(event).await {
                    Ok(()) => {
                        ledger.mark_announced(&event.id);
                    }
                    Err(e) => warn!(event = %event.name, error = %e, "Could not announce new event"),
                }
            }
        }

        handle_report(notifier, report, dry_run).await;
    }

    let events: Vec<_> = reports.into_iter().map(|r| r.event).collect();
    let pruned = ledger.prune(&events);
    if pruned > 0 {
        info!(pruned, "Forgot past events");
    }
    if let Err(e) = ledger.save() {
        warn!(error = %e, "Could not save announcement ledger");
    }
}

async fn handle_report(notifier: &SlackNotifier, report: &PassReport, dry_run: bool) {
    let summary = match &report.outcome {
        Ok(summary) => summary,
        Err(e) => {
            if !dry_run {
                let text = format!("Could not reconcile *{}*: {}", report.event.name, e);
                if let Err(e) = notifier.tell_lab(&text).await {
                    warn!(error = %e, "Could not report pass failure");
                }
            }
            return;
        }
    };

    if dry_run {
        for attachment in announce::rsvp_attachments(summary) {
            info!(event = %report.event.name, text = %attachment.text, "Dry run, would announce");
        }
        return;
    }

    if summary.has_changes() {
        if let Err(e) = notifier.announce_summary(summary).await {
            warn!(event = %report.event.name, error = %e, "Could not announce RSVP changes");
        }
    }
    if let Some(text) = problems_text(summary) {
        if let Err(e) = notifier.tell_lab(&text).await {
            warn!(error = %e, "Could not report board write problems");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cli_defaults() {
        assert_eq!(Cli::parse(args(&[])).unwrap(), Cli::default());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse(args(&["--dry-run", "--once"])).unwrap();
        assert!(cli.once);
        assert!(cli.dry_run);
    }

    #[test]
    fn test_cli_rejects_unknown() {
        assert!(Cli::parse(args(&["--forever"])).is_err());
    }

    #[test]
    fn test_cli_secret_commands() {
        let cli = Cli::parse(args(&["--store-secret", "trello-token"])).unwrap();
        assert_eq!(cli.secret, Some(SecretCommand::Store(Secret::TrelloToken)));

        let cli = Cli::parse(args(&["--delete-secret", "SLACK_API_TOKEN"])).unwrap();
        assert_eq!(cli.secret, Some(SecretCommand::Delete(Secret::SlackToken)));
    }

    #[test]
    fn test_cli_secret_needs_a_known_name() {
        assert!(Cli::parse(args(&["--store-secret"])).is_err());
        let err = Cli::parse(args(&["--store-secret", "github"])).unwrap_err();
        assert!(err.to_string().contains("meetup-api-key"));
    }
}
