use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use dekr_application::{ChatSession, SessionSettings, SubmitOutcome};
use dekr_core::alert::{ALERT_DISPLAY_WINDOW, AlertSeverity};
use dekr_core::event::ChatEvent;
use dekr_core::exchange::{ExchangeEntry, Role};
use dekr_core::session::SubmitRejection;
use dekr_core::usage::SeverityBand;
use dekr_infrastructure::{ClientConfig, FileDraftStore};
use dekr_interaction::HttpChatApi;

const COMMANDS: [&str; 7] = [
    "/clear", "/status", "/suggest", "/topics", "/export", "/draft", "/help",
];

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|cmd| cmd.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_entry(entry: &ExchangeEntry) {
    if entry.role == Role::User {
        return;
    }
    for line in entry.content.lines() {
        println!("{}", line.bright_blue());
    }
    if let Some(metadata) = &entry.metadata {
        println!("{}", metadata.caption().bright_black());
    }
    println!();
}

fn print_alert(message: &str, severity: AlertSeverity) {
    let line = match severity {
        AlertSeverity::Info => message.bright_white(),
        AlertSeverity::Success => message.bright_green(),
        AlertSeverity::Warning => message.yellow(),
        AlertSeverity::Danger => message.red(),
    };
    eprintln!("{}", line);
}

async fn print_status(session: &ChatSession) {
    if let Err(err) = session.check_status().await {
        print_alert(&err.to_string(), AlertSeverity::Danger);
        return;
    }
    let usage = session.usage().await;
    let label = format!(
        "{} | {} messages today",
        usage.tier_label(),
        usage.usage_label()
    );
    let label = match usage.severity_band() {
        SeverityBand::Normal => label.bright_green(),
        SeverityBand::Warning => label.yellow(),
        SeverityBand::Danger => label.red(),
    };
    println!("{}", label);
    if let Some(session_id) = session.session_id().await {
        println!("{}", format!("session {}", session_id).bright_black());
    }
}

/// Runs a slash command. Returns `false` for unknown commands.
async fn run_command(session: &Arc<ChatSession>, command: &str, arg: &str) -> Result<bool> {
    match command {
        "/clear" => {
            // Outcome is reported through the alert stream.
            let _ = session.clear_history().await;
        }
        "/status" => print_status(session).await,
        "/suggest" => match session.suggestions().await {
            Ok(suggestions) if suggestions.is_empty() => {
                println!("{}", "No suggestions right now.".bright_black());
            }
            Ok(suggestions) => {
                for suggestion in suggestions {
                    println!("{}", format!("- {}", suggestion).yellow());
                }
            }
            Err(err) => print_alert(&err.to_string(), AlertSeverity::Danger),
        },
        "/topics" => {
            let topics = session.recent_topics().await;
            if topics.is_empty() {
                println!("{}", "No topics yet.".bright_black());
            }
            for topic in topics {
                println!("{}", format!("- {}", topic).bright_black());
            }
        }
        "/export" => {
            let export = session.export().await;
            let path = export.file_name();
            let json = export.to_json_pretty()?;
            std::fs::write(&path, json).with_context(|| format!("writing {}", path))?;
            println!("{}", format!("Exported {} messages to {}", export.messages.len(), path).green());
        }
        "/draft" => {
            session.update_draft(arg).await;
            println!("{}", "Draft saved. It will be restored next time.".bright_black());
        }
        "/help" => {
            println!("{}", "Type a message to chat, or one of:".bright_black());
            for cmd in COMMANDS {
                println!("  {}", cmd.bright_cyan());
            }
        }
        _ => return Ok(false),
    }
    Ok(true)
}

/// Interactive terminal front end for the Dekr chat assistant.
///
/// Messages are submitted in the background, so the prompt stays usable
/// while a reply is pending. Replies, alerts and usage changes arrive on the
/// session event stream and are printed by a dedicated task.
#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    // ===== Backend Initialization =====
    let config = ClientConfig::load().context("loading client config")?;
    let api = Arc::new(HttpChatApi::with_timeout(
        config.base_url.clone(),
        config.request_timeout(),
    )?);
    let drafts = Arc::new(FileDraftStore::new()?);
    let session = Arc::new(ChatSession::with_settings(
        api,
        drafts,
        SessionSettings {
            draft_debounce: config.draft_debounce(),
            alert_window: ALERT_DISPLAY_WINDOW,
        },
    ));
    tracing::info!(base_url = %config.base_url, "starting chat session");

    let mut events = session.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ChatEvent::EntryAppended { entry }) => print_entry(&entry),
                Ok(ChatEvent::AlertRaised { alert }) => print_alert(&alert.message, alert.severity),
                Ok(ChatEvent::SubmissionStarted) => {
                    println!("{}", "...".bright_black());
                }
                Ok(ChatEvent::LogCleared) => {
                    println!("{}", "--- history cleared ---".bright_black());
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("event printer lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    session.initialize().await;

    // ===== REPL Setup =====
    let mut rl: Editor<CliHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== Dekr Chat ===".bright_magenta().bold());
    println!(
        "{}",
        "Ask about markets, or type '/help' for commands and 'quit' to exit.".bright_black()
    );
    println!();

    let mut initial = session.draft().await;

    // ===== Main REPL Loop =====
    loop {
        let readline = rl.readline_with_initial(">> ", (initial.as_str(), ""));
        initial.clear();

        match readline {
            Ok(line) => {
                let trimmed = line.trim();

                if trimmed == "quit" || trimmed == "exit" {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }

                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&line);

                if trimmed.starts_with('/') {
                    let (command, arg) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
                    match run_command(&session, command, arg.trim()).await {
                        Ok(true) => {}
                        Ok(false) => println!("{}", "Unknown command".bright_black()),
                        Err(err) => eprintln!("{}", format!("Error: {:#}", err).red()),
                    }
                    continue;
                }

                println!("{}", format!("> {}", trimmed).green());
                let chars = trimmed.chars().count();
                match session.input_band(chars) {
                    SeverityBand::Normal => {}
                    SeverityBand::Warning => println!("{}", format!("{}/5000", chars).yellow()),
                    SeverityBand::Danger => println!("{}", format!("{}/5000", chars).red()),
                }

                let session = Arc::clone(&session);
                let input = trimmed.to_string();
                tokio::spawn(async move {
                    match session.submit(&input).await {
                        SubmitOutcome::Rejected {
                            rejection: SubmitRejection::InFlight,
                        } => {
                            println!(
                                "{}",
                                "Still waiting for the previous reply.".yellow()
                            );
                        }
                        SubmitOutcome::Failed { error } if error.is_recoverable() => {
                            println!(
                                "{}",
                                "Press Up to recall the message and try again.".bright_black()
                            );
                        }
                        _ => {}
                    }
                });
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    session.shutdown().await;
    printer.abort();

    Ok(())
}
