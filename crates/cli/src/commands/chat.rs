//! `filechat chat` — Terminal chat, single-message or interactive.
//!
//! Uses the same session store and turn runner as the web chat. Lines
//! starting with `/` are commands:
//!
//! - `/attach PATH`  — upload a file into the session
//! - `/clear`        — drop transcript and attachments
//! - `/new`          — drop attachments, keep the transcript
//! - `/topic [NAME]` — select a topic, or clear it when NAME is omitted
//! - `/exit`         — quit

use std::io::Write;
use std::path::{Path, PathBuf};

use filechat_agent::{TurnEvent, TurnRunner};
use filechat_config::AppConfig;
use filechat_core::attachment::{ACCEPTED_EXTENSIONS, is_accepted_upload};
use filechat_core::session::SessionState;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// One line of interactive input.
#[derive(Debug, PartialEq, Eq)]
pub enum ChatCommand {
    Say(String),
    Attach(PathBuf),
    Clear,
    NewContext,
    Topic(Option<String>),
    Exit,
    Help,
    Unknown(String),
}

impl ChatCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed == "exit" || trimmed == "quit" {
            return Self::Exit;
        }
        let Some(command) = trimmed.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        match name {
            "attach" if !arg.is_empty() => Self::Attach(PathBuf::from(arg)),
            "clear" => Self::Clear,
            "new" => Self::NewContext,
            "topic" if arg.is_empty() => Self::Topic(None),
            "topic" => Self::Topic(Some(arg.to_string())),
            "exit" | "quit" => Self::Exit,
            "help" => Self::Help,
            _ => Self::Unknown(trimmed.to_string()),
        }
    }
}

/// Read a file from disk into the session.
pub async fn attach_file(
    session: &mut SessionState,
    path: &Path,
) -> Result<String, Box<dyn std::error::Error>> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("Not a file path: {}", path.display()))?
        .to_string();

    if !is_accepted_upload(&name) {
        return Err(format!(
            "Unsupported file type: {name} (accepted: {})",
            ACCEPTED_EXTENSIONS.join(", ")
        )
        .into());
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let attachment = session.add_attachment(name, &bytes);
    Ok(format!("{} ({:?}, {} bytes)", attachment.name, attachment.kind, bytes.len()))
}

pub async fn run(
    message: Option<String>,
    attach: Vec<PathBuf>,
    topic: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  WARNING: No API key configured, replies will be errors.");
        eprintln!("  Add OPENAI_API_KEY to:");
        eprintln!("    {}", AppConfig::config_dir().join("secrets.toml").display());
        eprintln!("  or set the OPENAI_API_KEY environment variable.");
        eprintln!();
    }

    let provider = filechat_providers::build_from_config(&config)?;
    let runner = TurnRunner::from_config(provider, &config);

    let mut session = SessionState::new();
    session.set_topic(topic);
    for path in &attach {
        let summary = attach_file(&mut session, path).await?;
        eprintln!("  Attached {summary}");
    }

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let reply = single_turn(&runner, &mut session, &msg).await;
        eprint!("\r              \r");
        if let Some(reply) = reply {
            println!("{reply}");
        }
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  FileChat — Interactive Mode");
    println!();
    println!("  Model:        {}", config.model);
    println!("  Attachments:  {}", session.attachments.len());
    println!("  Topic:        {}", session.topic.as_deref().unwrap_or("none"));
    println!();
    println!("  Type your message and press Enter. /help lists commands.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        match ChatCommand::parse(&line) {
            ChatCommand::Exit => break,
            ChatCommand::Help => print_help(&config),
            ChatCommand::Clear => {
                session.clear_conversation();
                println!("  Conversation cleared.");
            }
            ChatCommand::NewContext => {
                session.clear_attachments_only();
                println!("  Attachments dropped, transcript kept.");
            }
            ChatCommand::Topic(topic) => {
                session.set_topic(topic);
                println!("  Topic: {}", session.topic.as_deref().unwrap_or("none"));
            }
            ChatCommand::Attach(path) => match attach_file(&mut session, &path).await {
                Ok(summary) => println!("  Attached {summary}"),
                Err(e) => eprintln!("  [Error] {e}"),
            },
            ChatCommand::Unknown(command) => {
                eprintln!("  Unknown command: {command} (try /help)");
            }
            ChatCommand::Say(text) => {
                if !text.is_empty() {
                    stream_turn(&runner, &mut session, &text).await?;
                }
            }
        }
        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}

/// Run one turn and return the stored reply.
///
/// A failed completion is a reply like any other (`Error: ...`), so the
/// command still exits with status 0.
async fn single_turn(
    runner: &TurnRunner,
    session: &mut SessionState,
    text: &str,
) -> Option<String> {
    let outcome = runner.run_turn(session, text).await;
    if outcome.is_failure() {
        tracing::debug!(session = %session.id, "Single message turn stored an error reply");
    }
    outcome.reply().map(str::to_string)
}

/// Run one turn and print the reply as it streams in.
async fn stream_turn(
    runner: &TurnRunner,
    session: &mut SessionState,
    text: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, mut rx) = mpsc::channel(64);

    let printer = async {
        let mut out = std::io::stdout();
        let _ = write!(out, "\n  Assistant > ");
        let _ = out.flush();
        while let Some(event) = rx.recv().await {
            match event {
                TurnEvent::Chunk { content } => {
                    let _ = write!(out, "{}", content.replace('\n', "\n              "));
                    let _ = out.flush();
                }
                TurnEvent::Error { message } => {
                    let _ = write!(out, "{message}");
                }
                TurnEvent::Done { .. } => {}
            }
        }
        let _ = writeln!(out, "\n");
    };

    tokio::join!(runner.run_turn_stream(session, text, tx), printer);
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

fn print_help(config: &AppConfig) {
    println!("  /attach PATH   upload a file ({})", ACCEPTED_EXTENSIONS.join(", "));
    println!("  /clear         clear conversation and attachments");
    println!("  /new           new context: drop attachments, keep the conversation");
    println!("  /topic [NAME]  select a topic: {}", config.assistant.topics.join(", "));
    println!("  /exit          quit");
}
