use clap::Parser;
use colored::*;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use adventure_client::cli::{Args, Command};
use adventure_client::config::{Config, LoggerConfig};
use adventure_client::{
    AdventureClient, ChatController, ChatSession, ClientError, ClientResult, NarrationController,
    NarrationSession, NarrationState, SessionId, TerminalChoices, TerminalTranscript,
};

type Input = Lines<BufReader<Stdin>>;

fn init_tracing(logger: &LoggerConfig) {
    // RUST_LOG wins over the configured level.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logger.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    let _ = if logger.concise {
        builder.compact().try_init()
    } else {
        builder.try_init()
    };
}

fn prompt(text: &str) {
    print!("{}", text.bright_cyan());
    let _ = io::stdout().flush();
}

/// Print everything the controllers pushed onto the error channel.
fn drain_errors(rx: &mut mpsc::UnboundedReceiver<ClientError>) {
    while let Ok(e) = rx.try_recv() {
        eprintln!("{} {}", "request failed:".bright_red(), e);
    }
}

/// Request failures arrive through the error channel; anything else (a bad
/// selection, a rejected transition) is printed here.
fn report<T>(result: ClientResult<T>) {
    if let Err(e) = result {
        if !e.is_request_failure() {
            eprintln!("{}", e.to_string().bright_red());
        }
    }
}

async fn run_narrate(
    client: AdventureClient,
    session: Option<String>,
    input: &mut Input,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = match session {
        Some(id) => SessionId::parse(&id)?,
        None => SessionId::generate(),
    };
    eprintln!("{} {}", "session".bright_blue(), session.as_str().bright_white());

    let controller = NarrationController::with_session(
        session,
        TerminalTranscript::stdout(),
        TerminalChoices::stdout(),
    )
    .with_error_channel(tx);
    let mut narration = NarrationSession::new(client, controller);

    report(narration.start().await);

    loop {
        drain_errors(&mut rx);
        let state = narration.controller().state();
        let can_retry = narration.controller().can_retry();
        match state {
            NarrationState::PresentingChoices => {
                let count = narration.controller().offered().len();
                prompt(&format!("choose 1-{} (q to quit): ", count));
                let Some(line) = input.next_line().await? else { break };
                let line = line.trim();
                if line.eq_ignore_ascii_case("q") {
                    break;
                }
                match line.parse::<usize>() {
                    Ok(n) if (1..=count).contains(&n) => {
                        report(narration.select_index(n - 1).await);
                    }
                    _ => {
                        let hint = format!("enter a number from 1 to {count}");
                        eprintln!("{}", hint.bright_red());
                    }
                }
            }
            NarrationState::AwaitingResponse if can_retry => {
                prompt("[r]etry or [q]uit: ");
                let Some(line) = input.next_line().await? else { break };
                match line.trim() {
                    "r" | "R" => report(narration.retry().await),
                    "q" | "Q" => break,
                    _ => {}
                }
            }
            NarrationState::Ended => {
                prompt("play again? [y/N]: ");
                let Some(line) = input.next_line().await? else { break };
                if !line.trim().eq_ignore_ascii_case("y") {
                    break;
                }
                narration.controller_mut().reset()?;
                report(narration.start().await);
            }
            NarrationState::Idle | NarrationState::AwaitingResponse => break,
        }
    }
    drain_errors(&mut rx);
    Ok(())
}

async fn run_chat(
    client: AdventureClient,
    input: &mut Input,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let controller = ChatController::new(TerminalTranscript::stdout()).with_error_channel(tx);
    let mut chat = ChatSession::new(client, controller);

    loop {
        prompt("message (q to quit): ");
        let Some(line) = input.next_line().await? else { break };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "q" {
            break;
        }
        report(chat.submit(text).await);
        drain_errors(&mut rx);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut cfg = Config::load(args.config.as_deref())?;
    if let Some(url) = args.base_url {
        cfg = cfg.with_base_url(url);
    }
    if let Some(level) = args.log_level {
        cfg.logger.level = level;
    }
    init_tracing(&cfg.logger);
    tracing::debug!(base_url = %cfg.server.base_url, "configuration loaded");

    let client = AdventureClient::from_config(&cfg.server);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    match args.command {
        Command::Narrate { session } => run_narrate(client, session, &mut input).await,
        Command::Chat => run_chat(client, &mut input).await,
    }
}
