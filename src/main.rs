// PolitiSight - command-line entry point

use std::collections::HashMap;
use std::io::Write;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use politisight::models::chat::ChatRole;
use politisight::models::events::AppEvent;
use politisight::models::search::SearchStage;
use politisight::render::{render_history, render_report};
use politisight::{
    clear_chat, delete_report, generate_report, get_chat_messages, get_health, get_settings,
    list_history, send_chat_message, view_report, AppState, CommandResponse,
};

#[derive(Parser)]
#[command(name = "politisight", version, about = "AI political analysis reports and chat")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a report on a topic
    Report {
        /// Topic to analyze
        #[arg(required = true, num_args = 1..)]
        topic: Vec<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Browse stored reports
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Chat with the assistant
    Chat {
        /// Open a stored report first so the assistant can discuss it
        #[arg(long)]
        report: Option<String>,
    },
    /// Show the current settings
    Config,
    /// Show service health
    Health {
        /// Also contact the model endpoint
        #[arg(long)]
        check: bool,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List stored reports
    List,
    /// Print a stored report
    Show { id: String },
    /// Delete a stored report
    Delete { id: String },
}

fn into_result<T>(response: CommandResponse<T>) -> Result<T> {
    match response.data {
        Some(data) if response.success => Ok(data),
        _ => Err(anyhow!(response
            .error
            .unwrap_or_else(|| "unknown error".to_string()))),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("politisight=info,politisight_llm=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Prints stage changes to stderr while a report is generated
fn spawn_stage_printer(mut rx: mpsc::UnboundedReceiver<AppEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                AppEvent::StageChanged { stage } if stage != SearchStage::Idle => {
                    eprintln!("... {}", stage.label());
                }
                _ => {}
            }
        }
    })
}

/// Writes streamed assistant text, one line per reply
struct ReplyPrinter<W: Write> {
    out: W,
    printed: HashMap<String, usize>,
    line_open: bool,
}

impl<W: Write> ReplyPrinter<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            printed: HashMap::new(),
            line_open: false,
        }
    }

    fn handle(&mut self, event: AppEvent) -> std::io::Result<()> {
        match event {
            AppEvent::ChatMessageAppended { message } if message.role == ChatRole::Model => {
                // A failed reply leaves its partial text on the open line
                if self.line_open {
                    writeln!(self.out)?;
                }
                write!(self.out, "assistant> {}", message.text)?;
                self.printed.insert(message.id, message.text.len());
                self.line_open = true;
            }
            AppEvent::ChatMessageUpdated { id, text } => {
                let from = self.printed.get(&id).copied().unwrap_or(0);
                if let Some(rest) = text.get(from..) {
                    write!(self.out, "{}", rest)?;
                }
                self.printed.insert(id, text.len());
            }
            AppEvent::TypingChanged { typing: false } if self.line_open => {
                writeln!(self.out)?;
                self.line_open = false;
            }
            _ => {}
        }
        self.out.flush()
    }
}

/// Prints assistant text to stdout as it streams in
fn spawn_chat_printer(mut rx: mpsc::UnboundedReceiver<AppEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut printer = ReplyPrinter::new(std::io::stdout());
        while let Some(event) = rx.recv().await {
            let _ = printer.handle(event);
        }
    })
}

async fn run_report(state: &AppState, topic: &str, json: bool) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let printer = spawn_stage_printer(rx);
    let response = generate_report(state, topic, &tx).await;
    drop(tx);
    let _ = printer.await;

    let report = into_result(response)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report));
    }
    Ok(())
}

async fn run_chat(state: &AppState, report: Option<String>) -> Result<()> {
    if let Some(id) = report {
        let report = into_result(view_report(state, &id).await)?;
        eprintln!("Discussing \"{}\"", report.title);
    }

    for message in into_result(get_chat_messages(state).await)? {
        println!("assistant> {}", message.text);
    }
    eprintln!("Type a message, /clear to start over, /quit to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                for message in into_result(clear_chat(state).await)? {
                    println!("assistant> {}", message.text);
                }
            }
            text => {
                let (tx, rx) = mpsc::unbounded_channel();
                let printer = spawn_chat_printer(rx);
                let response = send_chat_message(state, text, &tx).await;
                drop(tx);
                let _ = printer.await;
                if let Err(e) = into_result(response) {
                    eprintln!("{}", e);
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let state = AppState::new();
    state
        .initialize()
        .await
        .context("failed to initialize PolitiSight")?;

    match cli.command {
        Command::Report { topic, json } => run_report(&state, &topic.join(" "), json).await?,
        Command::History { action } => match action {
            HistoryAction::List => {
                print!("{}", render_history(&into_result(list_history(&state).await)?));
            }
            HistoryAction::Show { id } => {
                print!("{}", render_report(&into_result(view_report(&state, &id).await)?));
            }
            HistoryAction::Delete { id } => {
                if into_result(delete_report(&state, &id).await)? {
                    println!("Deleted {}", id);
                } else {
                    println!("No report with id {}", id);
                }
            }
        },
        Command::Chat { report } => run_chat(&state, report).await?,
        Command::Config => {
            let config = into_result(get_settings(&state).await)?;
            if let Ok(path) = state.config_path().await {
                eprintln!("# {}", path.display());
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Health { check } => {
            let health = into_result(get_health(&state, check).await)?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
    }

    Ok(())
}
