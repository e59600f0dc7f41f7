use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use chat_core::{model, Config, PromptPreset, Settings};
use chat_loop::{ChatEvent, FormatError, RenderSink, TextFormatter, ThrottledRenderer};
use llm_client::ChatClient;
use session_manager::{ChatController, Conversation, FileConversationStore};
use tool_system::{FetchUrlTool, ToolInvoker, ToolRegistry, WebSearchTool};

#[derive(Parser)]
#[command(name = "chat-cli", about = "Streaming chat client for OpenRouter-style APIs")]
struct Args {
    /// Model id (see --list-models)
    #[arg(long, default_value = model::DEFAULT_MODEL)]
    model: String,

    /// Send a single message and exit instead of starting the REPL
    #[arg(long, short)]
    message: Option<String>,

    /// Override the system prompt
    #[arg(long)]
    system: Option<String>,

    /// Allow the provider's web-search plugin
    #[arg(long)]
    web_search: bool,

    /// Validate the configured API key and exit
    #[arg(long)]
    check_key: bool,

    /// Print the model catalog and exit
    #[arg(long)]
    list_models: bool,

    /// Where conversations are stored
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

/// The terminal shows raw markdown; formatting is identity here.
struct PlainFormatter;

impl TextFormatter for PlainFormatter {
    fn format(&self, text: &str) -> Result<String, FormatError> {
        Ok(text.to_string())
    }
}

/// Prints only what was appended since the last flush; the committed text is
/// append-only until finalize, so a suffix is all that ever changes.
#[derive(Default)]
struct TerminalSink {
    printed: usize,
}

impl RenderSink for TerminalSink {
    fn render(&mut self, markup: &str, _streaming: bool) {
        if markup.len() >= self.printed && markup.is_char_boundary(self.printed) {
            print!("{}", &markup[self.printed..]);
        } else {
            print!("\n{markup}");
        }
        let _ = std::io::stdout().flush();
        self.printed = markup.len();
    }

    fn scroll_to_bottom(&mut self) {}
}

fn new_renderer() -> ThrottledRenderer<PlainFormatter, TerminalSink> {
    ThrottledRenderer::new(PlainFormatter, TerminalSink::default())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.list_models {
        for entry in model::catalog() {
            println!("{:40} {}", entry.id, entry.display_name.dimmed());
        }
        return Ok(());
    }

    let config = Config::load().context("failed to load configuration")?;
    let api_key = config.require_api_key()?.to_string();
    let client = Arc::new(ChatClient::new(&config, &api_key));

    if args.check_key {
        let models = client.list_models().await.context("API key check failed")?;
        println!(
            "{} {} models available at {}",
            "ok:".green(),
            models.len(),
            client.api_base()
        );
        return Ok(());
    }

    if model::lookup(&args.model).is_none() {
        bail!(
            "unknown model '{}'; run with --list-models to see the catalog",
            args.model
        );
    }

    let registry = ToolRegistry::new();
    registry
        .register(WebSearchTool::new())
        .expect("register web_search");
    registry
        .register(FetchUrlTool::new())
        .expect("register fetch_url");
    let invoker = Arc::new(ToolInvoker::new(Arc::new(registry)));

    let data_dir = args.data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("chat-cli")
            .join("conversations")
    });
    let store = FileConversationStore::new(data_dir);

    let mut settings = Settings::default();
    settings.web_search = args.web_search;
    if let Some(system) = args.system {
        settings.system_prompt = system;
        settings.prompt_preset = PromptPreset::Custom;
    }

    let mut controller = ChatController::new(
        Conversation::new(),
        store,
        client,
        invoker,
        &args.model,
        settings,
    )?;

    let (event_tx, event_rx) = mpsc::channel(64);
    let printer = tokio::spawn(print_events(event_rx));

    let result = match args.message {
        Some(message) => send_one(&mut controller, message, &event_tx).await,
        None => repl(&mut controller, &event_tx).await,
    };

    drop(event_tx);
    let _ = printer.await;
    result
}

async fn send_one(
    controller: &mut ChatController<FileConversationStore>,
    message: String,
    event_tx: &mpsc::Sender<ChatEvent>,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let mut renderer = new_renderer();
    controller
        .send_message(message, Vec::new(), &mut renderer, event_tx, cancel)
        .await?;
    println!();
    Ok(())
}

async fn repl(
    controller: &mut ChatController<FileConversationStore>,
    event_tx: &mpsc::Sender<ChatEvent>,
) -> anyhow::Result<()> {
    println!(
        "{} model {} ({} to quit, {} to retry the last answer)",
        "chat-cli".bold(),
        controller.model().id.cyan(),
        "/quit".dimmed(),
        "/regenerate".dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", "you>".green().bold());
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();

        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        let cancel = CancellationToken::new();
        let mut renderer = new_renderer();
        print!("{} ", "ai>".blue().bold());
        let _ = std::io::stdout().flush();

        let result = if line == "/regenerate" {
            controller.regenerate(&mut renderer, event_tx, cancel).await
        } else {
            controller
                .send_message(line, Vec::new(), &mut renderer, event_tx, cancel)
                .await
        };

        println!();
        if let Err(error) = result {
            eprintln!("{} {error}", "error:".red().bold());
        }
    }

    Ok(())
}

async fn print_events(mut events: mpsc::Receiver<ChatEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ChatEvent::ToolCallsCompleted { calls } => {
                let names: Vec<&str> = calls
                    .iter()
                    .map(|call| call.function.name.as_str())
                    .collect();
                eprintln!("\n{} {}", "tools:".yellow(), names.join(", "));
            }
            ChatEvent::ToolResults { results } => {
                for completed in results {
                    let status = if completed.is_error() {
                        "failed".red()
                    } else {
                        "ok".green()
                    };
                    eprintln!(
                        "{} {} {}",
                        "tool:".yellow(),
                        completed.call.function.name,
                        status
                    );
                }
            }
            ChatEvent::Usage { usage, .. } => {
                eprintln!(
                    "\n{} {} in / {} out / {} total (${:.4})",
                    "usage:".dimmed(),
                    usage.input_tokens,
                    usage.output_tokens,
                    usage.total_tokens,
                    usage.cost
                );
            }
            ChatEvent::Error { message } => {
                eprintln!("\n{} {message}", "stream error:".red());
            }
            ChatEvent::Image { url } => {
                eprintln!("\n{} {url}", "image:".cyan());
            }
            ChatEvent::Content { .. } | ChatEvent::Completed => {}
        }
    }
}
