//! coinsult - crypto consultant chat CLI

mod commands;
mod config;
mod sources;
mod utils;

use std::sync::Arc;

use clap::Parser;
use coinsult_agent::{ChatRequest, ChatService, GraphEvent, ServiceConfig};
use coinsult_ai::LlmClient;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

/// coinsult - ask about crypto prices, news and market outlook
#[derive(Parser, Debug)]
#[command(name = "coinsult")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Provider (gigachat, openai, openrouter, ollama, custom)
    #[arg(short, long)]
    provider: Option<String>,

    /// Model to use (default: GigaChat-2-Max)
    #[arg(short, long)]
    model: Option<String>,

    /// Chat-completions base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Continue an existing conversation thread
    #[arg(short, long)]
    thread: Option<String>,

    /// Deadline per question in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Run in non-interactive mode with a single question
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

impl Args {
    fn overrides(&self) -> config::Overrides {
        config::Overrides {
            provider: self.provider.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            timeout_seconds: self.timeout,
        }
    }
}

fn init_tracing(verbose: bool, debug_nodes: bool) {
    let filter = if verbose {
        EnvFilter::new("coinsult=debug,coinsult_agent=debug,coinsult_ai=debug")
    } else {
        let fallback = if debug_nodes {
            "warn,coinsult_agent=info"
        } else {
            "warn"
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let settings = config::Config::load().resolve(&args.overrides(), |key| std::env::var(key).ok())?;
    init_tracing(args.verbose, settings.debug_nodes);

    tracing::debug!(
        provider = settings.client.model.provider.name(),
        model = %settings.client.model.id,
        timeout = ?settings.timeout,
        "starting"
    );

    let client = Arc::new(LlmClient::new(settings.client.clone()));
    let sources = sources::build(settings.news_api_key.clone())?;
    let service = ChatService::new(
        client.clone(),
        sources,
        ServiceConfig {
            timeout: settings.timeout,
            debug_nodes: settings.debug_nodes,
        },
    );

    let printer = args
        .verbose
        .then(|| tokio::spawn(print_events(service.subscribe())));

    let result = match &args.command {
        Some(command) => run_command(&service, command, args.thread.clone()).await,
        None => run_interactive(&service, &client, args.thread.clone()).await,
    };

    client.close();
    if let Some(handle) = printer {
        handle.abort();
    }

    match result {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => Err(e),
    }
}

/// Print graph progress to stderr
async fn print_events(mut receiver: broadcast::Receiver<GraphEvent>) {
    loop {
        match receiver.recv().await {
            Ok(GraphEvent::NodeStart { node, .. }) => eprintln!("[{}...]", node),
            Ok(GraphEvent::NodeEnd {
                node,
                elapsed_ms,
                api_calls,
                ..
            }) => {
                if api_calls.is_empty() {
                    eprintln!("[{} done in {} ms]", node, elapsed_ms);
                } else {
                    eprintln!(
                        "[{} done in {} ms | calls: {}]",
                        node,
                        elapsed_ms,
                        api_calls.join(", ")
                    );
                }
            }
            Ok(GraphEvent::RunEnd { intent, steps, .. }) => {
                let intent = intent.map(|i| i.to_string()).unwrap_or_else(|| "unknown".into());
                eprintln!("[intent: {} | {} steps]", intent, steps);
            }
            Ok(GraphEvent::Error { message, .. }) => {
                eprintln!("[graph error: {}]", utils::truncate_chars(&message, 200));
            }
            Ok(GraphEvent::RunStart { .. }) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "event printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Answer one question and return whether it succeeded
async fn run_command(
    service: &ChatService,
    command: &str,
    thread_id: Option<String>,
) -> anyhow::Result<bool> {
    let mut request = ChatRequest::new(command);
    request.thread_id = thread_id;

    match service.chat(request).await {
        Ok(reply) => {
            println!("{}", reply.response);
            tracing::debug!(thread_id = %reply.thread_id, intent = %reply.intent, "answered");
            Ok(true)
        }
        Err(e) => {
            eprintln!("{}", utils::describe_error(&e));
            Ok(false)
        }
    }
}

async fn run_interactive(
    service: &ChatService,
    client: &LlmClient,
    mut thread_id: Option<String>,
) -> anyhow::Result<bool> {
    use std::io::{self, Write};

    // Show minimal startup info (only if TTY)
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!("coinsult ({})", client.model().id);
        eprintln!("Type /help for commands.");
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(result) = commands::execute_command(input) {
            match result {
                commands::CommandResult::NewThread => {
                    let id = uuid::Uuid::new_v4().to_string();
                    println!("Started a new conversation: {}", id);
                    thread_id = Some(id);
                }
                commands::CommandResult::ShowThread => match &thread_id {
                    Some(id) => println!("Thread: {}", id),
                    None => println!("No thread yet; one starts with your first question."),
                },
                commands::CommandResult::Message(msg) => println!("{}", msg),
                commands::CommandResult::Exit => break,
                commands::CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            continue;
        }

        let mut request = ChatRequest::new(input);
        request.thread_id = thread_id.clone();

        match service.chat(request).await {
            Ok(reply) => {
                println!("{}", reply.response);
                println!();
                thread_id = Some(reply.thread_id);
            }
            Err(e) => eprintln!("{}", utils::describe_error(&e)),
        }
    }

    Ok(true)
}
