//! chat-relay: streaming chat relay with model fallback
//!
//! Runs the relay server in front of a hosted chat completion API, or a
//! terminal chat client that talks to a running relay.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, BufReader};

use chat_relay::{
    client::{ChatSession, Conversation, RelayClient, RenderOutcome, RenderSink, StopHandle},
    config::AppConfig,
    run_server,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Parser)]
#[command(name = "chat-relay")]
#[command(version = "0.1.0")]
#[command(about = "Streaming chat relay with model fallback")]
#[command(long_about = "
chat-relay forwards chat conversations to a hosted completion API:
  - Falls back to lower-capacity models when the preferred one is busy
  - Streams the upstream reply through untouched (X-Model-Used names the model)
  - Ships a terminal client that renders replies as they arrive

Example usage:
  MISTRAL_API_KEY=... chat-relay serve --port 8787
  chat-relay chat --relay-url http://127.0.0.1:8787
")]
struct Cli {
    /// Path to config file (defaults to ./config.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Set logging level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Override listen port
        #[arg(short, long)]
        port: Option<u16>,
        /// Override listen address
        #[arg(long)]
        host: Option<String>,
    },

    /// Chat with a running relay from the terminal
    Chat {
        /// Relay base URL (e.g., "http://127.0.0.1:8787")
        #[arg(long)]
        relay_url: Option<String>,
        /// Preferred model for this session
        #[arg(short, long)]
        model: Option<String>,
        /// Sampling temperature
        #[arg(short, long)]
        temperature: Option<f32>,
        /// System prompt
        #[arg(long)]
        system: Option<String>,
    },

    /// Validate configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level_filter = if let Some(level) = cli.log_level {
        level.to_string()
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            .to_string()
    };

    // Client output goes to stdout, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&level_filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { port, host } => {
            serve(cli.config, port, host).await?;
        }
        Commands::Chat {
            relay_url,
            model,
            temperature,
            system,
        } => {
            chat(cli.config, relay_url, model, temperature, system).await?;
        }
        Commands::CheckConfig => {
            check_config(cli.config);
        }
    }

    Ok(())
}

/// Run the relay server
async fn serve(
    config_path: Option<PathBuf>,
    port_override: Option<u16>,
    host_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config_or_exit(config_path.as_ref());

    if let Some(port) = port_override {
        config.server.port = port;
    }
    if let Some(host) = host_override {
        config.server.host = host;
    }

    tracing::info!(
        preferred = %config.models.preferred,
        fallbacks = ?config.models.fallbacks,
        preferred_retries = config.retry.preferred_retries,
        fallback_retries = config.retry.fallback_retries,
        "Model fallback configured"
    );

    run_server(config).await
}

/// Prints fragments as they arrive
struct StdoutSink;

impl RenderSink for StdoutSink {
    fn fragment(&mut self, fragment: &str, _content: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(fragment.as_bytes());
        let _ = out.flush();
    }

    fn error(&mut self, message: &str) {
        eprintln!("\n✗ {}", message);
    }
}

/// Interactive terminal chat
async fn chat(
    config_path: Option<PathBuf>,
    relay_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    system: Option<String>,
) -> anyhow::Result<()> {
    let config = load_config_or_exit(config_path.as_ref());
    let relay_url = relay_url.unwrap_or(config.client.relay_url);

    let client = RelayClient::new(&relay_url)?
        .with_model(model)
        .with_temperature(temperature);
    let conversation = match system {
        Some(prompt) => Conversation::with_system(prompt),
        None => Conversation::new(),
    };
    println!(
        "Posting to {} (/reset clears, /quit exits, Ctrl-C stops a reply or exits at the prompt)",
        client.chat_url()
    );
    let mut session = ChatSession::with_conversation(client, conversation);
    let mut sink = StdoutSink;

    let target = InterruptTarget::default();
    let interrupts = tokio::spawn({
        let target = target.clone();
        async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !target.interrupt() {
                    println!();
                    std::process::exit(130);
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                session.reset();
                println!("Conversation cleared");
                continue;
            }
            _ => {}
        }

        target.arm(session.begin(line));
        let outcome = session.run(&mut sink).await;
        target.disarm();

        match outcome {
            RenderOutcome::Completed => {
                if let Some(model) = session.last_model() {
                    tracing::debug!(model, "Reply complete");
                }
                println!();
            }
            RenderOutcome::Cancelled => println!("\n[stopped]"),
            RenderOutcome::Failed(_) => {}
        }
    }

    interrupts.abort();
    Ok(())
}

/// The reply a Ctrl-C should stop, if one is streaming
#[derive(Clone, Default)]
struct InterruptTarget(Arc<Mutex<Option<StopHandle>>>);

impl InterruptTarget {
    fn arm(&self, stop: StopHandle) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(stop);
    }

    fn disarm(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Stop the armed reply. `false` means nothing was streaming.
    fn interrupt(&self) -> bool {
        match self.0.lock().unwrap_or_else(PoisonError::into_inner).take() {
            Some(stop) => {
                stop.stop();
                true
            }
            None => false,
        }
    }
}

/// Validate configuration
fn check_config(config_path: Option<PathBuf>) {
    match AppConfig::load_or_default(config_path.as_deref()) {
        Ok(config) => {
            println!("✓ Configuration is valid\n");
            println!("Server:");
            println!("  Listen: {}:{}", config.server.host, config.server.port);
            println!("\nUpstream:");
            println!("  URL: {}", config.upstream.chat_completions_url());
            println!("  TLS: {}", if config.upstream.is_tls() { "enabled" } else { "disabled" });
            if config.upstream.tls.accept_invalid_certs {
                println!("  TLS: Accepting invalid certificates");
            }
            if let Some(ref ca) = config.upstream.tls.ca_bundle_path {
                println!("  TLS CA: {}", ca);
            }
            println!("  Timeout: {}s", config.upstream.timeout_seconds);
            println!(
                "  API key: {}",
                if config.upstream.credential().is_some() { "set" } else { "missing" }
            );
            println!("\nModels:");
            println!("  Candidates: {}", config.models.candidates(None).join(" -> "));
            println!("  Default temperature: {}", config.models.default_temperature);
            println!("\nRetry:");
            println!(
                "  Attempts: preferred {}, fallbacks {}",
                1 + config.retry.preferred_retries,
                1 + config.retry.fallback_retries
            );
            println!(
                "  Backoff: {}ms base, {}ms max",
                config.retry.base_delay_ms, config.retry.max_delay_ms
            );
            println!("  Capacity pattern: {}", config.retry.capacity_pattern);
            println!("\nClient:");
            println!("  Relay URL: {}", config.client.relay_url);
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Load configuration or exit with error
fn load_config_or_exit(config_path: Option<&PathBuf>) -> AppConfig {
    match AppConfig::load_or_default(config_path.map(PathBuf::as_path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            eprintln!("\nCopy config.yaml.default to config.yaml and adjust it, or run without --config.");
            std::process::exit(1);
        }
    }
}
