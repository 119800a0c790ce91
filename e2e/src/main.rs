//! chat-relay e2e harness
//!
//! Starts the mock upstream, launches the relay binary against
//! `test_configs/relay.yaml`, runs every case and prints a per-category report.
//!
//!   cargo run                        # all cases
//!   cargo run -- --filter fallback   # cases whose name contains "fallback"
//!   cargo run -- --list

mod backend;
mod client;
mod runner;
mod tests;
mod types;

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio::process::{Child, Command};

use runner::{list_tests, run_tests, TestContext};

const RELAY_CONFIG: &str = "test_configs/relay.yaml";
/// Must match `upstream.base_url` in the relay config
const UPSTREAM_PORT: u16 = 18080;
/// Must match `server.port` in the relay config
const RELAY_PORT: u16 = 18087;
/// The mock upstream asserts this arrives as the bearer token
const E2E_API_KEY: &str = "e2e-test-key";

#[derive(Parser)]
#[command(name = "e2e", about = "End-to-end tests for chat-relay against a mock upstream")]
struct Cli {
    /// Print the registered cases and exit
    #[arg(long)]
    list: bool,

    /// Only run cases whose name contains this string
    #[arg(long, short)]
    filter: Option<String>,

    /// chat-relay binary; defaults to the release, then debug, build of the workspace
    #[arg(long)]
    relay_bin: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let cases = tests::all_tests();

    if cli.list {
        list_tests(&cases);
        return Ok(ExitCode::SUCCESS);
    }

    let relay_bin = match cli.relay_bin {
        Some(path) => path,
        None => built_relay()?,
    };

    let backend_state = backend::start(UPSTREAM_PORT).await?;
    let mut relay = spawn_relay(&relay_bin)?;
    let ctx = TestContext {
        relay_addr: format!("127.0.0.1:{}", RELAY_PORT),
        backend_state,
        http_client: client::build_client(),
    };
    await_health(&ctx).await?;

    let report = run_tests(&cases, &ctx, cli.filter.as_deref()).await;
    report.print_summary();
    relay.kill().await.ok();

    Ok(if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn built_relay() -> anyhow::Result<PathBuf> {
    ["release", "debug"]
        .iter()
        .map(|profile| Path::new("../target").join(profile).join("chat-relay"))
        .find(|path| path.exists())
        .context("chat-relay is not built; run `cargo build` in the workspace root first")
}

fn spawn_relay(bin: &Path) -> anyhow::Result<Child> {
    Command::new(bin)
        .args(["serve", "--config", RELAY_CONFIG])
        .env("MISTRAL_API_KEY", E2E_API_KEY)
        .env_remove("MISTRAL_BASE_URL")
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to launch {}", bin.display()))
}

/// Poll the relay's /health until it answers or five seconds pass
async fn await_health(ctx: &TestContext) -> anyhow::Result<()> {
    let url = format!("http://{}/health", ctx.relay_addr);
    for _ in 0..50 {
        if let Ok(resp) = ctx.http_client.get(&url).send().await {
            if resp.status().is_success() {
                return Ok(());
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    bail!("relay never became healthy at {}", ctx.relay_addr)
}
