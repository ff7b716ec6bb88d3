//! Furio: daily compounder for reward-vault wallets
//!
//! Main binary with subcommands:
//! - `daemon`: Restore the schedule and run the policy every interval
//! - `run-once`: Run the policy now without touching the schedule
//! - `status`: Show the persisted schedule and the restart decision
//! - `policy`: Print the resolved policy as TOML

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use furio_chain::{ContractAddresses, EvmLedger};
use furio_report::{HttpPriceLookup, LogSink, Reporter, WebhookSink};
use furio_scheduler::DEFAULT_INTERVAL_HOURS;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod daemon;

const DEFAULT_LOG_FILTER: &str =
    "furio=info,furio_scheduler=info,furio_executor=info,furio_chain=info,furio_report=info";

#[derive(Parser)]
#[command(name = "furio")]
#[command(about = "Daily vault compounder with confirmed, fee-escalating retries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler loop until interrupted
    Daemon {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        state: StateArgs,

        /// Hours between runs
        #[arg(long, default_value_t = DEFAULT_INTERVAL_HOURS)]
        interval_hours: i64,
    },

    /// Run the policy once now; the schedule is left untouched
    RunOnce {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Show the persisted schedule
    Status {
        #[command(flatten)]
        state: StateArgs,
    },

    /// Print the resolved policy as TOML
    Policy {
        #[command(flatten)]
        policy: PolicyArgs,

        /// Number of configured wallets, for validation
        #[arg(long, env = "FURIO_WALLET_COUNT", default_value_t = 5)]
        wallet_count: usize,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// JSON-RPC endpoint
    #[arg(long, env = "FURIO_RPC_URL")]
    rpc_url: String,

    /// Vault contract address
    #[arg(long, env = "FURIO_VAULT_ADDRESS")]
    vault_address: String,

    /// Pool contract address
    #[arg(long, env = "FURIO_POOL_ADDRESS")]
    pool_address: String,

    /// Number of wallets, read from ADR_n / PVK_n
    #[arg(long, env = "FURIO_WALLET_COUNT", default_value_t = 5)]
    wallet_count: usize,

    #[command(flatten)]
    policy: PolicyArgs,

    #[command(flatten)]
    report: ReportArgs,
}

#[derive(Args, Debug)]
struct PolicyArgs {
    /// Built-in policy: compound, claim-rotation or pool-only
    #[arg(long, default_value = "compound")]
    policy: String,

    /// TOML policy file, overrides --policy
    #[arg(long)]
    policy_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Webhook receiving `{to, subject, text}` reports
    #[arg(long, env = "FURIO_REPORT_WEBHOOK")]
    webhook_url: Option<String>,

    /// Recipient passed to the webhook
    #[arg(long, env = "FURIO_REPORT_RECIPIENT")]
    report_recipient: Option<String>,

    /// Price document included in reports
    #[arg(long, env = "FURIO_PRICE_API")]
    price_url: Option<String>,

    /// Block explorer transaction URL prefix, e.g. https://bscscan.com/tx
    #[arg(long, env = "FURIO_EXPLORER_URL")]
    explorer_url: Option<String>,
}

#[derive(Args, Debug)]
struct StateArgs {
    /// Schedule state file
    #[arg(long, env = "FURIO_STATE_PATH")]
    state_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Optional .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon {
            run,
            state,
            interval_hours,
        } => {
            let state_path =
                config::state_path(state.state_path).map_err(|e| miette::miette!("{}", e))?;
            let runner = build_runner(run)?;
            daemon::run(runner, state_path, interval_hours).await
        }

        Commands::RunOnce { run } => daemon::run_once(build_runner(run)?).await,

        Commands::Status { state } => {
            let state_path =
                config::state_path(state.state_path).map_err(|e| miette::miette!("{}", e))?;
            println!("{}", daemon::status(state_path).await?);
            Ok(())
        }

        Commands::Policy {
            policy,
            wallet_count,
        } => {
            let resolved = config::resolve_policy(&policy.policy, policy.policy_file.as_deref())
                .map_err(|e| miette::miette!("{}", e))?;
            resolved
                .validate(wallet_count)
                .map_err(|e| miette::miette!("{}", e))?;
            let text = resolved
                .to_toml_string()
                .map_err(|e| miette::miette!("{}", e))?;
            print!("{}", text);
            Ok(())
        }
    }
}

/// Resolve accounts, policy, ledger and sinks from the command line.
fn build_runner(args: RunArgs) -> Result<daemon::Runner> {
    let accounts =
        config::load_accounts_from_env(args.wallet_count).map_err(|e| miette::miette!("{}", e))?;

    let policy = config::resolve_policy(&args.policy.policy, args.policy.policy_file.as_deref())
        .map_err(|e| miette::miette!("{}", e))?;
    policy
        .validate(accounts.len())
        .map_err(|e| miette::miette!("{}", e))?;

    let contracts = ContractAddresses::parse(&args.vault_address, &args.pool_address)
        .map_err(|e| miette::miette!("{}", e))?;
    let ledger =
        EvmLedger::new(&args.rpc_url, contracts).map_err(|e| miette::miette!("{}", e))?;

    let mut reporter = Reporter::new().with_sink(LogSink);
    if let Some(url) = args.report.webhook_url {
        reporter = reporter.with_sink(WebhookSink::new(url, args.report.report_recipient));
    }
    if let Some(url) = args.report.price_url {
        reporter = reporter.with_price_lookup(HttpPriceLookup::new(url));
    }
    if let Some(url) = args.report.explorer_url {
        reporter = reporter.with_explorer_url(url);
    }

    tracing::info!(
        wallets = accounts.len(),
        policy = %policy.name,
        sinks = reporter.sink_count(),
        "configuration loaded"
    );

    Ok(daemon::Runner::new(
        Arc::new(ledger),
        accounts,
        policy,
        reporter,
    ))
}
