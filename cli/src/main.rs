//! Barangay audit ledger CLI.
//!
//! Usage:
//!   ledger serve
//!   ledger append --actor admin --action ROLE_CHANGE --details "made juan an officer"
//!   ledger list --actor admin --date 2024-06-01
//!   ledger verify --policy recomputed
//!   ledger export --out audit-export.json
//!
//! Every subcommand reads `--config` (TOML) and honours `LEDGER_DB_PATH` and
//! `LEDGER_BIND`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ledger_audit::Ledger;
use ledger_config::LedgerConfig;
use ledger_contracts::{Block, BlockQuery, ChainPolicy, LedgerError, LedgerResult, SequenceRange};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Tamper-evident audit ledger for the barangay portal.
#[derive(Parser)]
#[command(
    name = "ledger",
    about = "Barangay portal audit ledger",
    long_about = "Appends, lists, verifies, and exports the hash-chained audit ledger,\n\
                  or serves it over HTTP."
)]
struct Cli {
    /// TOML config file. Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API until Ctrl-C.
    Serve,
    /// Append one event and print the new block.
    Append {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        action: String,
        #[arg(long, default_value = "")]
        details: String,
    },
    /// List blocks, oldest first.
    List {
        /// Case-insensitive substring of the actor.
        #[arg(long)]
        actor: Option<String>,
        /// Search actor, action, and hash.
        #[arg(long)]
        search: Option<String>,
        /// Only blocks stamped on this UTC day (YYYY-MM-DD).
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Only blocks with an id greater than this.
        #[arg(long)]
        after: Option<u64>,
        #[arg(long)]
        limit: Option<usize>,
        /// Print one JSON object per line.
        #[arg(long)]
        json: bool,
    },
    /// Verify the chain. Exits 2 when findings are reported.
    Verify {
        #[arg(long)]
        start: Option<u64>,
        #[arg(long)]
        end: Option<u64>,
        /// `stored-hash` or `recomputed`. Defaults to the configured policy.
        #[arg(long)]
        policy: Option<ChainPolicy>,
    },
    /// Write every block, a verification report, and the terminal hash as JSON.
    Export {
        /// Output file. Stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> LedgerResult<i32> {
    let config = LedgerConfig::load(cli.config.as_deref())?;
    let (ledger, worker) = Ledger::start(config.open_store()?, config.ledger_options())?;

    let code = match cli.command {
        Command::Serve => {
            ledger_server::serve(ledger, &config.server).await?;
            let appended = tokio::task::spawn_blocking(move || worker.join())
                .await
                .map_err(|e| LedgerError::ServerError {
                    reason: format!("writer shutdown failed: {}", e),
                })??;
            info!(appended, "ledger writer stopped");
            0
        }
        Command::Append {
            actor,
            action,
            details,
        } => {
            let block = ledger.append(actor, action, details).await?;
            print_json(&block)?;
            0
        }
        Command::List {
            actor,
            search,
            date,
            after,
            limit,
            json,
        } => {
            let mut query = BlockQuery::new();
            if let Some(actor) = actor {
                query = query.actor(actor);
            }
            if let Some(search) = search {
                query = query.search(search);
            }
            if let Some(day) = date {
                query = query.on(day);
            }
            if let Some(after) = after {
                query = query.after(after);
            }
            if let Some(limit) = limit {
                query = query.limit(limit);
            }
            for block in ledger.list_blocks(query) {
                let block = block?;
                if json {
                    println!("{}", to_json(&block, false)?);
                } else {
                    print_row(&block);
                }
            }
            0
        }
        Command::Verify { start, end, policy } => {
            let policy = policy.unwrap_or(ledger.policy());
            let report = ledger.verify_with(Some(SequenceRange::new(start, end)), policy)?;
            print_json(&report)?;
            if report.passed {
                0
            } else {
                2
            }
        }
        Command::Export { out } => {
            let export = ledger.export(BlockQuery::new())?;
            let body = to_json(&export, true)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, body).map_err(|e| {
                        LedgerError::store(format!("failed to write '{}': {}", path.display(), e))
                    })?;
                    info!(
                        path = %path.display(),
                        blocks = export.block_count,
                        terminal_hash = %export.terminal_hash,
                        "ledger exported"
                    );
                }
                None => println!("{}", body),
            }
            0
        }
    };

    Ok(code)
}

// ── Output ────────────────────────────────────────────────────────────────────

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> LedgerResult<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.map_err(|e| LedgerError::store(format!("failed to render JSON: {}", e)))
}

fn print_json<T: serde::Serialize>(value: &T) -> LedgerResult<()> {
    println!("{}", to_json(value, true)?);
    Ok(())
}

/// First 12 characters of `hash`. A tampered row may hold any text here.
fn short_hash(hash: &str) -> &str {
    hash.char_indices().nth(12).map_or(hash, |(end, _)| &hash[..end])
}

fn print_row(block: &Block) {
    println!(
        "{:>6}  {}  {:<16} {:<24} {}",
        block.sequence_id,
        ledger_contracts::canonical_timestamp(&block.timestamp),
        block.actor,
        block.action,
        short_hash(&block.hash),
    );
}
