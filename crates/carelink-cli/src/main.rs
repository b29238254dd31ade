//! Carelink CLI - journal inspection and contract fingerprint tooling.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod path;

use commands::{balance, canonicalize, fingerprint, hash, list, supply, verify};

#[derive(Parser)]
#[command(name = "carelink")]
#[command(about = "Carelink ledger journal and contract fingerprint CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the canonical form of input JSON
    Canonicalize {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
    },
    /// Print the content hash of input JSON
    Hash {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
    },
    /// Compute the fingerprint of a contract and check any recorded one
    Fingerprint {
        /// Contract JSON file
        contract: String,
    },
    /// List ledger entries in a journal
    List {
        /// Path to journal file
        journal: String,
        /// Only entries of this account
        #[arg(long)]
        account: Option<String>,
        /// Output as JSON lines
        #[arg(long)]
        json: bool,
        /// Stop after N entries (default: unlimited)
        #[arg(long)]
        max_entries: Option<u64>,
    },
    /// Print the derived balance of an account
    Balance {
        /// Path to journal file
        journal: String,
        /// Account id
        account: String,
    },
    /// Print minted, burned and circulating supply
    Supply {
        /// Path to journal file
        journal: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Verify every commit in a journal
    Verify {
        /// Path to journal file
        journal: String,
        /// Fail on a torn trailing frame and exit with an error if any commit is invalid
        #[arg(long)]
        strict: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("carelink=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Canonicalize { input } => canonicalize::run(input),
        Commands::Hash { input } => hash::run(input),
        Commands::Fingerprint { contract } => fingerprint::run(contract),
        Commands::List {
            journal,
            account,
            json,
            max_entries,
        } => list::run(journal, account, json, max_entries),
        Commands::Balance { journal, account } => balance::run(journal, account),
        Commands::Supply { journal, json } => supply::run(journal, json),
        Commands::Verify {
            journal,
            strict,
            json,
        } => verify::run(journal, strict, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
