//! seqstore CLI
//!
//! Command-line interface for inspecting and driving a store directory.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use seqstore::{Config, ContentHash, SequenceStore, ShardStore, Status};
use tracing_subscriber::{fmt, EnvFilter};

/// seqstore CLI
#[derive(Parser, Debug)]
#[command(name = "seqstore-cli")]
#[command(about = "CLI for the seqstore fixed-width record store")]
#[command(version)]
struct Args {
    /// Store root directory
    #[arg(short, long, default_value = "./seqstore_data")]
    root: String,

    /// Records per shard file (shard commands only)
    #[arg(long, default_value_t = seqstore::config::DEFAULT_SHARD_CAPACITY)]
    shard_capacity: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Sequence(SequenceCommand),

    #[command(flatten)]
    Shard(ShardCommand),
}

/// Commands against `{root}/{key}/data` files
#[derive(Subcommand, Debug)]
enum SequenceCommand {
    /// Append a record and print its sequence number
    Append {
        key: String,

        /// Initial status byte
        #[arg(short, long, default_value_t = 0)]
        status: u8,
    },

    /// Print the number of records for a key
    Count { key: String },

    /// Print the status of a record
    Status { key: String, sequence: u64 },

    /// Print the correlation token of a record
    Token { key: String, sequence: u64 },

    /// Set the status byte of one record
    SetStatus {
        key: String,
        sequence: u64,
        status: u8,
    },

    /// Confirm records and move the last-updated watermark
    Confirm {
        key: String,
        #[arg(required = true)]
        sequences: Vec<u64>,
    },

    /// Print the last-updated watermark for a key
    LastUpdated { key: String },

    /// List pending sequence numbers for a key
    Pending { key: String },

    /// List known keys
    Keys,
}

/// Commands against `{root}/{key}_{n}.vmo` shard files
#[derive(Subcommand, Debug)]
enum ShardCommand {
    /// Record a content hash (32 hex digits) in the shard store
    HashAdd {
        key: String,
        hash: ContentHash,
        #[arg(short, long, default_value_t = 0)]
        status: u8,
    },

    /// Print the shard record for a content hash
    HashGet { key: String, hash: ContentHash },

    /// Set the status byte of a content hash record
    HashStatus {
        key: String,
        hash: ContentHash,
        status: u8,
    },
}

fn main() -> ExitCode {
    // Initialize tracing/logging (stderr, so command output stays clean)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,seqstore=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::debug!("seqstore CLI v{}", seqstore::VERSION);

    let config = Config::builder()
        .root_dir(&args.root)
        .shard_capacity(args.shard_capacity)
        .build();

    match run(config, args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: Config, command: Commands) -> seqstore::Result<()> {
    match command {
        Commands::Sequence(command) => run_sequence(SequenceStore::open(config)?, command),
        Commands::Shard(command) => run_shard(ShardStore::open(config)?, command),
    }
}

fn run_sequence(store: SequenceStore, command: SequenceCommand) -> seqstore::Result<()> {
    match command {
        SequenceCommand::Append { key, status } => {
            println!("{}", store.append(&key, Status(status))?);
        }
        SequenceCommand::Count { key } => println!("{}", store.record_count(&key)?),
        SequenceCommand::Status { key, sequence } => {
            println!("{}", store.status(&key, sequence)?)
        }
        SequenceCommand::Token { key, sequence } => println!("{}", store.token(&key, sequence)?),
        SequenceCommand::SetStatus {
            key,
            sequence,
            status,
        } => store.set_status(&key, sequence, Status(status))?,
        SequenceCommand::Confirm { key, sequences } => store.set_statuses(&key, &sequences)?,
        SequenceCommand::LastUpdated { key } => println!("{}", store.last_updated(&key)?),
        SequenceCommand::Pending { key } => {
            for sequence in store.pending(&key)? {
                println!("{}", sequence);
            }
        }
        SequenceCommand::Keys => {
            for key in store.keys() {
                println!("{}", key);
            }
        }
    }
    store.close_all();
    Ok(())
}

fn run_shard(store: ShardStore, command: ShardCommand) -> seqstore::Result<()> {
    match command {
        ShardCommand::HashAdd { key, hash, status } => {
            let location = store.append(&key, hash, Status(status))?;
            println!("shard {} record {}", location.shard, location.index);
        }
        ShardCommand::HashGet { key, hash } => {
            let record = store.record(&key, &hash)?;
            println!("hash             {}", record.hash);
            println!("occurrences      {}", record.occurrence_count);
            println!("last occurrence  {}", record.last_occurrence);
            println!("status           {}", record.status);
            println!("token            {}", record.token);
        }
        ShardCommand::HashStatus { key, hash, status } => {
            store.set_status(&key, &hash, Status(status))?;
        }
    }
    store.close_all();
    Ok(())
}
