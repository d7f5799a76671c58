//! Command-line front end for the bramble index.
#![forbid(unsafe_code)]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{error, info};

use bramble::{init_logging, Config, Result, Storage, Tree, TreeError};

#[derive(Parser, Debug)]
#[command(
    name = "bramble",
    version,
    about = "Ordered key-value index backed by a JSON snapshot",
    after_help = "Configuration comes from the environment: TREE_DEGREE \
                  (>= 2, default 3), STORAGE_PATH (default data/tree.json), \
                  LOG_LEVEL (debug|info|warn|error, default info)."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert a key-value pair and persist the tree
    Insert {
        /// Integer key to insert under
        key: i64,
        /// Value stored with the key
        value: String,
    },
    /// Delete a key and persist the tree
    Delete {
        /// Integer key to remove
        key: i64,
    },
    /// Look up a key
    Search {
        /// Integer key to look up
        key: i64,
    },
    /// Save the tree to the storage path
    Save,
    /// Load the tree from the storage path and show it
    Load,
    /// Print the tree structure
    Print,
    /// Check the structural invariants
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let cfg = Config::from_env()?;
    init_logging(cfg.log_level.as_str())?;

    let storage = Storage::new(cfg.storage_path.clone());
    let tree = open_tree(&storage, &cfg)?;

    match cli.command {
        Command::Insert { key, value } => {
            tree.insert(key, Value::String(value));
            storage.save(&tree)?;
            println!("inserted key {key}");
        }
        Command::Delete { key } => {
            let removed = tree.delete(key);
            storage.save(&tree)?;
            if removed {
                println!("deleted key {key}");
            } else {
                println!("key {key} not present");
            }
        }
        Command::Search { key } => match tree.search(key) {
            Some(value) => println!("{key} -> {value}"),
            None => println!("key {key} not found"),
        },
        Command::Save => {
            storage.save(&tree)?;
            println!("tree saved to {}", storage.path().display());
        }
        Command::Load => {
            let loaded = storage.load()?;
            print!("{}", loaded.to_display_string());
        }
        Command::Print => {
            print!("{}", tree.to_display_string());
        }
        Command::Validate => {
            let report = tree.validate();
            println!("{report}");
            if !report.is_valid() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Opens the persisted tree, or starts fresh when no snapshot exists yet.
/// Any other load failure aborts startup: silently replacing a corrupt
/// snapshot would let the next auto-save destroy it.
fn open_tree(storage: &Storage, cfg: &Config) -> Result<Tree> {
    match storage.load() {
        Ok(tree) => Ok(tree),
        Err(TreeError::SnapshotMissing(_)) => {
            info!(degree = cfg.tree_degree, "no snapshot found, starting fresh");
            Tree::new(cfg.tree_degree)
        }
        Err(e) => Err(e),
    }
}
