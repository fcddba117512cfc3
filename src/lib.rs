//! clrvote: versioned records for the CLR voting program
//!
//! Agent profiles, ballots and vote items live in a local-first,
//! content-addressed ledger. Nothing is ever overwritten: every change is a
//! new immutable action, hash-linked back to the record it revises.
//!
//! # Core Principles
//!
//! - **Append-only**: actions, entries and links are only ever inserted
//! - **Content-addressed**: every action and entry is identified by its SHA-256
//! - **Origin identity**: a record's identity is the hash of its first version,
//!   no matter how often it is revised
//! - **Deletes are facts**: deleting attaches a marker; history stays readable
//! - **Local view**: reads see what has replicated here so far, nothing more
//!
//! # Architecture
//!
//! ## Ledger views
//!
//! Each agent holds one view (`<project>/.clrvote/data/ledger.db`). Views
//! exchange rows through `clrvote sync`; a view only ever grows.
//!
//! ## The Thin Waist
//!
//! All ledger access routes through `DbBroker` for:
//! - Serialization (in-process lock)
//! - Audit logging (`broker.events.jsonl`)
//!
//! ## Record kinds (Plugins)
//!
//! - `agent_profile`: registered voters
//! - `ballot`: questions put to vote
//! - `vote_item`: weighted votes
//!
//! # Examples
//!
//! ```bash
//! clrvote init
//! clrvote register --name Ada --email ada@example.org --password s3cret --region north
//! clrvote call get_all_revisions_for_agent_profile --payload '"<hash>"'
//! clrvote sync --peer ../other-node
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: ledger model, store, engine, call surface, config, logging
//! - [`plugins`]: record kind bindings

pub mod core;
pub mod plugins;

use crate::core::{
    broker, codec, config, error,
    hash::ActionHash,
    rpc,
    store::{RecordStore, Store},
    sync, time, trace,
};
use plugins::agent_profile::{self, AgentProfile};

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(
    name = "clrvote",
    version = env!("CARGO_PKG_VERSION"),
    about = "Versioned agent profiles, ballots and vote items over a replicated ledger"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create `.clrvote/` with a fresh agent identity and an empty ledger
    Init {
        /// Directory to initialize (defaults to current working directory).
        #[clap(short, long)]
        dir: Option<PathBuf>,
    },

    /// Register an agent profile (the registration form)
    Register {
        #[clap(long)]
        name: String,
        #[clap(long)]
        email: String,
        #[clap(long)]
        password: String,
        #[clap(long)]
        region: String,
    },

    /// Invoke a named operation, e.g. `get_latest_ballot`
    Call {
        fn_name: String,
        /// JSON payload; a bare hash may be given without quotes.
        #[clap(long)]
        payload: Option<String>,
        /// Read the JSON payload from a file instead.
        #[clap(long, conflicts_with = "payload")]
        payload_file: Option<PathBuf>,
    },

    /// Exchange ledger rows with another project's view
    Sync {
        /// Project directory of the peer (the one containing `.clrvote/`)
        #[clap(long)]
        peer: PathBuf,
    },

    /// This agent's source chain, oldest first
    Chain,

    /// Any stored record by action hash, whatever its kind
    Show { hash: String },

    /// Recent call traces
    Trace {
        #[clap(long, default_value = "10")]
        last: usize,
    },

    /// Store operation audit log
    Audit {
        #[clap(long, default_value = "20")]
        last: usize,
    },

    /// Operation and payload schemas
    Schema,
}

/// Open the project's store with its configured agent.
pub fn open_project(project_root: &Path) -> Result<(Store, config::Config), error::LedgerError> {
    let cfg = config::load_config(project_root)?;
    let store = Store::open(&config::store_root(project_root), cfg.agent()?)?;
    Ok((store, cfg))
}

/// Initialize a project directory. Keeps an existing agent identity.
pub fn init_project(target_dir: &Path) -> Result<(Store, config::Config), error::LedgerError> {
    let mut cfg = config::load_config(target_dir)?;
    if cfg.agent_pub_key.is_none() {
        cfg.agent_pub_key = Some(config::generate_agent_key(target_dir));
        config::save_config(target_dir, &cfg)?;
    }
    let store = Store::open(&config::store_root(target_dir), cfg.agent()?)?;
    Ok((store, cfg))
}

fn parse_payload(raw: Option<String>, file: Option<PathBuf>) -> Result<Value, error::LedgerError> {
    let text = match (raw, file) {
        (Some(r), _) => r,
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => return Ok(Value::Null),
    };
    match serde_json::from_str(&text) {
        Ok(v) => Ok(v),
        // Hashes are hex, so an unquoted one is unambiguous.
        Err(_) if !text.trim().is_empty() && text.trim().chars().all(|c| c.is_ascii_hexdigit()) => {
            Ok(Value::String(text.trim().to_string()))
        }
        Err(e) => Err(error::LedgerError::MalformedPayload(format!(
            "payload is not JSON: {}",
            e
        ))),
    }
}

fn print_json(value: &Value) -> Result<(), error::LedgerError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_init(target_dir: &Path) -> Result<(), error::LedgerError> {
    std::fs::create_dir_all(target_dir)?;
    let (store, cfg) = init_project(target_dir)?;
    println!(
        "{} Ledger ready at {}",
        "✓".bright_green(),
        store.db_path().display().to_string().bright_cyan()
    );
    println!("  agent: {}", store.agent.to_hex().bright_white());
    println!("  app:   {}", cfg.app_id);
    Ok(())
}

pub fn run() -> Result<(), error::LedgerError> {
    let cli = Cli::parse();
    let current_dir = std::env::current_dir()?;

    let command = match cli.command {
        Command::Init { dir } => {
            return run_init(&dir.unwrap_or(current_dir));
        }
        other => other,
    };

    let project_root = config::find_project_root(&current_dir)?;
    let (store, cfg) = open_project(&project_root)?;

    match command {
        Command::Init { .. } => run_init(&project_root)?,
        Command::Register {
            name,
            email,
            password,
            region,
        } => {
            let form = AgentProfile {
                name,
                email,
                password,
                region,
            };
            let request = rpc::CallRequest::new(
                &rpc::Operation::Create.fn_name(agent_profile::KIND),
                serde_json::to_value(&form)?,
            );
            let response = rpc::call(&store, request, cfg.trace.enabled)?;
            if let Some(err) = &response.error {
                eprintln!(
                    "{} Registration failed: {}",
                    "✗".bright_red(),
                    err.message
                );
                return Err(error::LedgerError::MalformedPayload(err.message.clone()));
            }
            let hash = response
                .result
                .as_ref()
                .and_then(|r| r.get("hash"))
                .cloned()
                .unwrap_or(Value::Null);
            println!("{} Registration successful", "✓".bright_green());
            print_json(&time::command_envelope(
                "register",
                "ok",
                serde_json::json!({ "app_id": cfg.app_id, "agent_profile_hash": hash }),
            ))?;
        }
        Command::Call {
            fn_name,
            payload,
            payload_file,
        } => {
            let payload = parse_payload(payload, payload_file)?;
            let response = rpc::call(
                &store,
                rpc::CallRequest::new(&fn_name, payload),
                cfg.trace.enabled,
            )?;
            print_json(&serde_json::to_value(&response)?)?;
        }
        Command::Sync { peer } => {
            let (peer_store, _) = open_project(&peer)?;
            let report = sync::sync_views(&[&store, &peer_store])?;
            if report.is_empty() {
                println!("{} Views already in sync", "✓".bright_green());
            } else {
                println!(
                    "{} Synced: {} actions, {} entries, {} links",
                    "▸".bright_cyan(),
                    report.actions_added,
                    report.entries_added,
                    report.links_added
                );
            }
            print_json(&time::command_envelope(
                "sync",
                "ok",
                serde_json::to_value(report)?,
            ))?;
        }
        Command::Chain => {
            let chain = store.source_chain()?;
            print_json(&serde_json::to_value(chain)?)?;
        }
        Command::Show { hash } => {
            let hash: ActionHash = hash.parse()?;
            let Some(record) = store.get_record(&hash)? else {
                return Err(error::LedgerError::NotFound(format!(
                    "{} is not in the local view",
                    hash
                )));
            };
            let entry = match &record.entry {
                Some(e) => codec::to_json(e.as_bytes())?,
                None => Value::Null,
            };
            print_json(&serde_json::json!({
                "hash": record.signed_action.hash,
                "action": record.signed_action.action,
                "entry": entry,
            }))?;
        }
        Command::Trace { last } => {
            let traces = trace::get_last_traces(&store.root, last)?;
            print_json(&serde_json::to_value(traces)?)?;
        }
        Command::Audit { last } => {
            let events = broker::read_audit_log(&store.root)?;
            let start = events.len().saturating_sub(last);
            print_json(&serde_json::to_value(&events[start..])?)?;
        }
        Command::Schema => {
            print_json(&rpc::schema())?;
        }
    }

    Ok(())
}
