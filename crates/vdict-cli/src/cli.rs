use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(
    name = "vdict",
    about = "Versioned dictionaries stored on IPFS",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with daemon connection settings
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Daemon host, overriding the config file
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Daemon RPC port, overriding the config file
    #[arg(long, global = true)]
    pub port: Option<u16>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Save a new version with the given fields
    Put(PutArgs),
    /// Show the fields of a version
    Show(ShowArgs),
    /// Show what changed since the previous version
    Diff(DiffArgs),
    /// List a version and its ancestors, most recent first
    Log(LogArgs),
}

#[derive(Args)]
pub struct PutArgs {
    /// Fields as KEY=VALUE; VALUE is parsed as JSON, else taken as a string
    #[arg(required = true, value_parser = parse_assignment)]
    pub fields: Vec<(String, Value)>,
    /// Version to extend; its fields are carried over
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    pub cid: String,
}

#[derive(Args)]
pub struct DiffArgs {
    pub cid: String,
}

#[derive(Args)]
pub struct LogArgs {
    pub cid: String,
    /// Maximum number of versions to list
    #[arg(short = 'n', long)]
    pub depth: Option<usize>,
}

/// Split `KEY=VALUE` at the first `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    if key.is_empty() {
        return Err(format!("empty field name in `{raw}`"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
