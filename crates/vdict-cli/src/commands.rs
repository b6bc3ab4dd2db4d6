use std::io::Write;

use anyhow::Context;
use colored::Colorize;
use serde_json::{json, Value};
use tracing::debug;
use vdict_sdk::{Cid, Lineage, SharedStore, StoreConfig, VersionedDictChain};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    debug!(api = %config.api_base(), "resolved store configuration");
    let store = vdict_store::connect(&config)?;
    let stdout = std::io::stdout();
    execute(cli.command, cli.format, store, &mut stdout.lock())
}

/// Config file first, then flag overrides.
fn resolve_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    Ok(config)
}

pub fn execute(
    command: Command,
    format: OutputFormat,
    store: SharedStore,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Command::Put(args) => cmd_put(args, format, store, out),
        Command::Show(args) => cmd_show(args, format, store, out),
        Command::Diff(args) => cmd_diff(args, format, store, out),
        Command::Log(args) => cmd_log(args, format, store, out),
    }
}

fn cmd_put(
    args: PutArgs,
    format: OutputFormat,
    store: SharedStore,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut chain = match &args.parent {
        Some(parent) => VersionedDictChain::open_str(store, parent)
            .with_context(|| format!("loading parent {parent}"))?,
        None => VersionedDictChain::new(store),
    };
    for (name, value) in args.fields {
        chain.set(name, value)?;
    }
    let cid = chain.save()?;

    match format {
        OutputFormat::Json => print_json(
            out,
            &json!({ "cid": cid, "previous_cid": chain.previous_cid() }),
        )?,
        OutputFormat::Text => {
            writeln!(out, "{} Saved {}", "✓".green().bold(), cid.to_string().yellow())?;
            if let Some(previous) = chain.previous_cid() {
                writeln!(out, "  Previous: {}", previous.to_string().dimmed())?;
            }
        }
    }
    Ok(())
}

fn cmd_show(
    args: ShowArgs,
    format: OutputFormat,
    store: SharedStore,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let chain = VersionedDictChain::open_str(store, &args.cid)?;
    match format {
        OutputFormat::Json => print_json(out, &chain.state())?,
        OutputFormat::Text => {
            if let Some(cid) = chain.identity() {
                writeln!(out, "{} {}", "Version".bold(), cid.to_string().yellow())?;
            }
            match chain.previous_cid() {
                Some(previous) => writeln!(out, "Previous: {}", previous.to_string().dimmed())?,
                None => writeln!(out, "Previous: {}", "none".dimmed())?,
            }
            for (name, value) in chain.items() {
                writeln!(out, "  {} = {}", name.cyan(), value)?;
            }
        }
    }
    Ok(())
}

fn cmd_diff(
    args: DiffArgs,
    format: OutputFormat,
    store: SharedStore,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let chain = VersionedDictChain::open_str(store, &args.cid)?;
    let changes = chain.changes()?;
    match format {
        OutputFormat::Json => print_json(out, &changes)?,
        OutputFormat::Text => {
            if changes.is_empty() {
                writeln!(out, "No changes.")?;
            }
            for (name, change) in changes.iter() {
                match &change.old {
                    None => writeln!(out, "  {} {}: {}", "+".green(), name.bold(), change.new)?,
                    Some(old) => writeln!(
                        out,
                        "  {} {}: {} -> {}",
                        "~".yellow(),
                        name.bold(),
                        old.to_string().red(),
                        change.new.to_string().green()
                    )?,
                }
            }
            writeln!(out, "{} added, {} modified", changes.added(), changes.modified())?;
        }
    }
    Ok(())
}

fn cmd_log(
    args: LogArgs,
    format: OutputFormat,
    store: SharedStore,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let head = Cid::new(&args.cid)?;
    let depth = args.depth.unwrap_or(usize::MAX);
    let mut entries = Vec::new();
    for step in Lineage::new(store.as_ref(), Some(head)).take(depth) {
        let ancestor = step?;
        match format {
            OutputFormat::Json => entries.push(json!({
                "cid": ancestor.cid,
                "previous_cid": ancestor.previous_cid,
                "fields": ancestor.fields.len(),
            })),
            OutputFormat::Text => {
                let marker = if ancestor.previous_cid.is_none() { " (root)" } else { "" };
                writeln!(
                    out,
                    "{}  {} fields{}",
                    ancestor.cid.to_string().yellow(),
                    ancestor.fields.len(),
                    marker.dimmed()
                )?;
            }
        }
    }
    if format == OutputFormat::Json {
        print_json(out, &Value::Array(entries))?;
    }
    Ok(())
}

fn print_json(out: &mut impl Write, value: &impl serde::Serialize) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
