use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::Value;
use treesync_diff::{diff, DiffOptions};
use treesync_patch::apply;
use treesync_types::{encode_patch, patch_from_str, OpKind, PatchOperation, SyncConfig};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref(), cli.id_field)?;
    match cli.command {
        Command::Diff(args) => cmd_diff(args, config, &cli.format),
        Command::Apply(args) => cmd_apply(args, config, &cli.format),
        Command::Check(args) => cmd_check(args, config, &cli.format),
    }
}

fn load_config(path: Option<&Path>, id_field: Option<String>) -> anyhow::Result<SyncConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            SyncConfig::from_toml_str(&text)?
        }
        None => SyncConfig::default(),
    };
    if let Some(field) = id_field {
        config.id_field = field;
        config.validate()?;
    }
    Ok(config)
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn diff_options(args: &DiffArgs, config: SyncConfig) -> DiffOptions {
    let opts = DiffOptions::new().ancestor_path(args.ancestor.clone()).config(config);
    match &args.hash_key {
        Some(field) => opts.hash_by_field(field.clone()),
        None => opts,
    }
}

fn cmd_diff(args: DiffArgs, config: SyncConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let old = read_json(&args.old)?;
    let new = read_json(&args.new)?;
    let ops = diff(&old, &new, &diff_options(&args, config))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&encode_patch(&ops)?)?),
        OutputFormat::Text => {
            if ops.is_empty() {
                println!("No changes.");
            }
            for op in &ops {
                print_operation(op);
            }
        }
    }
    Ok(())
}

fn cmd_apply(args: ApplyArgs, config: SyncConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let tree = read_json(&args.tree)?;
    let text = fs::read_to_string(&args.patch)
        .with_context(|| format!("reading {}", args.patch.display()))?;
    let ops = patch_from_str(&text)?;
    let updated = apply(&tree, &ops, &config)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&updated)?),
        OutputFormat::Text => {
            println!("{} Applied {} operations.", "✓".green().bold(), ops.len());
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
    }
    Ok(())
}

fn cmd_check(args: DiffArgs, config: SyncConfig, format: &OutputFormat) -> anyhow::Result<()> {
    if !args.ancestor.is_empty() {
        bail!("--ancestor is not supported by check; diff the full trees instead");
    }
    let old = read_json(&args.old)?;
    let new = read_json(&args.new)?;
    let ops = diff(&old, &new, &diff_options(&args, config.clone()))?;
    let rebuilt = apply(&old, &ops, &config)?;
    let ok = rebuilt == new;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "operations": ops.len(), "round_trip": ok })
        ),
        OutputFormat::Text if ok => println!(
            "{} Round trip holds ({} operations).",
            "✓".green().bold(),
            ops.len()
        ),
        OutputFormat::Text => println!(
            "{} Round trip failed after {} operations.",
            "✗".red().bold(),
            ops.len()
        ),
    }

    if !ok {
        bail!("applying the diff of {} did not reproduce {}", args.old.display(), args.new.display());
    }
    Ok(())
}

fn print_operation(op: &PatchOperation) {
    let name = match op.op {
        OpKind::Add => op.op.as_str().green(),
        OpKind::Remove => op.op.as_str().red(),
        OpKind::Replace => op.op.as_str().yellow(),
        OpKind::Upsert => op.op.as_str().cyan(),
        OpKind::Limit => op.op.as_str().magenta(),
    };
    let path = if op.path.is_empty() { "(root)" } else { op.path.as_str() };
    match &op.value {
        Some(value) => println!("{:>8} {} {}", name.bold(), path, value.to_string().dimmed()),
        None => println!("{:>8} {}", name.bold(), path),
    }
}
