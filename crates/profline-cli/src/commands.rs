use std::fs;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;
use tracing::debug;

use profline_codec::{Format, ProfileTransport};
use profline_core::{LoadAction, LoadReport, Profile};
use profline_persist::{CreatePolicy, OpenOutcome, ProfileStore, StoreOptions};

use crate::cli::*;

pub fn run_command(cli: Cli, overrides: Vec<String>) -> anyhow::Result<()> {
    let mut store = open_store(&cli, &overrides)?;
    let output = cli.output;
    match cli.command {
        Command::Get(args) => cmd_get(&mut store, args, &output),
        Command::Set(args) => cmd_set(&mut store, args),
        Command::Remove(args) => cmd_remove(&mut store, args),
        Command::List(args) => cmd_list(&store, args, &output),
        Command::Convert(args) => cmd_convert(&mut store, args),
        Command::Pack(args) => cmd_pack(&store, args),
        Command::Unpack(args) => cmd_unpack(&mut store, args),
    }
}

fn open_store(cli: &Cli, overrides: &[String]) -> anyhow::Result<ProfileStore> {
    let creates = match &cli.command {
        Command::Set(_) | Command::Unpack(_) => true,
        Command::Get(args) => args.default.is_some(),
        _ => false,
    };
    let format = cli
        .format
        .or_else(|| cli.profile.as_deref().and_then(Format::from_path))
        .unwrap_or_default();

    let options = StoreOptions {
        path: cli.profile.clone(),
        format,
        create: if creates { CreatePolicy::Always } else { CreatePolicy::Never },
        ..Default::default()
    };
    let command_line = Profile::parse_args(overrides).context("invalid override")?;
    debug!(path = ?options.path, %format, overrides = command_line.len(), "opening profile");

    let mut store = ProfileStore::new(options);
    match store.open(command_line, None)? {
        OpenOutcome::Created => {
            if let Some(path) = store.path() {
                eprintln!("{} Created {}", "✓".green(), path.display().to_string().bold());
            }
        }
        OpenOutcome::Loaded { converted: true } => {
            eprintln!("{} Converted {} to {}", "!".yellow(), display_path(&store), store.format());
        }
        OpenOutcome::NotCreated if !creates => {
            eprintln!("{} No profile at {}", "!".yellow(), display_path(&store));
        }
        _ => {}
    }
    Ok(store)
}

fn display_path(store: &ProfileStore) -> String {
    store
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

fn cmd_get(store: &mut ProfileStore, args: GetArgs, output: &OutputFormat) -> anyhow::Result<()> {
    let values: Vec<String> = if let Some(default) = args.default {
        vec![store.get_add(&args.key, default)?.text().into_owned()]
    } else if args.all {
        store
            .profile()
            .values_of(&args.key)
            .iter()
            .map(|v| v.text().into_owned())
            .collect()
    } else {
        store
            .get(&args.key)
            .map(|v| vec![v.text().into_owned()])
            .with_context(|| format!("{} is not set", args.key))?
    };

    match output {
        OutputFormat::Json => println!("{}", json!({ "key": args.key, "values": values })),
        OutputFormat::Text => {
            for value in &values {
                println!("{value}");
            }
        }
    }
    Ok(())
}

fn cmd_set(store: &mut ProfileStore, args: SetArgs) -> anyhow::Result<()> {
    store.set(&args.key, args.value.as_str())?;
    println!("{} {} = {}", "✓".green(), args.key.bold(), args.value);
    Ok(())
}

fn cmd_remove(store: &mut ProfileStore, args: RemoveArgs) -> anyhow::Result<()> {
    let removed = store.remove(&args.pattern)?;
    if removed == 0 {
        println!("No entries match {}", args.pattern.yellow());
    } else {
        println!("{} Removed {} entries", "✓".green(), removed.to_string().bold());
    }
    Ok(())
}

fn cmd_list(store: &ProfileStore, args: ListArgs, output: &OutputFormat) -> anyhow::Result<()> {
    let listed = match &args.pattern {
        Some(pattern) => store.subset(pattern, args.strip),
        None => store.profile().clone(),
    };

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listed)?),
        OutputFormat::Text => {
            for entry in &listed {
                let value = entry.value.text();
                if value.contains('\n') {
                    println!("{} =", entry.key.cyan());
                    for line in value.lines() {
                        println!("    {line}");
                    }
                } else {
                    println!("{} = {}", entry.key.cyan(), value);
                }
            }
        }
    }
    Ok(())
}

fn cmd_convert(store: &mut ProfileStore, args: ConvertArgs) -> anyhow::Result<()> {
    let source = store.path().map(|p| p.to_path_buf()).context("no profile file")?;
    let target = source.with_extension(args.to.extension());
    store.set_format(args.to);
    store.save_as(&target)?;
    println!(
        "{} Wrote {} as {}",
        "✓".green(),
        target.display().to_string().bold(),
        args.to
    );
    Ok(())
}

fn cmd_pack(store: &ProfileStore, args: PackArgs) -> anyhow::Result<()> {
    let packed = store.compress()?;
    fs::write(&args.out, &packed).with_context(|| format!("writing {}", args.out.display()))?;
    println!(
        "{} Packed {} entries into {} bytes",
        "✓".green(),
        store.profile().len(),
        packed.len().to_string().bold()
    );
    Ok(())
}

fn cmd_unpack(store: &mut ProfileStore, args: UnpackArgs) -> anyhow::Result<()> {
    let data = fs::read(&args.input).with_context(|| format!("reading {}", args.input.display()))?;
    let incoming = Profile::decompress(&data)?;
    let action = match args.action {
        ActionArg::Append => LoadAction::Append,
        ActionArg::Merge => LoadAction::Merge,
        ActionArg::Overwrite => LoadAction::Overwrite,
    };

    let report = store.profile_mut().load(incoming, action);
    store.save()?;
    println!("{} {}", "✓".green(), unpack_summary(&report));
    Ok(())
}

fn unpack_summary(report: &LoadReport) -> String {
    let mut parts = vec![
        format!("{} appended", report.appended),
        format!("{} replaced", report.replaced),
    ];
    if report.collapsed > 0 {
        parts.push(format!("{} collapsed", report.collapsed));
    }
    if report.skipped > 0 {
        parts.push(format!("{} skipped", report.skipped));
    }
    format!(
        "Unpacked {} entries ({})",
        report.applied.len().to_string().bold(),
        parts.join(", ")
    )
}
