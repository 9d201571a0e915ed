use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use noncey_core::{Chain, SweepMode};
use noncey_runner::{Config, Sweeper};

#[derive(Parser)]
#[command(name = "noncey", version, about = "Assign sequential safe nonces across governance tasks")]
struct Cli {
    /// Chain whose tasks are swept: eth (mainnet) or sep (sepolia)
    #[arg(value_parser = parse_chain)]
    chain: Chain,

    /// Repository root (defaults to the current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Config file (defaults to <root>/noncey.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Compute and print nonces without writing any task config
    #[arg(long)]
    dry_run: bool,

    /// Only validate the safe registry
    #[arg(long, conflicts_with = "dry_run")]
    check: bool,

    /// Print the sweep report as JSON
    #[arg(long)]
    json: bool,
}

fn parse_chain(s: &str) -> Result<Chain, String> {
    Chain::parse(s).ok_or_else(|| format!("unknown chain `{}` (use: eth, sep)", s))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let repo_root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    let cfg = Config::load(&repo_root, cli.config.as_deref())?;
    let sweeper = Sweeper::open(&repo_root, &cfg);

    if cli.check {
        let check = sweeper.check(cli.chain)?;
        println!("Registry OK: {} safes", check.safes);
        for (safe, owner) in &check.unknown_owners {
            println!("- warning: {} lists owner {} which is not in the registry", safe, owner);
        }
        return Ok(());
    }

    let mode = if cli.dry_run { SweepMode::DryRun } else { SweepMode::Write };
    let report = sweeper.run(cli.chain, mode)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_text());
    }

    Ok(())
}
