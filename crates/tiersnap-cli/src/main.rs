// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! tiersnap: push snapshots of a directory to a local or ssh target and keep
//! them in hourly, daily, weekly, monthly and yearly generations.
//!
//! # Usage
//! ```text
//! tiersnap backup nas:/srv/snaps/laptop --source ~/
//! tiersnap rotate /mnt/usb/snaps --dry-run
//! tiersnap status nas:/srv/snaps/laptop
//! tiersnap config init --monthly 24
//! ```
//!
//! Limits come from the saved config (defaults 24/7/4/13/4), then from flags.
//! Run `backup` from cron once an hour.

// The CLI is expected to print to stdout/stderr.
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod disk;
mod listing;
mod local;
mod remote;
mod render;
mod rsync;
mod shell;
mod target;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use time::OffsetDateTime;
use tiersnap_app_core::config::ConfigService;
use tiersnap_app_core::prefs::{RetentionPrefs, RETENTION_KEY};
use tiersnap_config_fs::FsConfigStore;
use tiersnap_core::{collect, dry_run, sync, Engine, Snapshot, SnapshotStore, Tier};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::disk::DiskUsage;
use crate::local::LocalStore;
use crate::remote::ShellStore;
use crate::rsync::RsyncTransfer;
use crate::shell::Shell;
use crate::target::Target;

#[derive(Parser)]
#[command(
    name = "tiersnap",
    version,
    about = "Generational snapshots over rsync",
    disable_help_subcommand = true
)]
struct Cli {
    /// More logging (`-v` debug, `-vv` trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Read and write config here instead of the platform config directory.
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transfer the source into the target, then rotate.
    Backup(BackupArgs),
    /// Rotate the snapshots already on the target.
    Rotate(RotateArgs),
    /// Show the snapshots on the target and the space left.
    Status(StatusArgs),
    /// Inspect or write the saved retention limits.
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Per-tier limit overrides. `0` disables a tier.
#[derive(Args, Default)]
struct Limits {
    /// Hourly snapshots to keep.
    #[arg(long, value_name = "N")]
    hourly: Option<usize>,
    /// Daily snapshots to keep.
    #[arg(long, value_name = "N")]
    daily: Option<usize>,
    /// Weekly snapshots to keep.
    #[arg(long, value_name = "N")]
    weekly: Option<usize>,
    /// Monthly snapshots to keep.
    #[arg(long, value_name = "N")]
    monthly: Option<usize>,
    /// Yearly snapshots to keep.
    #[arg(long, value_name = "N")]
    yearly: Option<usize>,
}

impl Limits {
    fn apply(&self, prefs: &mut RetentionPrefs) {
        let overrides = [self.hourly, self.daily, self.weekly, self.monthly, self.yearly];
        for (tier, limit) in Tier::ALL.into_iter().zip(overrides) {
            if let Some(limit) = limit {
                prefs.set_limit(tier, limit);
            }
        }
    }
}

#[derive(Args)]
struct BackupArgs {
    /// `host:path` or a local directory holding the snapshots.
    target: Target,

    /// Directory to back up.
    #[arg(long, default_value = ".")]
    source: PathBuf,

    /// Keep files in the newest snapshot that were deleted at the source.
    #[arg(long)]
    no_delete: bool,

    /// Extra rsync `--exclude` pattern (repeatable).
    #[arg(long = "exclude", value_name = "PATTERN")]
    excludes: Vec<String>,

    /// rsync binary to run.
    #[arg(long, default_value = "rsync", hide = true)]
    rsync: String,

    /// Print the rotation report as JSON.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    limits: Limits,
}

#[derive(Args)]
struct RotateArgs {
    /// `host:path` or a local directory holding the snapshots.
    target: Target,

    /// Show what would happen without changing anything.
    #[arg(long)]
    dry_run: bool,

    /// Print the rotation report as JSON.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    limits: Limits,
}

#[derive(Args)]
struct StatusArgs {
    /// `host:path` or a local directory holding the snapshots.
    target: Target,

    /// Skip the `df` query.
    #[arg(long)]
    no_disk: bool,

    /// Print snapshots and disk usage as JSON.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    limits: Limits,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the saved limits (defaults when nothing is saved).
    Show,
    /// Save limits, starting from the defaults.
    Init {
        /// Replace an existing config.
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        limits: Limits,
    },
}

#[derive(Serialize)]
struct StatusJson<'a> {
    target: String,
    snapshots: Vec<Snapshot>,
    disk: Option<&'a DiskUsage>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;
    let config = config_service(cli.config_dir.as_ref())?;

    match cli.command {
        Commands::Backup(args) => run_backup(&config, args),
        Commands::Rotate(args) => run_rotate(&config, args),
        Commands::Status(args) => run_status(&config, args),
        Commands::Config(command) => run_config(&config, command),
    }
}

fn init_tracing(verbose: u8, quiet: bool) -> Result<()> {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn config_service(dir: Option<&PathBuf>) -> Result<ConfigService<FsConfigStore>> {
    let store = match dir {
        Some(dir) => FsConfigStore::at(dir),
        None => FsConfigStore::new(),
    }
    .context("failed to open the config directory")?;
    Ok(ConfigService::new(store))
}

fn load_prefs(config: &ConfigService<FsConfigStore>, limits: &Limits) -> Result<RetentionPrefs> {
    let mut prefs: RetentionPrefs = config.load_or_default(RETENTION_KEY).with_context(|| {
        format!(
            "failed to read {}",
            config.store().path_for(RETENTION_KEY).display()
        )
    })?;
    limits.apply(&mut prefs);
    Ok(prefs)
}

fn open_store(target: &Target) -> Result<Box<dyn SnapshotStore>> {
    let store: Box<dyn SnapshotStore> = match target {
        Target::Local(path) => Box::new(LocalStore::open(path)?),
        Target::Remote { host, path } => Box::new(ShellStore::open(
            Shell::Ssh { host: host.clone() },
            path.clone(),
        )?),
    };
    Ok(store)
}

fn run_backup(config: &ConfigService<FsConfigStore>, args: BackupArgs) -> Result<()> {
    let prefs = load_prefs(config, &args.limits)?;
    if !args.source.is_dir() {
        bail!("source {} is not a directory", args.source.display());
    }
    let mut store = open_store(&args.target).with_context(|| format!("cannot reach {}", args.target))?;
    let mut transfer = RsyncTransfer::new(&args.source, args.target.clone())
        .delete(prefs.rsync_delete && !args.no_delete)
        .excludes(prefs.excludes.iter().cloned().chain(args.excludes))
        .program(args.rsync);

    let plan = sync(&mut store, &mut transfer).context("transfer failed")?;
    info!(dest = %args.target, slot = %plan.target(), "transfer finished");

    let report = Engine::new(&mut store, prefs.policy())
        .rotate()
        .context("rotation failed; the next run will pick up where this one stopped")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render::report(&report));
    }
    Ok(())
}

fn run_rotate(config: &ConfigService<FsConfigStore>, args: RotateArgs) -> Result<()> {
    let prefs = load_prefs(config, &args.limits)?;
    let mut store = open_store(&args.target).with_context(|| format!("cannot reach {}", args.target))?;
    let report = if args.dry_run {
        dry_run(&store, &prefs.policy()).context("planning failed")?
    } else {
        Engine::new(&mut store, prefs.policy())
            .rotate()
            .context("rotation failed; the next run will pick up where this one stopped")?
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if args.dry_run {
            println!("dry run, nothing changed:");
        }
        println!("{}", render::report(&report));
    }
    Ok(())
}

fn run_status(config: &ConfigService<FsConfigStore>, args: StatusArgs) -> Result<()> {
    let prefs = load_prefs(config, &args.limits)?;
    let store = open_store(&args.target).with_context(|| format!("cannot reach {}", args.target))?;
    let collection = collect(
        store.list().context("failed to list snapshots")?,
        &prefs.policy(),
    );
    let disk = if args.no_disk {
        None
    } else {
        let (shell, path) = match &args.target {
            Target::Local(path) => (Shell::Local, path.display().to_string()),
            Target::Remote { host, path } => (Shell::Ssh { host: host.clone() }, path.clone()),
        };
        DiskUsage::query(&shell, &path)
            .inspect_err(|err| warn!(%err, "disk usage unavailable"))
            .ok()
    };

    if args.json {
        let status = StatusJson {
            target: args.target.to_string(),
            snapshots: collection.iter().copied().collect(),
            disk: disk.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", args.target);
    println!("{}", render::status_table(&collection, OffsetDateTime::now_utc()));
    println!("{}", render::tier_summary(&collection));
    if let Some(disk) = &disk {
        println!("{}", render::disk_line(disk));
    }
    Ok(())
}

fn run_config(config: &ConfigService<FsConfigStore>, command: ConfigCommand) -> Result<()> {
    let path = config.store().path_for(RETENTION_KEY);
    match command {
        ConfigCommand::Show => {
            let prefs = load_prefs(config, &Limits::default())?;
            println!("# {}", path.display());
            println!("{}", serde_json::to_string_pretty(&prefs)?);
        }
        ConfigCommand::Init { force, limits } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to replace it)", path.display());
            }
            let mut prefs = RetentionPrefs::default();
            limits.apply(&mut prefs);
            config
                .save(RETENTION_KEY, &prefs)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}
