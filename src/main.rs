use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rinktunes::durations::DurationTable;
use rinktunes::probe::Prober;
use rinktunes::scanner::groups::GroupTable;
use rinktunes::scanner::ScanMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rinktunes", version, about = "Hockey arena music library tools")]
struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe every audio file in a folder and list durations
    Scan {
        /// Folder to scan (defaults to config file music_dir)
        dir: Option<PathBuf>,

        /// Treat each sub-folder as a song group (Goal, Intro, ...)
        #[arg(short, long)]
        grouped: bool,

        /// Number of parallel probes (0 = auto-detect from config)
        #[arg(short = 'j', long, default_value = "0")]
        jobs: usize,

        /// Also write the results as a duration table file
        #[arg(long, value_name = "PATH")]
        write_table: Option<PathBuf>,
    },

    /// Probe individual files
    Probe {
        /// Files to probe
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Copy durations from the duration table into the song catalog
    Reconcile {
        /// Catalog JSON file (defaults to config file catalog_path)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Duration table file (defaults to config file durations_path)
        #[arg(long)]
        durations: Option<PathBuf>,

        /// Show what would be updated without writing the catalog
        #[arg(long)]
        dry_run: bool,
    },

    /// Run every available inspection tool on one file
    Inspect {
        /// File to inspect
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = rinktunes::config::AppConfig::load();
    let prober = Prober::from_config(&config.probe);

    match cli.command {
        Commands::Scan { dir, grouped, jobs, write_table } => {
            let root = dir.or(config.music_dir.clone()).ok_or_else(|| {
                anyhow::anyhow!("No folder to scan. Pass one as an argument or set music_dir in config.")
            })?;
            let mode = if grouped { ScanMode::Grouped } else { ScanMode::Flat };
            let workers = if jobs > 0 { jobs } else { config.resolve_workers() };
            let groups = GroupTable::with_overrides(&config.groups);

            let mut result = rinktunes::scanner::scan(&root, mode, &groups, &prober, workers)
                .with_context(|| format!("Scan of {} failed", root.display()))?;
            rinktunes::durations::sort_entries(&mut result.entries);

            if result.entries.is_empty() {
                println!("No audio files found in {}.", root.display());
                return Ok(());
            }

            print!("{}", rinktunes::report::render_table(&result.entries));
            println!();
            println!(
                "{}",
                rinktunes::report::render_json_mapping(&result.entries)
                    .context("Failed to render duration mapping")?
            );
            println!();
            println!(
                "Scan complete: {} files, {} ok, {} unavailable, {} errors",
                result.entries.len(),
                result.ok,
                result.unavailable,
                result.errors
            );
            if !result.problems.is_empty() {
                println!();
                println!("Files recorded with duration 0:");
                for p in &result.problems {
                    println!("  {}", rinktunes::report::render_probe_line(p));
                }
            }

            if let Some(path) = write_table {
                let (table, duplicates) = DurationTable::from_entries(&result.entries);
                table
                    .save(&path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!();
                println!("Wrote {} durations to {}", table.len(), path.display());
                if !duplicates.is_empty() {
                    println!("Skipped {} duplicate ids (see warnings above)", duplicates.len());
                }
            }
        }

        Commands::Probe { files } => {
            for file in &files {
                let result = prober.probe(file);
                println!("{}", rinktunes::report::render_probe_line(&result));
            }
        }

        Commands::Reconcile { catalog, durations, dry_run } => {
            let catalog_path = catalog.or(config.catalog_path.clone()).ok_or_else(|| {
                anyhow::anyhow!("No catalog given. Pass --catalog or set catalog_path in config.")
            })?;
            let durations_path = durations.or(config.durations_path.clone()).ok_or_else(|| {
                anyhow::anyhow!("No duration table given. Pass --durations or set durations_path in config.")
            })?;

            if dry_run {
                println!("DRY RUN — the catalog will not be written");
                println!();
            }

            let table = DurationTable::load(&durations_path)
                .with_context(|| format!("Failed to load {}", durations_path.display()))?;
            let report = rinktunes::catalog::reconcile_file(
                &catalog_path,
                &config.catalog_list_key,
                &table,
                dry_run,
            )
            .with_context(|| format!("Reconcile of {} failed", catalog_path.display()))?;

            println!("Updated {} songs with durations", report.updated);
            if !report.unmatched.is_empty() {
                println!();
                println!("Songs not found in duration table:");
                for id in &report.unmatched {
                    println!("  - {}", id);
                }
            }
        }

        Commands::Inspect { file } => {
            let stdout = std::io::stdout();
            rinktunes::inspect::inspect(&mut stdout.lock(), &file, &prober)
                .context("Failed to write inspection output")?;
        }
    }

    Ok(())
}
