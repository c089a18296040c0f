mod commands;
mod logging;
mod progress;
mod size;
mod status;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, Tuning};
use dotenv::dotenv;
use idem_core::config::DEFAULT_CONFIG_FILE;
use idem_core::{init_roots, AppConfig, Database, Linker, OrganizeReport, ScanOptions, Scheduler};
use progress::CliReporter;
use tracing::{error, info};

fn main() -> ExitCode {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let result = match args.command {
        Some(command) => run(command),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init {
            sources,
            root,
            db_path,
            prefix_length,
            tuning,
            batch_size,
            force,
        } => {
            for source in &sources {
                if !source.is_dir() {
                    bail!("{} is not a directory", source.display());
                }
            }
            let mut config = AppConfig::new(sources);
            if let Some(root) = root {
                config.dest_root = root;
            }
            if let Some(db_path) = db_path {
                config.db_path = db_path;
            }
            if let Some(prefix_length) = prefix_length {
                config.prefix_length = prefix_length;
            }
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
            }
            apply_tuning(&mut config, &tuning);

            config.save(Path::new(DEFAULT_CONFIG_FILE), force)?;
            println!(
                "Wrote {} with {} root(s)",
                DEFAULT_CONFIG_FILE.green(),
                config.root_paths.len()
            );
            Ok(())
        }
        Commands::Index { tuning } => {
            let mut config = load_config()?;
            apply_tuning(&mut config, &tuning);
            config.validate()?;
            run_index(&config)
        }
        Commands::Status { json } => {
            let config = load_config()?;
            let db = open_database(&config)?;
            let snapshot = db.status_snapshot()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print!("{}", status::render_status(&snapshot));
            }
            Ok(())
        }
        Commands::Duplicates { limit } => {
            let config = load_config()?;
            let db = open_database(&config)?;
            let groups = db.duplicate_groups(0, limit)?;
            if groups.is_empty() {
                println!("No duplicates found");
            }
            for group in &groups {
                let paths: Vec<String> = db
                    .files_for_hash(group.hash_id)?
                    .into_iter()
                    .map(|f| f.path)
                    .collect();
                print!("{}", status::render_duplicate_group(group, &paths));
            }
            Ok(())
        }
        Commands::Organize { populate } => {
            let config = load_config()?;
            run_organize(&config, populate)
        }
        Commands::Show => {
            let config = load_config()?;
            for root in &config.root_paths {
                println!("{}", root.display());
            }
            Ok(())
        }
        Commands::Version => {
            println!("idem {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    AppConfig::load().with_context(|| {
        format!(
            "cannot load {}; run `idem init <SOURCES>...` first",
            DEFAULT_CONFIG_FILE
        )
    })
}

fn open_database(config: &AppConfig) -> anyhow::Result<Database> {
    Database::open(&config.db_path)
        .with_context(|| format!("cannot open database {}", config.db_path.display()))
}

fn apply_tuning(config: &mut AppConfig, tuning: &Tuning) {
    if let Some(max_workers) = tuning.max_workers {
        config.max_workers = max_workers;
    }
    if let Some(max_inflight) = tuning.max_inflight {
        config.max_inflight = max_inflight;
    }
    if let Some(chunk_size) = tuning.chunk_size {
        config.chunk_size = chunk_size;
    }
}

fn run_index(config: &AppConfig) -> anyhow::Result<()> {
    let db = open_database(config)?;
    let roots = init_roots(&db, &config.root_paths)?;
    info!("Indexing {} root(s)", roots.len());

    let reporter = CliReporter::new();
    let summary = Scheduler::new(&db, ScanOptions::from_config(config))
        .with_reporter(&reporter)
        .run_scan()?;

    info!(
        "Index: {}, {} directories, {} files hashed, {} skipped",
        format!("{:.2}s", summary.duration.as_secs_f64()).green(),
        format!("{}", summary.directories).cyan(),
        format!("{}", summary.files_hashed).cyan(),
        format!("{}", summary.files_failed).red(),
    );
    let snapshot = db.status_snapshot()?;
    info!(
        "{} duplicate groups, {} files with duplicates",
        format!("{}", snapshot.duplicate_groups).red(),
        format!("{}", snapshot.duplicate_files).red(),
    );
    Ok(())
}

fn run_organize(config: &AppConfig, populate: bool) -> anyhow::Result<()> {
    let reporter = CliReporter::new();
    let linker = Linker::new(
        &config.dest_root,
        config.prefix_length,
        config.max_workers,
        config.max_inflight,
        config.chunk_size,
    )?
    .with_ignore_patterns(&config.ignore_patterns)
    .with_reporter(&reporter);

    if populate {
        let buckets = linker.populate()?;
        info!("Created {} buckets under {}", buckets, config.dest_root.display());
    }

    let mut total = OrganizeReport::default();
    for root in &config.root_paths {
        let report = linker
            .organize(root)
            .with_context(|| format!("organizing {}", root.display()))?;
        total.linked += report.linked;
        total.already_present += report.already_present;
        total.symlinks_skipped += report.symlinks_skipped;
        total.empty_skipped += report.empty_skipped;
        total.failed += report.failed;
    }

    info!(
        "{} linked, {} already present, {} symlinks and {} empty files skipped, {} failed",
        format!("{}", total.linked).green(),
        format!("{}", total.already_present).cyan(),
        total.symlinks_skipped,
        total.empty_skipped,
        format!("{}", total.failed).red(),
    );
    Ok(())
}
