//! crudgen CLI.
//!
//! Runs the generator outside of a bundler: one-shot generation, module
//! inspection, and a watch loop that stands in for the bundler's dev server.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use log::debug;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tokio::sync::mpsc;

use crudgen::{
    BundlerConfig, FileWatcher, Generator, GeneratorConfig, GeneratorError, HandlerRun, ModuleHost, WatchCategory,
    WorkerPool,
};

mod ui;

#[derive(Parser)]
#[command(name = "crudgen")]
#[command(about = "crudgen - CRUD client modules generated from your database schema")]
struct Cli {
    /// Generator config file
    #[arg(short, long, global = true, default_value = "crudgen.toml")]
    config: PathBuf,

    /// Public base URL the bundler serves from
    #[arg(long, global = true, default_value = "/")]
    public_base: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate every artefact once
    Generate,

    /// List generated module ids
    Modules,

    /// Print the code of one module
    Load {
        /// Module id, e.g. crud:products/store
        id: String,

        /// Strip TypeScript types, as the bundler would
        #[arg(long)]
        transform: bool,
    },

    /// Generate, then regenerate on every change
    Watch,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let bundler = BundlerConfig {
        base: cli.public_base.clone(),
        root: None,
    };

    match cli.command {
        Commands::Generate => {
            ui::print_compact_header(env!("CARGO_PKG_VERSION"));
            println!();

            let spinner = ui::spinner("Generating...");
            let start = Instant::now();
            let started = start_host(config, bundler).await;
            spinner.finish_and_clear();

            let (pool, host, runs) = started?;
            print_runs(&runs);
            println!();
            ui::timing(
                &format!("Generated {} modules", host.modules().len()),
                start.elapsed().as_millis(),
            );
            pool.shutdown().await;
        }

        Commands::Modules => {
            let (pool, host, _) = start_host(config, bundler).await?;

            let modules = host.modules().ids();
            let count = modules.len();
            for (index, id) in modules.iter().enumerate() {
                ui::tree_item("", id, None, index + 1 == count);
            }
            pool.shutdown().await;
        }

        Commands::Load { id, transform } => {
            let (pool, mut host, _) = start_host(config, bundler).await?;

            let Some(id) = host.resolve_id(&id) else {
                pool.shutdown().await;
                return Err(miette::miette!("Unknown module: {}", id));
            };
            let Some(loaded) = host.load(&id) else {
                pool.shutdown().await;
                return Err(miette::miette!("Module {} has no code", id));
            };

            let code = if transform {
                host.transform(&loaded.code, &id)?
                    .map(|t| t.code)
                    .unwrap_or(loaded.code)
            } else {
                loaded.code
            };
            print!("{}", code);
            pool.shutdown().await;
        }

        Commands::Watch => {
            run_watch_mode(config, bundler).await?;
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> miette::Result<GeneratorConfig> {
    if path.is_file() {
        return Ok(GeneratorConfig::load_from_path(path)?);
    }
    debug!("{} not found, using defaults", path.display());
    Ok(GeneratorConfig::default())
}

/// Spawns the generator, connects a host and runs the initial generation.
async fn start_host(
    config: GeneratorConfig,
    bundler: BundlerConfig,
) -> miette::Result<(WorkerPool, ModuleHost, Vec<HandlerRun>)> {
    let base = config.base.clone();
    let pool = WorkerPool::spawn(vec![Generator::from_config(config)?]);
    let host = ModuleHost::connect(pool.handle(base)).await?;
    let runs = host.config_resolved(bundler).await?;
    Ok((pool, host, runs))
}

fn print_runs(runs: &[HandlerRun]) {
    for category in WatchCategory::ALL {
        let count = runs.iter().filter(|run| run.category == category).count();
        if count > 0 {
            ui::success(&format!("{} {} handler(s)", count, category));
        }
    }
}

/// Bundler-style file watcher: watches parent directories and forwards
/// debounced change paths.
struct NotifyWatcher {
    debouncer: Debouncer<RecommendedWatcher>,
    dirs: BTreeSet<PathBuf>,
}

impl NotifyWatcher {
    fn new(tx: mpsc::UnboundedSender<PathBuf>) -> Result<Self, GeneratorError> {
        let debouncer = new_debouncer(Duration::from_millis(200), move |result: DebounceEventResult| {
            if let Ok(events) = result {
                for event in events {
                    let _ = tx.send(event.path);
                }
            }
        })
        .map_err(|e| GeneratorError::io(".", e))?;

        Ok(Self {
            debouncer,
            dirs: BTreeSet::new(),
        })
    }
}

impl FileWatcher for NotifyWatcher {
    fn add(&mut self, paths: &[PathBuf]) -> Result<(), GeneratorError> {
        for path in paths {
            let Some(dir) = path.parent() else {
                continue;
            };
            if !dir.is_dir() || self.dirs.contains(dir) {
                continue;
            }
            self.debouncer
                .watcher()
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|e| GeneratorError::io(dir, e))?;
            self.dirs.insert(dir.to_path_buf());
        }
        Ok(())
    }
}

async fn run_watch_mode(config: GeneratorConfig, bundler: BundlerConfig) -> miette::Result<()> {
    let spinner = ui::spinner("Initial generation...");
    let started = start_host(config, bundler).await;
    spinner.finish_and_clear();

    let (pool, host, runs) = started?;
    print_runs(&runs);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = NotifyWatcher::new(tx)?;
    host.configure_server(&mut watcher).await?;

    println!();
    ui::info("Ready! Waiting for changes...");

    loop {
        tokio::select! {
            Some(path) = rx.recv() => {
                let start = Instant::now();
                match host.on_change(&mut watcher, &path).await {
                    Ok(runs) if runs.is_empty() => {}
                    Ok(runs) => {
                        println!();
                        ui::box_header(&format!("{} {}", ui::symbols::ARROW, path.display()));
                        for run in &runs {
                            ui::box_line(&format!("   {} {}", ui::symbols::TARGET_FILLED, run));
                        }
                        ui::box_footer();
                        ui::timing("Regenerated", start.elapsed().as_millis());
                    }
                    Err(e) => {
                        ui::error(&format!("{}", e));
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                ui::dim("Stopping watch mode.");
                break;
            }
        }
    }

    pool.shutdown().await;
    Ok(())
}
