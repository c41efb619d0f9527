use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::compiler::validator::validate_program;
use crate::compiler::{compile, JsonWorkspace};
use crate::config::Config;
use crate::interpreter::ManualClock;
use crate::runner::{drive_realtime, drive_simulated, RunSummary, Session};
use crate::storage::{FileProjectStorage, ProjectStorage};

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(about = "Stagehand - compile and run block programs headlessly", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Project file for save/load (overrides config)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a workspace and run it
    Run {
        /// Workspace JSON file
        workspace: PathBuf,

        /// Seconds to run before stopping (default from config)
        #[arg(short = 'd', long)]
        duration: Option<f64>,

        /// Pace frames on the wall clock instead of simulating them
        #[arg(long)]
        realtime: bool,

        /// Frames per second
        #[arg(long)]
        fps: Option<u32>,

        /// Operations per second before the safety stop
        #[arg(long)]
        max_ops: Option<u64>,
    },

    /// Print the compiled program as JSON
    Compile {
        /// Workspace JSON file
        workspace: PathBuf,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Report validation findings; exits 1 on errors
    Check {
        /// Workspace JSON file
        workspace: PathBuf,
    },

    /// Store a workspace as the saved project
    Save {
        /// Workspace JSON file
        workspace: PathBuf,
    },

    /// Print the saved project's workspace
    Load,

    /// Print the effective configuration
    Config,
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    let (fps, max_ops) = match &cli.command {
        Commands::Run { fps, max_ops, .. } => (*fps, *max_ops),
        _ => (None, None),
    };

    let config = Config::builder()
        .config_path(cli.config.clone())
        .project_path(cli.project.clone())
        .frame_rate(fps)
        .max_ops_per_second(max_ops)
        .build()
        .context("failed to load configuration")?;

    match cli.command {
        Commands::Run {
            workspace,
            duration,
            realtime,
            ..
        } => {
            let value = read_workspace(&workspace)?;
            let limit = Duration::from_secs_f64(
                duration
                    .unwrap_or(config.runner.default_duration_secs)
                    .max(0.0),
            );
            let frame = config.runner.frame_interval();

            let (session, summary) = if realtime {
                let mut session = Session::new(&config);
                session.run_workspace(value)?;
                let summary = drive_realtime(&mut session, frame, limit).await;
                (session, summary)
            } else {
                let clock = ManualClock::new();
                let mut session = Session::with_clock(&config, clock.clone());
                session.run_workspace(value)?;
                let summary = drive_simulated(&mut session, &clock, frame, limit);
                (session, summary)
            };

            print_run(&session, &summary);
        }

        Commands::Compile { workspace, pretty } => {
            let graph = JsonWorkspace::from_value(read_workspace(&workspace)?)?;
            let program = compile(&graph);
            let json = if pretty {
                serde_json::to_string_pretty(&program)?
            } else {
                serde_json::to_string(&program)?
            };
            println!("{}", json);
        }

        Commands::Check { workspace } => {
            let graph = JsonWorkspace::from_value(read_workspace(&workspace)?)?;
            let program = compile(&graph);
            let findings = validate_program(&program);

            if findings.is_empty() {
                println!("✓ No problems found");
                return Ok(());
            }
            for finding in &findings {
                println!("{}", finding);
            }
            if findings.iter().any(|f| f.is_error()) {
                std::process::exit(1);
            }
        }

        Commands::Save { workspace } => {
            let value = read_workspace(&workspace)?;
            let mut storage = FileProjectStorage::new(&config.storage.project_path);
            storage
                .save(&value)
                .with_context(|| format!("failed to save project to {}", storage.path().display()))?;
            println!("✓ Saved project to {}", storage.path().display());
        }

        Commands::Load => {
            let storage = FileProjectStorage::new(&config.storage.project_path);
            match storage.load()? {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => {
                    eprintln!("No saved project at {}", storage.path().display());
                    std::process::exit(1);
                }
            }
        }

        Commands::Config => {
            let text = toml::to_string_pretty(&config).context("failed to render configuration")?;
            print!("{}", text);
        }
    }

    Ok(())
}

fn read_workspace(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read workspace {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("workspace {} is not valid JSON", path.display()))
}

fn print_run(session: &Session, summary: &RunSummary) {
    for line in session.log_lines() {
        println!("{}", line);
    }

    let outcome = if summary.finished { "stopped" } else { "time limit" };
    println!(
        "\n{} after {} frame(s), {:.2}s",
        outcome,
        summary.frames,
        summary.elapsed.as_secs_f64()
    );

    let sprite = session.sprite();
    println!(
        "sprite: x={:.2} y={:.2} rotation={:.2} scale={:.2}",
        sprite.x, sprite.y, sprite.rotation, sprite.scale
    );

    let vars: BTreeMap<_, _> = session.engine().variables().iter().collect();
    for (name, value) in vars {
        println!("  {} = {}", name, value);
    }
}
