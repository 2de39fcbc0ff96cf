//! Sequential multi-agent coding pipeline CLI.
//!
//! `crew run` sends a requirement through the developer, QA, test-case,
//! test-runner, and reviewer agents, repeating until the reviewer approves or
//! the iteration bound is reached.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use crew::agents::roster::roster;
use crew::core::types::{Badge, IterationBound, Requirement};
use crew::exit_codes;
use crew::io::config::{CrewConfig, DEFAULT_CONFIG_FILE, load_config, write_config};
use crew::io::executor::executor_from_env;
use crew::logging;
use crew::pipeline::{PipelineEvent, PipelineOutcome, run_pipeline};

#[derive(Parser)]
#[command(
    name = "crew",
    version,
    about = "Sequential multi-agent coding pipeline"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Run the pipeline for a programming requirement.
    Run {
        /// The programming task, e.g. "write a function that reverses a string".
        #[arg(short, long)]
        requirement: String,

        /// Maximum refinement iterations (1-5).
        #[arg(short = 'n', long, default_value_t = 1)]
        max_iterations: u32,

        /// Print the result as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// List the agents and the models they use.
    Agents,
}

fn main() -> ExitCode {
    logging::init("warn");
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("{:#}", err);
            ExitCode::from(exit_codes::INVALID as u8)
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Run {
            requirement,
            max_iterations,
            json,
        } => cmd_run(&cli.config, requirement, max_iterations, json),
        Command::Agents => cmd_agents(&cli.config),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &CrewConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_run(config_path: &Path, requirement: String, max_iterations: u32, json: bool) -> Result<i32> {
    let requirement = Requirement::new(requirement)?;
    let bound = IterationBound::new(max_iterations)?;
    let cfg = load_config(config_path)?;
    let executor = executor_from_env(&cfg).context("configure agent backend")?;

    let outcome = run_pipeline(executor.as_ref(), &cfg, &requirement, bound, report_progress)?;

    if json {
        let payload = serde_json::to_string_pretty(&outcome).context("serialize result")?;
        println!("{payload}");
    } else {
        print!("{}", render_text(&outcome, &cfg.language));
    }

    Ok(if outcome.result.approved {
        exit_codes::OK
    } else {
        exit_codes::NOT_APPROVED
    })
}

fn cmd_agents(config_path: &Path) -> Result<i32> {
    let cfg = load_config(config_path)?;
    for agent in roster() {
        println!(
            "{:<10} {:<24} {}",
            agent.stage.as_str(),
            agent.role,
            cfg.model(agent.model).name
        );
    }
    Ok(exit_codes::OK)
}

fn report_progress(event: &PipelineEvent) {
    match event {
        PipelineEvent::IterationStarted {
            iteration,
            max_iterations,
        } => eprintln!("iteration {iteration}/{max_iterations}"),
        PipelineEvent::StageStarted { role, .. } => eprintln!("  {role}..."),
        _ => {}
    }
}

fn render_text(outcome: &PipelineOutcome, language: &str) -> String {
    let result = &outcome.result;
    let mut out = String::new();
    out.push_str(&format!("== Final Code ({language}) ==\n"));
    out.push_str(result.final_code.trim_end());
    out.push_str("\n\n== Test Case Results ==\n");
    for line in &result.test_summary {
        out.push_str(&format!("[{}] {line}\n", Badge::for_line(line).as_str()));
    }
    out.push_str("\n== Full Pipeline Output ==\n");
    out.push_str(result.transcript.trim_end());
    out.push('\n');
    out
}
