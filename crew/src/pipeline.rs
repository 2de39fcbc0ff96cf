//! Iterative develop → QA → test → review pipeline.
//!
//! Each iteration runs one sequential kickoff of the five tasks. The loop has
//! exactly two exits: the approval keyword appears in an iteration's
//! reviewer output, or the iteration bound is used up.

use anyhow::Result;
use serde::Serialize;
use tracing::{info, instrument};

use crate::agents::Stage;
use crate::agents::roster::agent_for;
use crate::agents::tasks::build_tasks;
use crate::core::approval::is_approved;
use crate::core::summary::summarize_test_output;
use crate::core::types::{IterationBound, PipelineResult, Requirement};
use crate::io::config::CrewConfig;
use crate::io::executor::Executor;
use crate::kickoff::{StageProgress, kickoff};

/// Why `run_pipeline` stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PipelineStop {
    /// The reviewer transcript of `iteration` contained the approval keyword.
    Approved { iteration: u32 },
    /// Every allowed iteration ran without approval.
    BoundExhausted { iterations: u32 },
}

/// Progress notifications for observers such as the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    IterationStarted {
        iteration: u32,
        max_iterations: u32,
    },
    StageStarted {
        iteration: u32,
        stage: Stage,
        role: &'static str,
    },
    StageCompleted {
        iteration: u32,
        stage: Stage,
        role: &'static str,
        bytes: usize,
    },
    IterationFinished {
        iteration: u32,
        approved: bool,
        test_lines: usize,
    },
    Finished {
        stop: PipelineStop,
    },
}

/// Result plus stop reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOutcome {
    pub result: PipelineResult,
    pub stop: PipelineStop,
}

/// Run the pipeline for `requirement`, at most `bound` times.
///
/// Test-report parsing failures are recorded as summary lines. Backend errors
/// are not caught and abort the run.
#[instrument(skip_all, fields(max_iterations = bound.get()))]
pub fn run_pipeline<E, F>(
    executor: &E,
    cfg: &CrewConfig,
    requirement: &Requirement,
    bound: IterationBound,
    mut on_event: F,
) -> Result<PipelineOutcome>
where
    E: Executor + ?Sized,
    F: FnMut(&PipelineEvent),
{
    let max_iterations = bound.get();
    let mut final_code = String::new();
    let mut transcript = String::new();
    let mut test_summary: Vec<String> = Vec::new();
    let mut stop = PipelineStop::BoundExhausted {
        iterations: max_iterations,
    };
    let mut iterations_run = 0u32;

    for iteration in 1..=max_iterations {
        on_event(&PipelineEvent::IterationStarted {
            iteration,
            max_iterations,
        });
        info!(iteration, "starting iteration");

        let tasks = build_tasks(requirement, &cfg.language);
        let output = kickoff(executor, cfg, &tasks, |progress| {
            let event = match progress {
                StageProgress::Started(stage) => PipelineEvent::StageStarted {
                    iteration,
                    stage,
                    role: agent_for(stage).role,
                },
                StageProgress::Completed { stage, bytes } => PipelineEvent::StageCompleted {
                    iteration,
                    stage,
                    role: agent_for(stage).role,
                    bytes,
                },
            };
            on_event(&event);
        })?;
        iterations_run = iteration;

        transcript = output.transcript();
        final_code = output.raw(Stage::Develop).unwrap_or_default().to_string();

        let lines = summarize_test_output(output.raw(Stage::Testing).unwrap_or_default());
        let test_lines = lines.len();
        test_summary.extend(lines);

        let approved = is_approved(output.raw(Stage::Review).unwrap_or_default());
        info!(iteration, approved, test_lines, "iteration finished");
        on_event(&PipelineEvent::IterationFinished {
            iteration,
            approved,
            test_lines,
        });

        if approved {
            stop = PipelineStop::Approved { iteration };
            break;
        }
    }

    on_event(&PipelineEvent::Finished { stop });

    Ok(PipelineOutcome {
        result: PipelineResult {
            final_code,
            transcript,
            test_summary,
            iterations_run,
            approved: matches!(stop, PipelineStop::Approved { .. }),
        },
        stop,
    })
}
