//! Sequential execution of one iteration's task list.
//!
//! Tasks run strictly in order. Each task sees the raw outputs of every
//! earlier task in the same kickoff as context; nothing carries over between
//! kickoffs.

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::agents::Stage;
use crate::agents::tasks::Task;
use crate::io::config::CrewConfig;
use crate::io::executor::{ExecRequest, Executor};
use crate::io::prompt::{ContextEntry, PromptBuilder};

/// Raw answer of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    pub stage: Stage,
    pub role: &'static str,
    pub raw: String,
}

/// Progress notifications emitted while a kickoff runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageProgress {
    Started(Stage),
    Completed { stage: Stage, bytes: usize },
}

/// All task outputs of one kickoff, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KickoffOutput {
    outputs: Vec<StageOutput>,
}

impl KickoffOutput {
    pub fn outputs(&self) -> &[StageOutput] {
        &self.outputs
    }

    /// Raw output of `stage`, if it ran.
    pub fn raw(&self, stage: Stage) -> Option<&str> {
        self.outputs
            .iter()
            .find(|output| output.stage == stage)
            .map(|output| output.raw.as_str())
    }

    /// Every output under a `## <role>` heading, in execution order.
    pub fn transcript(&self) -> String {
        self.outputs
            .iter()
            .map(|output| format!("## {}\n\n{}", output.role, output.raw.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Run `tasks` in order against `executor`.
///
/// The first backend error aborts the kickoff; completed outputs are discarded.
#[instrument(skip_all, fields(tasks = tasks.len()))]
pub fn kickoff<E, F>(
    executor: &E,
    cfg: &CrewConfig,
    tasks: &[Task],
    mut on_progress: F,
) -> Result<KickoffOutput>
where
    E: Executor + ?Sized,
    F: FnMut(StageProgress),
{
    let builder = PromptBuilder::new(cfg.prompt_budget_bytes);
    let mut outputs: Vec<StageOutput> = Vec::with_capacity(tasks.len());

    for task in tasks {
        let stage = task.stage();
        on_progress(StageProgress::Started(stage));

        let prior: Vec<ContextEntry> = outputs
            .iter()
            .map(|output| ContextEntry {
                role: output.role.to_string(),
                output: output.raw.clone(),
            })
            .collect();
        let prompt = builder
            .build(task, &prior)
            .with_context(|| format!("build prompt for {}", stage.as_str()))?;

        let request = ExecRequest {
            stage,
            model_slot: task.agent.model,
            model: cfg.model(task.agent.model).name.clone(),
            prompt,
            timeout: cfg.request_timeout(),
            output_limit_bytes: cfg.output_limit_bytes,
        };
        let raw = executor
            .exec(&request)
            .with_context(|| format!("{} stage ({})", stage.as_str(), task.agent.role))?;
        debug!(stage = stage.as_str(), bytes = raw.len(), "stage completed");

        on_progress(StageProgress::Completed {
            stage,
            bytes: raw.len(),
        });
        outputs.push(StageOutput {
            stage,
            role: task.agent.role,
            raw,
        });
    }

    Ok(KickoffOutput { outputs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::tasks::build_tasks;
    use crate::core::types::Requirement;
    use crate::test_support::{ScriptedExecutor, ScriptedStages};

    fn tasks() -> Vec<Task> {
        build_tasks(
            &Requirement::new("reverse a string").expect("requirement"),
            "Python",
        )
    }

    #[test]
    fn later_stages_see_earlier_outputs() {
        let executor = ScriptedExecutor::new(vec![ScriptedStages::approved()]);
        let output = kickoff(&executor, &CrewConfig::default(), &tasks(), |_| {}).expect("kickoff");

        assert_eq!(output.outputs().len(), 5);
        let calls = executor.calls();
        assert!(!calls[0].prompt.content.contains("Context from"));
        assert!(
            calls[4]
                .prompt
                .content
                .contains(&ScriptedStages::approved().develop)
        );
        assert!(
            calls[4]
                .prompt
                .content
                .contains("### Context from Automated Testing Agent")
        );
    }

    #[test]
    fn requests_use_configured_model_per_slot() {
        let executor = ScriptedExecutor::new(vec![ScriptedStages::approved()]);
        kickoff(&executor, &CrewConfig::default(), &tasks(), |_| {}).expect("kickoff");

        let models: Vec<String> = executor
            .calls()
            .into_iter()
            .map(|call| call.model)
            .collect();
        assert_eq!(
            models,
            vec![
                "gemini-2.5-flash",
                "gemini-2.5-flash",
                "gemini-2.5-flash-lite",
                "gemini-2.5-flash",
                "gemini-2.5-flash-lite",
            ]
        );
    }

    #[test]
    fn transcript_lists_roles_in_order() {
        let executor = ScriptedExecutor::new(vec![ScriptedStages::approved()]);
        let output = kickoff(&executor, &CrewConfig::default(), &tasks(), |_| {}).expect("kickoff");

        let transcript = output.transcript();
        let dev = transcript.find("## Software Developer").expect("dev");
        let review = transcript.find("## Code Reviewer").expect("review");
        assert!(dev < review);
        assert_eq!(
            output.raw(Stage::Review),
            Some(ScriptedStages::approved().review.as_str())
        );
    }

    #[test]
    fn progress_brackets_every_stage() {
        let executor = ScriptedExecutor::new(vec![ScriptedStages::approved()]);
        let mut events = Vec::new();
        kickoff(&executor, &CrewConfig::default(), &tasks(), |event| {
            events.push(event)
        })
        .expect("kickoff");

        assert_eq!(events.len(), 10);
        assert_eq!(events[0], StageProgress::Started(Stage::Develop));
        assert!(matches!(
            events[9],
            StageProgress::Completed {
                stage: Stage::Review,
                ..
            }
        ));
    }

    #[test]
    fn backend_error_aborts_remaining_stages() {
        let executor = ScriptedExecutor::new(vec![ScriptedStages::approved()])
            .failing_at(Stage::UseCases);
        let err = kickoff(&executor, &CrewConfig::default(), &tasks(), |_| {}).unwrap_err();

        assert!(format!("{err:#}").contains("use_cases stage"));
        assert_eq!(executor.calls().len(), 3);
    }
}
