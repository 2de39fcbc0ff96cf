//! Per-iteration task definitions.
//!
//! Tasks are rebuilt for every iteration so no output from a previous
//! iteration leaks into the next one except through the prompt context.

use crate::core::types::Requirement;

use super::roster::agent_for;
use super::{Agent, Stage};

const TEST_CASES_FORMAT: &str = r#"{
  "tests": [
    {"description": "", "call": "", "expected_output": ""}
  ]
}"#;

const TEST_RESULTS_FORMAT: &str = r#"{
  "tests": [
    {"description": "", "call": "", "expected_output": "", "actual_output": "", "status": "pass/fail"}
  ]
}"#;

/// A single prompt instruction bound to an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub agent: &'static Agent,
    pub description: String,
    pub expected_output: String,
}

impl Task {
    pub fn stage(&self) -> Stage {
        self.agent.stage
    }
}

/// Build the five tasks for one iteration, in execution order.
pub fn build_tasks(requirement: &Requirement, language: &str) -> Vec<Task> {
    Stage::ALL
        .iter()
        .map(|&stage| build_task(stage, requirement, language))
        .collect()
}

fn build_task(stage: Stage, requirement: &Requirement, language: &str) -> Task {
    let (description, expected_output) = match stage {
        Stage::Develop => (
            format!(
                "Write code for the requirement below.\nReturn ONLY executable code.\n\nRequirement:\n{}",
                requirement.as_str()
            ),
            format!("Executable {language} source code only"),
        ),
        Stage::Qa => (
            "Analyze the code for bugs, logical errors, and runtime issues.\nFix if needed.\nReturn ONLY corrected executable code."
                .to_string(),
            format!("Bug-free executable {language} code"),
        ),
        Stage::UseCases => (
            format!(
                "Generate exhaustive test cases.\nReturn ONLY JSON in the format:\n{TEST_CASES_FORMAT}"
            ),
            "Valid JSON object containing test cases".to_string(),
        ),
        Stage::Testing => (
            "Execute the test cases against the code.\nReturn ONLY JSON with actual_output and status."
                .to_string(),
            TEST_RESULTS_FORMAT.to_string(),
        ),
        Stage::Review => (
            "Approve ONLY if code is correct and production-ready.\nReturn APPROVED or REJECTED with reason."
                .to_string(),
            "APPROVED or REJECTED".to_string(),
        ),
    };

    Task {
        agent: agent_for(stage),
        description,
        expected_output,
    }
}
