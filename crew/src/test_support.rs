//! Test-only scripted backends.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{Result, anyhow};

use crate::agents::Stage;
use crate::io::executor::{ExecRequest, Executor};

/// Canned answers for one iteration, one per stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedStages {
    pub develop: String,
    pub qa: String,
    pub use_cases: String,
    pub testing: String,
    pub review: String,
}

impl ScriptedStages {
    /// An iteration whose reviewer approves and whose tests all pass.
    pub fn approved() -> Self {
        Self {
            develop: "def reverse_string(s):\n    return s[::-1]".to_string(),
            qa: "def reverse_string(s):\n    return s[::-1]".to_string(),
            use_cases: r#"{"tests": [{"description": "basic", "call": "reverse_string('abc')", "expected_output": "cba"}]}"#
                .to_string(),
            testing: r#"{"tests": [{"description": "basic", "call": "reverse_string('abc')", "expected_output": "cba", "actual_output": "cba", "status": "pass"}, {"description": "empty", "call": "reverse_string('')", "expected_output": "", "actual_output": "", "status": "pass"}]}"#
                .to_string(),
            review: "APPROVED: correct and idiomatic.".to_string(),
        }
    }

    /// An iteration whose reviewer rejects and whose second test fails.
    pub fn rejected() -> Self {
        Self {
            develop: "def reverse_string(s):\n    return s".to_string(),
            testing: r#"{"tests": [{"status": "pass"}, {"status": "fail"}]}"#.to_string(),
            review: "REJECTED: does not reverse.".to_string(),
            ..Self::approved()
        }
    }

    pub fn with_testing(mut self, testing: &str) -> Self {
        self.testing = testing.to_string();
        self
    }

    pub fn with_review(mut self, review: &str) -> Self {
        self.review = review.to_string();
        self
    }

    fn answer(&self, stage: Stage) -> &str {
        match stage {
            Stage::Develop => &self.develop,
            Stage::Qa => &self.qa,
            Stage::UseCases => &self.use_cases,
            Stage::Testing => &self.testing,
            Stage::Review => &self.review,
        }
    }
}

/// Executor that replays [`ScriptedStages`], one per iteration, and records every request.
///
/// A new iteration starts whenever the develop stage is requested.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    queue: Mutex<VecDeque<ScriptedStages>>,
    current: Mutex<Option<ScriptedStages>>,
    calls: Mutex<Vec<ExecRequest>>,
    fail_at: Option<Stage>,
}

impl ScriptedExecutor {
    pub fn new(iterations: Vec<ScriptedStages>) -> Self {
        Self {
            queue: Mutex::new(iterations.into()),
            ..Self::default()
        }
    }

    /// Fail with a backend error whenever `stage` is requested.
    pub fn failing_at(mut self, stage: Stage) -> Self {
        self.fail_at = Some(stage);
        self
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<ExecRequest> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Number of develop-stage requests, i.e. iterations started.
    pub fn iterations_started(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.stage == Stage::Develop)
            .count()
    }
}

impl Executor for ScriptedExecutor {
    fn exec(&self, request: &ExecRequest) -> Result<String> {
        self.calls
            .lock()
            .map_err(|_| anyhow!("scripted calls lock poisoned"))?
            .push(request.clone());

        if self.fail_at == Some(request.stage) {
            return Err(anyhow!("scripted backend failure"));
        }

        let mut current = self
            .current
            .lock()
            .map_err(|_| anyhow!("scripted state lock poisoned"))?;
        if request.stage == Stage::Develop {
            let next = self
                .queue
                .lock()
                .map_err(|_| anyhow!("scripted queue lock poisoned"))?
                .pop_front()
                .ok_or_else(|| anyhow!("scripted executor exhausted"))?;
            *current = Some(next);
        }
        let stages = current
            .as_ref()
            .ok_or_else(|| anyhow!("scripted executor: develop stage must run first"))?;
        Ok(stages.answer(request.stage).to_string())
    }
}
