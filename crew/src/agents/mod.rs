//! Agent personas and the per-iteration tasks bound to them.

use serde::Serialize;

pub mod roster;
pub mod tasks;

/// Which configured model an agent talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSlot {
    /// Stronger model for writing, fixing, and running code.
    Primary,
    /// Cheaper model for test-case generation and review.
    Lite,
}

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Develop,
    Qa,
    UseCases,
    Testing,
    Review,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Develop,
        Stage::Qa,
        Stage::UseCases,
        Stage::Testing,
        Stage::Review,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Develop => "develop",
            Stage::Qa => "qa",
            Stage::UseCases => "use_cases",
            Stage::Testing => "testing",
            Stage::Review => "review",
        }
    }
}

/// Static persona handed to the agent backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Agent {
    pub stage: Stage,
    pub role: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
    pub model: ModelSlot,
}
