//! The five fixed agents of the pipeline.

use super::{Agent, ModelSlot, Stage};

pub static DEVELOPER: Agent = Agent {
    stage: Stage::Develop,
    role: "Software Developer",
    goal: "Write correct, clean, production-ready code, no comments.",
    backstory: "Senior developer. Output ONLY executable code.",
    model: ModelSlot::Primary,
};

pub static QA_ENGINEER: Agent = Agent {
    stage: Stage::Qa,
    role: "QA Engineer",
    goal: "Find bugs and runtime issues",
    backstory: "Aggressive QA engineer",
    model: ModelSlot::Primary,
};

pub static USE_CASE_ANALYST: Agent = Agent {
    stage: Stage::UseCases,
    role: "Use Case Analysis Agent",
    goal: "Generate exhaustive test cases",
    backstory: "QA architect focused on edge cases",
    model: ModelSlot::Lite,
};

pub static TEST_RUNNER: Agent = Agent {
    stage: Stage::Testing,
    role: "Automated Testing Agent",
    goal: "Execute test cases and validate outputs",
    backstory: "Automated test runner",
    model: ModelSlot::Primary,
};

pub static REVIEWER: Agent = Agent {
    stage: Stage::Review,
    role: "Code Reviewer",
    goal: "Approve only production-ready code",
    backstory: "Principal engineer",
    model: ModelSlot::Lite,
};

/// All agents in stage order.
pub fn roster() -> [&'static Agent; 5] {
    [
        &DEVELOPER,
        &QA_ENGINEER,
        &USE_CASE_ANALYST,
        &TEST_RUNNER,
        &REVIEWER,
    ]
}

pub fn agent_for(stage: Stage) -> &'static Agent {
    match stage {
        Stage::Develop => &DEVELOPER,
        Stage::Qa => &QA_ENGINEER,
        Stage::UseCases => &USE_CASE_ANALYST,
        Stage::Testing => &TEST_RUNNER,
        Stage::Review => &REVIEWER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_follows_stage_order() {
        let stages: Vec<Stage> = roster().iter().map(|agent| agent.stage).collect();
        assert_eq!(stages, Stage::ALL.to_vec());
        for stage in Stage::ALL {
            assert_eq!(agent_for(stage).stage, stage);
        }
    }

    #[test]
    fn lite_model_serves_use_cases_and_review() {
        let lite: Vec<Stage> = roster()
            .iter()
            .filter(|agent| agent.model == ModelSlot::Lite)
            .map(|agent| agent.stage)
            .collect();
        assert_eq!(lite, vec![Stage::UseCases, Stage::Review]);
    }
}
