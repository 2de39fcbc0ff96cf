//! End-to-end pipeline scenarios against scripted backends.

use crew::agents::Stage;
use crew::core::types::{Badge, IterationBound, Requirement};
use crew::io::config::CrewConfig;
use crew::pipeline::{PipelineEvent, PipelineStop, run_pipeline};
use crew::test_support::{ScriptedExecutor, ScriptedStages};

/// One pass for "reverse a string" yields code, a transcript, and test lines.
#[test]
fn reverse_string_single_pass() {
    let executor = ScriptedExecutor::new(vec![ScriptedStages::approved()]);
    let requirement =
        Requirement::new("write a function that reverses a string").expect("requirement");

    let outcome = run_pipeline(
        &executor,
        &CrewConfig::default(),
        &requirement,
        IterationBound::new(1).expect("bound"),
        |_| {},
    )
    .expect("pipeline");

    let result = &outcome.result;
    assert!(!result.final_code.is_empty());
    assert!(result.transcript.contains("## Code Reviewer"));
    assert_eq!(
        result.test_summary,
        vec!["Test Case 1: PASS".to_string(), "Test Case 2: PASS".to_string()]
    );
    assert!(
        result
            .test_summary
            .iter()
            .all(|line| Badge::for_line(line) == Badge::Success)
    );
    assert_eq!(outcome.stop, PipelineStop::Approved { iteration: 1 });

    let develop = &executor.calls()[0];
    assert_eq!(develop.stage, Stage::Develop);
    assert!(
        develop
            .prompt
            .content
            .contains("Requirement:\nwrite a function that reverses a string")
    );
}

/// Rejected twice, approved on the third pass: three iterations, then stop.
#[test]
fn refines_until_reviewer_approves() {
    let executor = ScriptedExecutor::new(vec![
        ScriptedStages::rejected(),
        ScriptedStages::rejected(),
        ScriptedStages::approved(),
        ScriptedStages::approved(),
    ]);
    let requirement = Requirement::new("reverse a string").expect("requirement");
    let mut finished_iterations = Vec::new();

    let outcome = run_pipeline(
        &executor,
        &CrewConfig::default(),
        &requirement,
        IterationBound::new(5).expect("bound"),
        |event| {
            if let PipelineEvent::IterationFinished {
                iteration,
                approved,
                ..
            } = event
            {
                finished_iterations.push((*iteration, *approved));
            }
        },
    )
    .expect("pipeline");

    assert_eq!(
        finished_iterations,
        vec![(1, false), (2, false), (3, true)]
    );
    assert_eq!(executor.calls().len(), 15);
    assert_eq!(outcome.result.iterations_run, 3);
    assert_eq!(outcome.result.test_summary.len(), 6);
    assert!(outcome.result.transcript.contains("APPROVED: correct"));
}

/// Each iteration starts from a fresh task list; no context leaks between iterations.
#[test]
fn iterations_do_not_share_context() {
    let executor = ScriptedExecutor::new(vec![
        ScriptedStages::rejected().with_review("REJECTED: marker-from-iteration-one"),
        ScriptedStages::approved(),
    ]);
    let requirement = Requirement::new("reverse a string").expect("requirement");

    run_pipeline(
        &executor,
        &CrewConfig::default(),
        &requirement,
        IterationBound::new(2).expect("bound"),
        |_| {},
    )
    .expect("pipeline");

    let calls = executor.calls();
    assert_eq!(calls.len(), 10);
    assert!(
        calls[5..]
            .iter()
            .all(|call| !call.prompt.content.contains("marker-from-iteration-one"))
    );
}
