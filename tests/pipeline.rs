//! End-to-end pipeline tests
//!
//! Exercises the whole engine against the stub provider and scripted
//! fake transports: translation, dry-run previews, circuit breaking
//! with fallback, rollback, iterative mode and parallel execution.

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use zenus::config::Config;
use zenus::engine::ExecOptions;
use zenus::goal::GoalTermination;
use zenus::intent::Step;
use zenus::llm::adapters::openai::OpenAiCompatAdapter;
use zenus::llm::adapters::stub::StubAdapter;
use zenus::llm::adapters::{Adapter, FakeTransport, Transport};
use zenus::llm::{Brain, ModelRouter};
use zenus::resilience::{CircuitState, RetryPolicy};
use zenus::Runtime;

fn stub_config(data_dir: &TempDir) -> Config {
    Config {
        provider: "stub".to_string(),
        cheap_provider: "stub".to_string(),
        powerful_provider: "stub".to_string(),
        fallback_chain: vec!["stub".to_string()],
        data_dir: data_dir.path().to_path_buf(),
        max_parallel: 4,
        max_iterations: 3,
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 1,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
        base: 2.0,
        jitter: false,
    }
}

#[tokio::test]
async fn scenario_list_files_end_to_end() {
    let data_dir = TempDir::new().unwrap();
    let documents = TempDir::new().unwrap();
    std::fs::write(documents.path().join("notes.txt"), "n").unwrap();
    std::fs::write(documents.path().join("draft.md"), "d").unwrap();

    let runtime = Runtime::initialize(stub_config(&data_dir)).unwrap();
    let input = format!("list files in {}", documents.path().display());

    let outcome = runtime.run_text(&input, ExecOptions::default()).await.unwrap();

    assert_eq!(outcome.intent.goal, "List files");
    assert_eq!(outcome.intent.steps.len(), 1);
    assert_eq!(outcome.intent.steps[0].tool, "FileOps");
    assert_eq!(outcome.intent.steps[0].action, "scan");
    assert_eq!(outcome.intent.steps[0].risk, 0);
    assert!(outcome.results[0].success);
    assert!(outcome.results[0].output.contains("notes.txt"));
    assert!(outcome.results[0].output.contains("draft.md"));
}

#[tokio::test]
async fn scenario_dry_run_delete_previews_without_executing() {
    let data_dir = TempDir::new().unwrap();
    let runtime = Runtime::initialize(stub_config(&data_dir)).unwrap();

    // A destructive plan whose confirmation flag the provider "forgot";
    // translation must force it on
    let intent = zenus::parse_intent(
        r#"{
            "goal": "Delete temp files",
            "requires_confirmation": false,
            "steps": [{"tool": "FileOps", "action": "remove", "args": {"path": "*.tmp"}, "risk": 3}]
        }"#,
    )
    .unwrap();
    assert!(intent.requires_confirmation);

    let results = runtime
        .execute(
            &intent,
            "delete *.tmp",
            ExecOptions {
                dry_run: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Preview only: the destructive step reports its policy result and
    // the action log stays empty
    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
    assert!(results[0].error.as_deref().unwrap().contains("blocked"));
    assert!(runtime.recent_transactions(10).is_empty());
}

#[tokio::test]
async fn scenario_circuit_opens_after_five_failures_then_falls_back() {
    // "openai" always fails at the transport; "stub" serves the plan
    let failing = OpenAiCompatAdapter::with_transport(
        "openai".to_string(),
        "https://api.openai.com/v1".to_string(),
        "gpt-4o-mini".to_string(),
        "sk-test".to_string(),
        Transport::Fake(FakeTransport::with_error("connection refused")),
    );
    let stub = StubAdapter::new();

    let brain = Brain::new(
        vec![Adapter::OpenAiCompat(failing), Adapter::Stub(stub)],
        vec!["openai".to_string(), "stub".to_string()],
        ModelRouter::new("openai", "openai"),
    )
    .with_retry_policy(fast_retry());

    // Five consecutive failures trip the circuit; the stub rescues each
    // call through the fallback chain
    for _ in 0..5 {
        let translated = brain.translate("list files in /tmp", false).unwrap();
        assert_eq!(translated.provider, "stub");
    }
    assert_eq!(brain.circuit("openai").unwrap().state(), CircuitState::Open);
    let failures_so_far = brain.circuit("openai").unwrap().snapshot().total_failures;
    assert_eq!(failures_so_far, 5);

    // The sixth request skips the open circuit without another attempt
    let translated = brain.translate("list files in /tmp", false).unwrap();
    assert_eq!(translated.provider, "stub");
    assert_eq!(
        brain.circuit("openai").unwrap().snapshot().total_failures,
        failures_so_far
    );
}

#[tokio::test]
async fn scenario_rollback_two_moves_restores_files() {
    let data_dir = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let runtime = Runtime::initialize(stub_config(&data_dir)).unwrap();

    let a = work.path().join("a.txt");
    let b = work.path().join("b.txt");
    let c = work.path().join("c.txt");
    let d = work.path().join("d.txt");
    std::fs::write(&a, "first").unwrap();
    std::fs::write(&c, "second").unwrap();

    for (src, dst, input) in [(&a, &b, "move a to b"), (&c, &d, "move c to d")] {
        let intent = zenus::Intent {
            goal: input.to_string(),
            requires_confirmation: false,
            steps: vec![Step::new("FileOps", "move", 1)
                .with_arg("source", src.to_str().unwrap())
                .with_arg("destination", dst.to_str().unwrap())],
        };
        runtime
            .execute(&intent, input, ExecOptions::default())
            .await
            .unwrap();
    }
    assert!(b.exists() && d.exists());

    let report = runtime.rollback(2, false).await.unwrap();
    assert_eq!(report.rolled_back, 2);
    assert_eq!(report.failed, 0);

    // d→c executed before b→a, both restored
    assert!(report.planned[0].contains("d.txt"));
    assert!(a.exists() && c.exists());
    assert!(!b.exists() && !d.exists());

    // A second rollback finds nothing eligible
    let report = runtime.rollback(2, false).await.unwrap();
    assert_eq!(report.rolled_back, 0);
    assert!(report.planned.is_empty());
}

#[tokio::test]
async fn scenario_iterative_goal_achieves_with_stub() {
    let data_dir = TempDir::new().unwrap();
    let runtime = Runtime::initialize(stub_config(&data_dir)).unwrap();

    // The stub's default reflection reports achievement with high
    // confidence, so the loop terminates on its first iteration
    let outcome = runtime
        .run_iterative("read project and suggest refactors")
        .await
        .unwrap();

    assert_eq!(outcome.termination, GoalTermination::Achieved);
    assert!(outcome.achieved);
    assert!(outcome.confidence >= 0.7);
    assert_eq!(outcome.iterations, 1);
}

#[tokio::test]
async fn scenario_parallel_independent_scans() {
    let data_dir = TempDir::new().unwrap();
    let left = TempDir::new().unwrap();
    let right = TempDir::new().unwrap();
    std::fs::write(left.path().join("left.txt"), "l").unwrap();
    std::fs::write(right.path().join("right.txt"), "r").unwrap();

    let runtime = Runtime::initialize(stub_config(&data_dir)).unwrap();
    let intent = zenus::Intent {
        goal: "Scan both directories".to_string(),
        requires_confirmation: false,
        steps: vec![
            Step::new("FileOps", "scan", 0).with_arg("path", left.path().to_str().unwrap()),
            Step::new("FileOps", "scan", 0).with_arg("path", right.path().to_str().unwrap()),
        ],
    };

    let results = runtime
        .execute(
            &intent,
            "scan both",
            ExecOptions {
                parallel: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Both succeed and results keep original step order
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));
    assert!(results[0].output.contains("left.txt"));
    assert!(results[1].output.contains("right.txt"));
}

#[tokio::test]
async fn translate_serialize_roundtrip_is_identity() {
    let data_dir = TempDir::new().unwrap();
    let runtime = Runtime::initialize(stub_config(&data_dir)).unwrap();

    let translated = runtime
        .translate("list files in /var/log", false, |_| {})
        .await
        .unwrap();

    let wire = serde_json::to_string(&translated.intent).unwrap();
    let back: zenus::Intent = serde_json::from_str(&wire).unwrap();
    assert_eq!(translated.intent, back);
}

#[tokio::test]
async fn mutating_run_updates_world_model_counters() {
    let data_dir = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let runtime = Runtime::initialize(stub_config(&data_dir)).unwrap();

    let target = work.path().join("made-dir");
    let intent = zenus::Intent {
        goal: "Create a directory".to_string(),
        requires_confirmation: false,
        steps: vec![Step::new("FileOps", "mkdir", 1).with_arg("path", target.to_str().unwrap())],
    };

    runtime
        .execute(&intent, "make a dir", ExecOptions::default())
        .await
        .unwrap();
    assert!(target.is_dir());

    // The world model learned the touched path
    let world_model: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(data_dir.path().join("world_model.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(world_model["paths"][target.to_str().unwrap()], 1);
}
