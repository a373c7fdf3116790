//! End-to-end generation: planning, staggered jobs, retry, isolation.

use super::test_utils::{orchestrator, ScriptedAdapter, StyleScript};
use flashui::generation::{PlanSource, EDITABLE_TRAILER};
use flashui::{ApiError, ArtifactStatus, SessionStore};
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn test_one_success_one_permanent_failure() {
    let adapter = Arc::new(
        ScriptedAdapter::new("Here you go: [\"Minimal\", \"Bold\"]")
            .style("Minimal", StyleScript::Stream(vec!["<h1>", "A</h1>"]))
            .style("Bold", StyleScript::Denied),
    );
    let store = Arc::new(SessionStore::new());
    let orchestrator = orchestrator(store.clone(), adapter.clone());

    let report = orchestrator.run("card", 2).await.unwrap();

    assert_eq!(report.plan_source, PlanSource::Model);
    assert_eq!(report.completed(), 1);
    assert_eq!(report.failed(), 1);

    let session = store.session(&report.session_id).unwrap();
    assert_eq!(session.prompt(), "card");
    let artifacts = session.artifacts();
    assert_eq!(artifacts[0].style_name(), "Minimal");
    assert_eq!(artifacts[0].status(), ArtifactStatus::Complete);
    assert_eq!(artifacts[0].html(), format!("<h1>A</h1>{}", EDITABLE_TRAILER));
    assert_eq!(artifacts[1].style_name(), "Bold");
    assert_eq!(artifacts[1].status(), ArtifactStatus::Error);
    assert_eq!(artifacts[1].html(), "");
    assert_eq!(adapter.open_calls("Bold"), 1);
    assert!(session.is_finished());
    assert!(!orchestrator.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_job_recovers_within_retry_budget() {
    let adapter = Arc::new(
        ScriptedAdapter::new("[\"Glass\"]").style(
            "Glass",
            StyleScript::RateLimited {
                times: 2,
                fragments: vec!["<div>ok</div>"],
            },
        ),
    );
    let store = Arc::new(SessionStore::new());
    let report = orchestrator(store.clone(), adapter.clone())
        .run("login form", 1)
        .await
        .unwrap();

    assert_eq!(report.completed(), 1);
    assert_eq!(adapter.open_calls("Glass"), 3);
    let session = store.session(&report.session_id).unwrap();
    assert!(session.artifacts()[0].html().starts_with("<div>ok</div>"));
}

#[tokio::test(start_paused = true)]
async fn test_mid_stream_failure_keeps_partial_html_and_spares_siblings() {
    let adapter = Arc::new(
        ScriptedAdapter::new("[\"Retro\", \"Neon\", \"Paper\"]")
            .style("Retro", StyleScript::BreakAfter(vec!["<section>", "half"]))
            .style("Neon", StyleScript::Stream(vec!["<b>neon</b>"]))
            .style("Paper", StyleScript::Stream(vec!["<i>paper</i>"])),
    );
    let store = Arc::new(SessionStore::new());
    let report = orchestrator(store.clone(), adapter)
        .run("dashboard", 3)
        .await
        .unwrap();

    let session = store.session(&report.session_id).unwrap();
    let artifacts = session.artifacts();
    assert_eq!(artifacts[0].status(), ArtifactStatus::Error);
    assert_eq!(artifacts[0].html(), "<section>half");
    assert_eq!(artifacts[1].status(), ArtifactStatus::Complete);
    assert_eq!(artifacts[2].status(), ArtifactStatus::Complete);
    let styles: Vec<&str> = report.jobs.iter().map(|job| job.style.as_str()).collect();
    assert_eq!(styles, vec!["Retro", "Neon", "Paper"]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_planning_falls_back_to_builtin_styles() {
    let adapter = Arc::new(ScriptedAdapter::failing_plan("service unavailable"));
    let store = Arc::new(SessionStore::new());
    let report = orchestrator(store.clone(), adapter)
        .run("pricing table", 3)
        .await
        .unwrap();

    assert_eq!(report.plan_source, PlanSource::Fallback);
    let session = store.session(&report.session_id).unwrap();
    let labels: Vec<&str> = session.artifacts().iter().map(|a| a.style_name()).collect();
    assert_eq!(
        labels,
        vec!["Hiện đại tối giản", "Năng động táo bạo", "Thanh lịch cổ điển"]
    );
    assert_eq!(report.completed(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_second_submission_rejected_while_first_runs() {
    let adapter = Arc::new(ScriptedAdapter::new("[\"A\", \"B\"]"));
    let store = Arc::new(SessionStore::new());
    let orchestrator = orchestrator(store.clone(), adapter);

    let first = orchestrator.submit("first", 2).unwrap();
    assert!(orchestrator.is_busy());
    assert!(matches!(
        orchestrator.submit("second", 1),
        Err(ApiError::SubmissionInFlight)
    ));
    assert_eq!(store.len(), 1);

    let report = first.wait().await.unwrap();
    assert_eq!(report.completed(), 2);
    assert!(!orchestrator.is_busy());

    let second = orchestrator.submit("second", 1).unwrap();
    second.wait().await.unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.current_session().unwrap().prompt(), "second");
}

#[tokio::test]
async fn test_invalid_requests_create_no_session() {
    let adapter = Arc::new(ScriptedAdapter::new("[]"));
    let store = Arc::new(SessionStore::new());
    let orchestrator = orchestrator(store.clone(), adapter);

    assert!(matches!(
        orchestrator.run("   ", 2).await,
        Err(ApiError::EmptyPrompt)
    ));
    assert!(matches!(
        orchestrator.run("card", 4).await,
        Err(ApiError::InvalidVariationCount { requested: 4, max: 3 })
    ));
    assert!(store.is_empty());
}
