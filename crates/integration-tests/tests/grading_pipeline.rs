//! End-to-end grading runs over the SQLite adapters and the NUnit parser.

mod common;

use common::{nunit, Pipeline};
use gradeflow_core::application::{IsolationMode, PipelineConfig};
use gradeflow_core::domain::{RunState, RunTrigger};
use gradeflow_core::port::grader_client::mocks::MockReply;
use gradeflow_core::port::{ArtifactStore, GraderError};

/// Scenario 1: one student graded, one timed out
#[tokio::test]
async fn test_timeout_for_one_student_leaves_the_other_graded() {
    let p = Pipeline::in_memory().await;
    p.enroll("lab1", &["alice@uni.edu", "bob@uni.edu"]).await;
    p.grader.document(
        "alice@uni.edu",
        nunit(&[("test2", "Passed", 4), ("test1", "Passed", 3)]),
    );
    p.grader
        .reply("bob@uni.edu", MockReply::Fail(GraderError::Timeout(180)));

    let run = p
        .orchestrator(PipelineConfig::default())
        .start(RunTrigger::Scheduled)
        .await
        .unwrap();

    assert_eq!(run.state, RunState::Completed);
    let summary = run.summary.unwrap();
    assert_eq!(summary.units_dispatched, 2);
    assert_eq!(summary.units_graded, 1);
    assert_eq!(summary.units_failed, 1);

    let artifacts = p.artifacts.list("lab1").await.unwrap();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].email, "alice@uni.edu");

    assert_eq!(p.queue.count_for("alice@uni.edu").await.unwrap(), 1);
    assert_eq!(p.queue.count_for("bob@uni.edu").await.unwrap(), 0);
    let mail = &p.queue.peek(10).await.unwrap()[0];
    assert_eq!(mail.recipient, "alice@uni.edu");
    assert!(mail.subject.starts_with("Your lab1 Mark at 2024-03-07 09:00"));
    assert!(mail.body.contains("You have just earned 7 mark(s)."));
    let first = mail.body.find("test1: 3").unwrap();
    let second = mail.body.find("test2: 4").unwrap();
    assert!(first < second);

    let accumulated = p.report("lab1/accumulatedMarks.json").await.unwrap();
    assert_eq!(accumulated["alice@uni.edu"]["test1"], 3);
    assert_eq!(accumulated["alice@uni.edu"]["test2"], 4);
    assert!(accumulated.get("bob@uni.edu").is_none());
}

#[tokio::test]
async fn test_every_assignment_gets_its_reports() {
    let p = Pipeline::in_memory().await;
    // Page size is 2, so both rosters span several pages
    p.enroll("lab1", &["a@uni.edu", "b@uni.edu", "c@uni.edu"]).await;
    p.enroll("lab2", &["a@uni.edu", "d@uni.edu", "e@uni.edu"]).await;
    for email in ["a@uni.edu", "b@uni.edu", "c@uni.edu", "d@uni.edu", "e@uni.edu"] {
        p.grader.document(email, nunit(&[("test1", "Passed", 2)]));
    }

    let config = PipelineConfig {
        grading_concurrency: 3,
        ..PipelineConfig::default()
    };
    let run = p
        .orchestrator(config)
        .start(RunTrigger::Manual)
        .await
        .unwrap();

    let summary = run.summary.unwrap();
    assert_eq!(summary.assignments, 2);
    assert_eq!(summary.units_graded, 6);
    assert_eq!(summary.reports_saved, 2);
    assert_eq!(p.grader.calls_for("a@uni.edu"), 2);

    for assignment in ["lab1", "lab2"] {
        for name in ["accumulatedMarks.json", "todayMarks.json"] {
            let report = p.report(&format!("{}/{}", assignment, name)).await.unwrap();
            assert_eq!(report.as_object().unwrap().len(), 3, "{}/{}", assignment, name);
            assert!(p
                .report(&format!("{}/2024/03/07/09/00/{}", assignment, name))
                .await
                .is_some());
        }
    }
}

#[tokio::test]
async fn test_failed_test_cases_earn_nothing() {
    let p = Pipeline::in_memory().await;
    p.enroll("lab1", &["alice@uni.edu"]).await;
    p.grader.document(
        "alice@uni.edu",
        nunit(&[("test1", "Passed", 3), ("test2", "Failed", 4)]),
    );

    p.orchestrator(PipelineConfig::default())
        .start(RunTrigger::Scheduled)
        .await
        .unwrap();

    let accumulated = p.report("lab1/accumulatedMarks.json").await.unwrap();
    assert_eq!(accumulated["alice@uni.edu"]["test1"], 3);
    assert_eq!(accumulated["alice@uni.edu"]["test2"], 0);
}

#[tokio::test]
async fn test_second_run_keeps_best_marks() {
    let p = Pipeline::in_memory().await;
    p.enroll("lab1", &["alice@uni.edu"]).await;
    let orchestrator = p.orchestrator(PipelineConfig::default());

    p.grader.document(
        "alice@uni.edu",
        nunit(&[("test1", "Failed", 3), ("test2", "Passed", 4)]),
    );
    orchestrator.start(RunTrigger::Scheduled).await.unwrap();

    p.clock.advance_millis(12 * 60 * 60 * 1000);
    p.grader.document(
        "alice@uni.edu",
        nunit(&[("test1", "Passed", 3), ("test2", "Failed", 4)]),
    );
    orchestrator.start(RunTrigger::Scheduled).await.unwrap();

    assert_eq!(p.artifacts.list("lab1").await.unwrap().len(), 2);
    let accumulated = p.report("lab1/accumulatedMarks.json").await.unwrap();
    assert_eq!(accumulated["alice@uni.edu"]["test1"], 3);
    assert_eq!(accumulated["alice@uni.edu"]["test2"], 4);

    // 09:00 + 12h = 21:00 the same day
    let today = p.report("lab1/todayMarks.json").await.unwrap();
    assert_eq!(today["alice@uni.edu"]["test2"], 4);
}

#[tokio::test]
async fn test_unresolvable_class_by_isolation_mode() {
    for (isolation, expected, graded) in [
        (IsolationMode::PerBranch, RunState::Completed, 1),
        (IsolationMode::Legacy, RunState::Failed, 0),
    ] {
        let p = Pipeline::in_memory().await;
        p.enroll("lab1", &["alice@uni.edu"]).await;
        p.enroll("lab2", &["", "bob@uni.edu"]).await;
        p.grader
            .document("alice@uni.edu", nunit(&[("test1", "Passed", 1)]));
        p.grader
            .document("bob@uni.edu", nunit(&[("test1", "Passed", 1)]));

        let config = PipelineConfig {
            isolation,
            ..PipelineConfig::default()
        };
        let run = p
            .orchestrator(config)
            .start(RunTrigger::Scheduled)
            .await
            .unwrap();

        assert_eq!(run.state, expected, "{}", isolation);
        let summary = run.summary.unwrap();
        assert_eq!(summary.classes_failed, 1);
        assert_eq!(summary.units_graded, graded);
        assert_eq!(p.grader.calls_for("alice@uni.edu"), graded);
        assert_eq!(p.grader.calls_for("bob@uni.edu"), 0);
    }
}
