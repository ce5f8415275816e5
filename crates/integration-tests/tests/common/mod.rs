//! Shared wiring for the end-to-end scenarios: SQLite adapters, NUnit parser,
//! scripted grader and a fixed clock.

#![allow(dead_code)]

use std::sync::Arc;

use gradeflow_core::application::{
    ClassResolver, Orchestrator, PipelineConfig, ReportAggregator, RosterService,
    StudentGradeWorker,
};
use gradeflow_core::port::grader_client::mocks::ScriptedGraderClient;
use gradeflow_core::port::id_provider::mocks::SequentialIdProvider;
use gradeflow_core::port::time_provider::mocks::FixedTimeProvider;
use gradeflow_core::port::{AssignmentRecord, CredentialRecord, RunJournal};
use gradeflow_infra_grader::NUnitResultParser;
use gradeflow_infra_sqlite::{
    create_pool, run_migrations, SqliteArtifactStore, SqliteNotificationQueue, SqliteReportStore,
    SqliteRosterStore, SqliteRunJournal,
};
use sqlx::SqlitePool;

pub struct Pipeline {
    pub pool: SqlitePool,
    pub roster: Arc<SqliteRosterStore>,
    pub artifacts: Arc<SqliteArtifactStore>,
    pub queue: Arc<SqliteNotificationQueue>,
    pub reports: Arc<SqliteReportStore>,
    pub journal: Arc<SqliteRunJournal>,
    pub grader: Arc<ScriptedGraderClient>,
    pub clock: Arc<FixedTimeProvider>,
}

impl Pipeline {
    pub async fn in_memory() -> Self {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Self {
        let pool = create_pool(url).await.unwrap();
        run_migrations(&pool).await.unwrap();
        Self::with_pool(pool, Arc::new(FixedTimeProvider::at_utc(2024, 3, 7, 9, 0, 0)))
    }

    pub fn with_pool(pool: SqlitePool, clock: Arc<FixedTimeProvider>) -> Self {
        Self {
            roster: Arc::new(SqliteRosterStore::new(pool.clone(), 2)),
            artifacts: Arc::new(SqliteArtifactStore::new(pool.clone())),
            queue: Arc::new(SqliteNotificationQueue::new(pool.clone(), clock.clone())),
            reports: Arc::new(SqliteReportStore::new(pool.clone())),
            journal: Arc::new(SqliteRunJournal::new(pool.clone())),
            grader: Arc::new(ScriptedGraderClient::new()),
            clock,
            pool,
        }
    }

    pub fn orchestrator(&self, config: PipelineConfig) -> Orchestrator {
        self.orchestrator_with_journal(config, self.journal.clone())
    }

    pub fn orchestrator_with_journal(
        &self,
        config: PipelineConfig,
        journal: Arc<dyn RunJournal>,
    ) -> Orchestrator {
        let parser = Arc::new(NUnitResultParser::new());
        Orchestrator::new(
            RosterService::new(self.roster.clone()),
            ClassResolver::new(),
            StudentGradeWorker::new(
                self.grader.clone(),
                self.artifacts.clone(),
                self.queue.clone(),
                parser.clone(),
                self.clock.clone(),
            ),
            ReportAggregator::new(
                self.artifacts.clone(),
                self.reports.clone(),
                parser,
                self.clock.clone(),
            ),
            journal,
            Arc::new(SequentialIdProvider::default()),
            self.clock.clone(),
            config,
        )
    }

    pub async fn enroll(&self, project: &str, students: &[&str]) {
        self.roster
            .upsert_assignment(&AssignmentRecord {
                project: project.to_string(),
                teacher_email: "teacher@uni.edu".to_string(),
                grader_url: format!("https://grader.uni.edu/{}", project),
            })
            .await
            .unwrap();
        for email in students {
            self.roster
                .upsert_credential(&CredentialRecord {
                    project: project.to_string(),
                    email: email.to_string(),
                    credentials: format!("key-{}", email),
                })
                .await
                .unwrap();
        }
    }

    pub async fn report(&self, path: &str) -> Option<serde_json::Value> {
        use gradeflow_core::port::ReportStore;
        self.reports
            .get(path)
            .await
            .unwrap()
            .map(|stored| serde_json::from_str(&stored.body).unwrap())
    }
}

/// NUnit 3 result document. Each case is `(name, result, mark)`.
pub fn nunit(cases: &[(&str, &str, i32)]) -> String {
    let body: String = cases
        .iter()
        .map(|(name, result, mark)| {
            format!(
                r#"    <test-case name="{}" result="{}"><properties><property name="mark" value="{}" /></properties></test-case>
"#,
                name, result, mark
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<test-run id="0" testcasecount="{}">
  <test-suite type="TestFixture" name="LabTests">
{}  </test-suite>
</test-run>"#,
        cases.len(),
        body
    )
}
