// Gradeflow Infrastructure - SQLite Adapter
// Implements: RosterStore, ArtifactStore, NotificationQueue, ReportStore, RunJournal

mod artifact_store;
mod connection;
mod error;
mod migration;
mod notification_queue;
mod report_store;
mod roster_store;
mod run_journal;

pub use artifact_store::SqliteArtifactStore;
pub use connection::create_pool;
pub use migration::run_migrations;
pub use notification_queue::SqliteNotificationQueue;
pub use report_store::SqliteReportStore;
pub use roster_store::SqliteRosterStore;
pub use run_journal::SqliteRunJournal;

// Note: sqlx::Error conversion is handled by `error::map_sqlx_error`
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
