//! SurrealDB schema migrations and initialization
//!
//! Sets up the `runs` and `run_results` tables with their indexes.
//! Every statement is idempotent, so [`init_schema`] is safe to run on
//! each connection.

use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::StorageResult;

/// Initialize all run store tables in SurrealDB
pub async fn init_schema(db: &Surreal<Any>) -> StorageResult<()> {
    info!("Initializing run store schema");

    init_runs_table(db).await?;
    init_run_results_table(db).await?;

    info!("Run store schema initialization complete");
    Ok(())
}

/// Initialize `runs` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE runs {
///   run_id:         STRING (unique)
///   run_type:       STRING
///   judge_model:    STRING
///   worker_models:  ARRAY<STRING>
///   config_digest:  STRING (indexed)
///   input_label:    STRING?
///   input_rows:     INT
///   tags:           OBJECT
///   status:         STRING (running | completed)
///   total_rows, success_rows, error_rows, duration_ms: INT
///   created_at:     DATETIME (indexed)
///   completed_at:   DATETIME?
/// }
/// ```
async fn init_runs_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing runs table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS runs SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_run_id ON TABLE runs COLUMNS run_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_config_digest ON TABLE runs COLUMNS config_digest;
        DEFINE INDEX IF NOT EXISTS idx_created_at ON TABLE runs COLUMNS created_at;
    "#;

    db.query(sql).await?.check()?;
    Ok(())
}

/// Initialize `run_results` table
///
/// `(run_id, row_index)` is indexed but deliberately not unique: two
/// requests writing the same row both land.
async fn init_run_results_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing run_results table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS run_results SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update NONE
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_result_run_id ON TABLE run_results COLUMNS run_id;
        DEFINE INDEX IF NOT EXISTS idx_result_run_row ON TABLE run_results COLUMNS run_id, row_index;
    "#;

    db.query(sql).await?.check()?;
    Ok(())
}
