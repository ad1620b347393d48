//! CLI `doctor` command — run database diagnostics and print a health report.

use anyhow::Result;

use crate::config::MemelordConfig;
use crate::db;

/// Run a full database health check and print the report.
pub fn doctor(config: &MemelordConfig) -> Result<()> {
    let db_path = config.db_path();
    let conn = db::open(&db_path, config.retrieval.dimensions)?;
    let report = db::check_database_health(&conn, config.retrieval.dimensions)?;

    println!("memelord doctor");
    println!("{}", "=".repeat(40));
    println!("  Database:            {}", db_path.display());
    println!("  Schema version:      {}", report.schema_version);
    println!("  sqlite-vec:          {}", report.sqlite_vec_version);
    println!(
        "  Integrity:           {}",
        if report.integrity_ok {
            "ok".to_string()
        } else {
            report.integrity_details.clone()
        }
    );
    println!("  Memories:            {}", report.memory_count);
    println!("  Pending embeddings:  {}", report.pending_count);
    println!("  Tasks:               {}", report.task_count);
    println!("  Retrievals:          {}", report.retrieval_count);

    if report.malformed_embedding_count > 0 {
        println!(
            "  WARNING: {} embedding blobs have the wrong length for {} dimensions. \
             They are excluded from retrieval; re-insert or contradict them.",
            report.malformed_embedding_count, config.retrieval.dimensions
        );
    }

    if !report.integrity_ok {
        anyhow::bail!("database integrity check failed");
    }

    Ok(())
}
