//! Persistence of classification results in the `scan_history` table.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::{ScanKind, ScanRecord},
    reputation::Verdict,
};

pub async fn insert(db: &PgPool, record: &ScanRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO scan_history (id, user_id, kind, target, label, score, threat_level, verdict, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(record.id)
    .bind(record.user_id)
    .bind(&record.kind)
    .bind(&record.target)
    .bind(&record.label)
    .bind(record.score)
    .bind(&record.threat_level)
    .bind(&record.verdict)
    .bind(record.created_at)
    .execute(db)
    .await?;
    Ok(())
}

/// Scan records of `user_id`, newest first.
pub async fn for_user(db: &PgPool, user_id: Uuid) -> Result<Vec<ScanRecord>, sqlx::Error> {
    sqlx::query_as::<_, ScanRecord>(
        "SELECT id, user_id, kind, target, label, score, threat_level, verdict, created_at
         FROM scan_history WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Stores the verdict on a detached task; failures are logged, never surfaced.
pub fn record_in_background(
    db: Arc<PgPool>,
    user_id: Uuid,
    kind: ScanKind,
    target: &str,
    verdict: Verdict,
) {
    let record = ScanRecord::new(user_id, kind, target, verdict);
    tokio::spawn(async move {
        if let Err(e) = insert(&db, &record).await {
            tracing::error!(
                user.id = %record.user_id,
                scan.id = %record.id,
                error = ?e,
                "Failed to persist scan record"
            );
        }
    });
}
