/// Portal status documents
use crate::error::PortalResult;
use crate::portal::models::{PortalMetadata, PortalStatus, StepList};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};

pub async fn find(conn: &mut SqliteConnection, project_id: &str) -> PortalResult<Option<PortalStatus>> {
    let row = sqlx::query(
        r#"
        SELECT project_id, is_setup, is_enabled, portal_url, portal_id, current_step_id,
               steps, metadata, created_at, updated_at
        FROM portal_status
        WHERE project_id = ?1
        "#,
    )
    .bind(project_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let steps: StepList = serde_json::from_str(&row.get::<String, _>("steps"))?;
    let metadata: PortalMetadata = serde_json::from_str(&row.get::<String, _>("metadata"))?;

    Ok(Some(PortalStatus {
        project_id: row.get("project_id"),
        is_setup: row.get("is_setup"),
        is_enabled: row.get("is_enabled"),
        portal_url: row.get("portal_url"),
        portal_id: row.get("portal_id"),
        current_step_id: row.get("current_step_id"),
        steps,
        metadata,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }))
}

/// Write the whole document, creating it when missing
pub async fn put(conn: &mut SqliteConnection, status: &PortalStatus) -> PortalResult<()> {
    sqlx::query(
        r#"
        INSERT INTO portal_status (project_id, is_setup, is_enabled, portal_url, portal_id,
                                   current_step_id, steps, metadata, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(project_id) DO UPDATE SET
            is_setup = excluded.is_setup,
            is_enabled = excluded.is_enabled,
            portal_url = excluded.portal_url,
            portal_id = excluded.portal_id,
            current_step_id = excluded.current_step_id,
            steps = excluded.steps,
            metadata = excluded.metadata,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&status.project_id)
    .bind(status.is_setup)
    .bind(status.is_enabled)
    .bind(&status.portal_url)
    .bind(&status.portal_id)
    .bind(&status.current_step_id)
    .bind(serde_json::to_string(&status.steps)?)
    .bind(serde_json::to_string(&status.metadata)?)
    .bind(status.created_at)
    .bind(status.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Returns false when the project has no status document
pub async fn set_enabled(
    conn: &mut SqliteConnection,
    project_id: &str,
    enabled: bool,
    now: DateTime<Utc>,
) -> PortalResult<bool> {
    let result = sqlx::query("UPDATE portal_status SET is_enabled = ?1, updated_at = ?2 WHERE project_id = ?3")
        .bind(enabled)
        .bind(now)
        .bind(project_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Returns false when the project has no status document
pub async fn set_current_step(
    conn: &mut SqliteConnection,
    project_id: &str,
    step_id: &str,
    now: DateTime<Utc>,
) -> PortalResult<bool> {
    let result =
        sqlx::query("UPDATE portal_status SET current_step_id = ?1, updated_at = ?2 WHERE project_id = ?3")
            .bind(step_id)
            .bind(now)
            .bind(project_id)
            .execute(&mut *conn)
            .await?;

    Ok(result.rows_affected() > 0)
}
