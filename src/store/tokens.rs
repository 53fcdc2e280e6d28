/// Access token records, one row per project
use crate::error::PortalResult;
use crate::portal::models::AccessToken;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

fn from_row(row: &SqliteRow) -> AccessToken {
    AccessToken {
        project_id: row.get("project_id"),
        token: row.get("token"),
        portal_id: row.get("portal_id"),
        enabled: row.get("enabled"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
        access_count: row.get("access_count"),
        last_accessed_at: row.get("last_accessed_at"),
        disabled_at: row.get("disabled_at"),
    }
}

pub async fn find(conn: &mut SqliteConnection, project_id: &str) -> PortalResult<Option<AccessToken>> {
    let row = sqlx::query(
        r#"
        SELECT project_id, token, portal_id, enabled, created_by, created_at, expires_at,
               access_count, last_accessed_at, disabled_at
        FROM access_token
        WHERE project_id = ?1
        "#,
    )
    .bind(project_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.as_ref().map(from_row))
}

/// Write the project's token, replacing any previous one wholesale
pub async fn replace(conn: &mut SqliteConnection, token: &AccessToken) -> PortalResult<()> {
    sqlx::query(
        r#"
        INSERT INTO access_token (project_id, token, portal_id, enabled, created_by, created_at,
                                  expires_at, access_count, last_accessed_at, disabled_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(project_id) DO UPDATE SET
            token = excluded.token,
            portal_id = excluded.portal_id,
            enabled = excluded.enabled,
            created_by = excluded.created_by,
            created_at = excluded.created_at,
            expires_at = excluded.expires_at,
            access_count = excluded.access_count,
            last_accessed_at = excluded.last_accessed_at,
            disabled_at = excluded.disabled_at
        "#,
    )
    .bind(&token.project_id)
    .bind(&token.token)
    .bind(&token.portal_id)
    .bind(token.enabled)
    .bind(&token.created_by)
    .bind(token.created_at)
    .bind(token.expires_at)
    .bind(token.access_count)
    .bind(token.last_accessed_at)
    .bind(token.disabled_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Bump the access counter; returns false when the project has no token
pub async fn record_access(
    conn: &mut SqliteConnection,
    project_id: &str,
    now: DateTime<Utc>,
) -> PortalResult<bool> {
    let result = sqlx::query(
        "UPDATE access_token SET access_count = access_count + 1, last_accessed_at = ?1 WHERE project_id = ?2",
    )
    .bind(now)
    .bind(project_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Disable the token, keeping the first disable time; returns false when
/// the project has no token
pub async fn disable(
    conn: &mut SqliteConnection,
    project_id: &str,
    now: DateTime<Utc>,
) -> PortalResult<bool> {
    let result = sqlx::query(
        "UPDATE access_token SET enabled = 0, disabled_at = COALESCE(disabled_at, ?1) WHERE project_id = ?2",
    )
    .bind(now)
    .bind(project_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
