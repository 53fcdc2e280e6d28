/// Project records
use crate::error::{PortalError, PortalResult};
use crate::portal::models::Project;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

fn from_row(row: &SqliteRow) -> Project {
    Project {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        portal_launched: row.get("portal_launched"),
        portal_launched_at: row.get("portal_launched_at"),
        created_at: row.get("created_at"),
    }
}

/// Insert a new project, refusing to overwrite an existing id
pub async fn insert(conn: &mut SqliteConnection, project: &Project) -> PortalResult<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO project (id, owner_id, name, portal_launched, portal_launched_at, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(&project.id)
    .bind(&project.owner_id)
    .bind(&project.name)
    .bind(project.portal_launched)
    .bind(project.portal_launched_at)
    .bind(project.created_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(PortalError::InvalidArgument(format!(
            "Project {} already exists",
            project.id
        )));
    }

    Ok(())
}

pub async fn find(conn: &mut SqliteConnection, project_id: &str) -> PortalResult<Option<Project>> {
    let row = sqlx::query(
        "SELECT id, owner_id, name, portal_launched, portal_launched_at, created_at FROM project WHERE id = ?1",
    )
    .bind(project_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.as_ref().map(from_row))
}

/// Flag that the client portal has gone live
pub async fn mark_launched(
    conn: &mut SqliteConnection,
    project_id: &str,
    now: DateTime<Utc>,
) -> PortalResult<()> {
    let result = sqlx::query(
        "UPDATE project SET portal_launched = 1, portal_launched_at = ?1 WHERE id = ?2",
    )
    .bind(now)
    .bind(project_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(PortalError::NotFound(format!("Project {} not found", project_id)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    #[tokio::test]
    async fn test_insert_find_and_launch() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let now = Utc::now();

        let project = Project {
            id: "P1".to_string(),
            owner_id: "photographer-1".to_string(),
            name: "Ana & Ben".to_string(),
            portal_launched: false,
            portal_launched_at: None,
            created_at: now,
        };
        insert(&mut conn, &project).await.unwrap();
        assert!(matches!(
            insert(&mut conn, &project).await,
            Err(PortalError::InvalidArgument(_))
        ));

        mark_launched(&mut conn, "P1", now).await.unwrap();
        let stored = find(&mut conn, "P1").await.unwrap().unwrap();
        assert!(stored.portal_launched);
        assert_eq!(stored.portal_launched_at, Some(now));
        assert_eq!(stored.owner_id, "photographer-1");

        assert!(find(&mut conn, "P2").await.unwrap().is_none());
        assert!(matches!(
            mark_launched(&mut conn, "P2", now).await,
            Err(PortalError::NotFound(_))
        ));
    }
}
