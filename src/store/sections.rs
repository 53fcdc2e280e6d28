/// Section documents: an item list and a lifecycle config per kind
use crate::error::PortalResult;
use crate::portal::models::{Section, SectionConfig, SectionItem, SectionKind};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};

pub async fn find(
    conn: &mut SqliteConnection,
    project_id: &str,
    kind: SectionKind,
) -> PortalResult<Option<Section>> {
    let row = sqlx::query("SELECT items, config FROM section WHERE project_id = ?1 AND kind = ?2")
        .bind(project_id)
        .bind(kind.as_str())
        .fetch_optional(&mut *conn)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let items: Vec<SectionItem> = serde_json::from_str(&row.get::<String, _>("items"))?;
    let config: SectionConfig = serde_json::from_str(&row.get::<String, _>("config"))?;

    Ok(Some(Section {
        project_id: project_id.to_string(),
        kind,
        items,
        config,
    }))
}

pub async fn find_config(
    conn: &mut SqliteConnection,
    project_id: &str,
    kind: SectionKind,
) -> PortalResult<Option<SectionConfig>> {
    let config: Option<String> =
        sqlx::query_scalar("SELECT config FROM section WHERE project_id = ?1 AND kind = ?2")
            .bind(project_id)
            .bind(kind.as_str())
            .fetch_optional(&mut *conn)
            .await?;

    match config {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Create an empty section unless one already exists
pub async fn insert_if_missing(
    conn: &mut SqliteConnection,
    project_id: &str,
    kind: SectionKind,
    now: DateTime<Utc>,
) -> PortalResult<()> {
    let config = serde_json::to_string(&SectionConfig::new(now))?;

    sqlx::query(
        r#"
        INSERT INTO section (project_id, kind, items, config, updated_at)
        VALUES (?1, ?2, '[]', ?3, ?4)
        ON CONFLICT(project_id, kind) DO NOTHING
        "#,
    )
    .bind(project_id)
    .bind(kind.as_str())
    .bind(config)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn write_config(
    conn: &mut SqliteConnection,
    project_id: &str,
    kind: SectionKind,
    config: &SectionConfig,
) -> PortalResult<()> {
    debug_assert!(config.is_consistent(), "inconsistent lifecycle flags for {}", kind);
    sqlx::query("UPDATE section SET config = ?1, updated_at = ?2 WHERE project_id = ?3 AND kind = ?4")
        .bind(serde_json::to_string(config)?)
        .bind(config.updated_at)
        .bind(project_id)
        .bind(kind.as_str())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Replace the item list and store the (already merged) config
pub async fn write_draft(
    conn: &mut SqliteConnection,
    project_id: &str,
    kind: SectionKind,
    items: &[SectionItem],
    config: &SectionConfig,
) -> PortalResult<()> {
    sqlx::query(
        "UPDATE section SET items = ?1, config = ?2, updated_at = ?3 WHERE project_id = ?4 AND kind = ?5",
    )
    .bind(serde_json::to_string(items)?)
    .bind(serde_json::to_string(config)?)
    .bind(config.updated_at)
    .bind(project_id)
    .bind(kind.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(())
}
