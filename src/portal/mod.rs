/// Section lifecycle and portal access engine
///
/// `access` owns tokens and portal links, `lifecycle` the section state
/// machine, `drafts` the client's item writes. Every multi-document write
/// runs as one SQLite transaction under `db::with_retry`.

pub mod access;
pub mod drafts;
pub mod lifecycle;
pub mod models;
pub mod patch;

pub use access::{AccessManager, PortalLink};
pub use drafts::DraftManager;
pub use lifecycle::LifecycleEngine;

use crate::error::{PortalError, PortalResult};
use crate::store;
use self::models::{AccessToken, Project, SectionKind};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use subtle::ConstantTimeEq;

/// Reject empty identifiers before touching the store
pub(crate) fn require(field: &str, value: &str) -> PortalResult<()> {
    if value.trim().is_empty() {
        return Err(PortalError::InvalidArgument(format!("{} is required", field)));
    }
    Ok(())
}

/// Photographer-only operations need a signed-in user
pub(crate) fn require_user(user_id: Option<&str>) -> PortalResult<&str> {
    match user_id {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(PortalError::Unauthenticated(
            "Authentication required".to_string(),
        )),
    }
}

/// Check a presented token against the stored row
///
/// A wrong token and a disabled one produce the same error.
pub(crate) fn check_token(
    stored: Option<AccessToken>,
    presented: &str,
    now: DateTime<Utc>,
) -> PortalResult<AccessToken> {
    let stored = stored.ok_or_else(|| PortalError::NotFound("Portal link not found".to_string()))?;

    let matches: bool = stored.token.as_bytes().ct_eq(presented.as_bytes()).into();
    if !matches || !stored.enabled {
        return Err(PortalError::PermissionDenied(
            "Portal link is invalid or has been disabled".to_string(),
        ));
    }

    if stored.expires_at < now {
        return Err(PortalError::DeadlineExceeded("Portal link has expired".to_string()));
    }

    Ok(stored)
}

/// Validate the client's token on the given connection
pub(crate) async fn authorize_client(
    conn: &mut SqliteConnection,
    project_id: &str,
    token: &str,
    now: DateTime<Utc>,
) -> PortalResult<AccessToken> {
    require("projectId", project_id)?;
    require("accessToken", token)?;
    let stored = store::tokens::find(conn, project_id).await?;
    check_token(stored, token, now)
}

/// Make sure `kind` is a step of the project's current portal
///
/// Sections dropped by a later link keep their rows but are closed to the
/// client.
pub(crate) async fn require_portal_section(
    conn: &mut SqliteConnection,
    project_id: &str,
    kind: SectionKind,
) -> PortalResult<()> {
    let status = store::status::find(conn, project_id)
        .await?
        .ok_or_else(|| PortalError::NotFound("Portal not found".to_string()))?;

    if !status.steps.contains(kind.as_str()) {
        return Err(PortalError::NotFound(format!(
            "Section {} is not part of this portal",
            kind
        )));
    }
    Ok(())
}

/// Load the project and make sure `user_id` owns it
pub(crate) async fn authorize_owner(
    conn: &mut SqliteConnection,
    project_id: &str,
    user_id: &str,
) -> PortalResult<Project> {
    let project = store::projects::find(conn, project_id)
        .await?
        .ok_or_else(|| PortalError::NotFound(format!("Project {} not found", project_id)))?;

    if project.owner_id != user_id {
        return Err(PortalError::PermissionDenied(
            "Project belongs to another photographer".to_string(),
        ));
    }

    Ok(project)
}
