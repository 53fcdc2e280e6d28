/// Portal links and token-based client access
use super::models::{
    AccessToken, LaunchStats, PortalMetadata, PortalStatus, Project, SectionKind, StepList,
    THANK_YOU_STEP, WELCOME_STEP,
};
use super::{
    authorize_client, authorize_owner, check_token, require, require_portal_section, require_user,
};
use crate::clock::SharedClock;
use crate::config::PortalConfig;
use crate::db;
use crate::error::{PortalError, PortalResult};
use crate::metrics;
use crate::store;
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

/// Result of minting a portal link
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalLink {
    pub portal_url: String,
    pub access_token: String,
    pub portal_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Parse a list of section ids; unknown and repeated ids are rejected
fn parse_section_ids(ids: &[String]) -> PortalResult<Vec<SectionKind>> {
    let mut kinds: Vec<SectionKind> = Vec::with_capacity(ids.len());
    for id in ids {
        let kind = id.parse::<SectionKind>()?;
        if kinds.contains(&kind) {
            return Err(PortalError::InvalidArgument(format!(
                "Duplicate section: {}",
                kind
            )));
        }
        kinds.push(kind);
    }
    Ok(kinds)
}

/// Token, link and project manager
#[derive(Clone)]
pub struct AccessManager {
    db: SqlitePool,
    clock: SharedClock,
    portal_base_url: String,
    token_ttl: Duration,
    launch_debounce: Duration,
    max_retries: usize,
}

impl AccessManager {
    pub fn new(db: SqlitePool, clock: SharedClock, config: &PortalConfig) -> Self {
        Self {
            db,
            clock,
            portal_base_url: config.service.portal_base_url.clone(),
            token_ttl: Duration::days(config.portal.token_ttl_days),
            launch_debounce: Duration::minutes(config.portal.launch_debounce_minutes),
            max_retries: config.portal.tx_max_retries,
        }
    }

    /// 32 random bytes, hex encoded
    pub fn mint_token() -> String {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Stable public id for a (project, token) pair
    pub fn derive_portal_id(project_id: &str, token: &str) -> String {
        let digest = Sha256::digest(format!("{}:{}", project_id, token).as_bytes());
        format!("portal-{}", &hex::encode(digest)[..16])
    }

    /// `<base>/?project=<id>&token=<token>`
    pub fn portal_url(&self, project_id: &str, token: &str) -> PortalResult<String> {
        let mut url = reqwest::Url::parse(&self.portal_base_url)
            .map_err(|e| PortalError::Internal(format!("Invalid portal base URL: {}", e)))?;
        url.query_pairs_mut()
            .clear()
            .append_pair("project", project_id)
            .append_pair("token", token);
        Ok(url.to_string())
    }

    /// Create a project owned by the calling photographer
    pub async fn create_project(
        &self,
        user_id: Option<&str>,
        name: &str,
        project_id: Option<&str>,
    ) -> PortalResult<Project> {
        let user_id = require_user(user_id)?;
        require("name", name)?;
        if name.chars().count() > 200 {
            return Err(PortalError::InvalidArgument(
                "Project name must be at most 200 characters".to_string(),
            ));
        }

        let id = match project_id {
            Some(id) => {
                require("projectId", id)?;
                id.to_string()
            }
            None => {
                let mut bytes = [0u8; 10];
                OsRng.fill_bytes(&mut bytes);
                hex::encode(bytes)
            }
        };

        let project = Project {
            id,
            owner_id: user_id.to_string(),
            name: name.trim().to_string(),
            portal_launched: false,
            portal_launched_at: None,
            created_at: self.clock.now(),
        };

        let mut conn = self.db.acquire().await?;
        store::projects::insert(&mut conn, &project).await?;

        tracing::info!(project_id = %project.id, owner = %project.owner_id, "Project created");
        Ok(project)
    }

    /// Mint a link for the selected sections, replacing any previous one
    ///
    /// Not idempotent: the previous token stops working as soon as this
    /// commits.
    pub async fn generate_portal_link(
        &self,
        project_id: &str,
        selected_section_ids: &[String],
        required_section_ids: Option<&[String]>,
        user_id: Option<&str>,
    ) -> PortalResult<PortalLink> {
        let user_id = require_user(user_id)?;
        require("projectId", project_id)?;

        if selected_section_ids.is_empty() {
            return Err(PortalError::InvalidArgument(
                "At least one section must be selected".to_string(),
            ));
        }
        let selected = parse_section_ids(selected_section_ids)?;

        let required = match required_section_ids {
            Some(ids) => {
                let required = parse_section_ids(ids)?;
                if let Some(kind) = required.iter().find(|k| !selected.contains(k)) {
                    return Err(PortalError::InvalidArgument(format!(
                        "Required section {} is not selected",
                        kind
                    )));
                }
                required
            }
            None => selected
                .iter()
                .copied()
                .filter(SectionKind::required_by_default)
                .collect(),
        };

        let now = self.clock.now();
        let token = Self::mint_token();
        let link = PortalLink {
            portal_url: self.portal_url(project_id, &token)?,
            portal_id: Self::derive_portal_id(project_id, &token),
            access_token: token,
            expires_at: now + self.token_ttl,
        };

        db::with_retry("generate_portal_link", self.max_retries, || {
            self.try_generate(project_id, user_id, &selected, &required, &link, now)
        })
        .await?;

        metrics::record_link_generated();
        tracing::info!(
            project_id,
            portal_id = %link.portal_id,
            sections = selected.len(),
            "Portal link generated"
        );

        Ok(link)
    }

    async fn try_generate(
        &self,
        project_id: &str,
        user_id: &str,
        selected: &[SectionKind],
        required: &[SectionKind],
        link: &PortalLink,
        now: DateTime<Utc>,
    ) -> PortalResult<()> {
        let mut tx = self.db.begin().await?;

        authorize_owner(&mut tx, project_id, user_id).await?;

        let token = AccessToken {
            project_id: project_id.to_string(),
            token: link.access_token.clone(),
            portal_id: link.portal_id.clone(),
            enabled: true,
            created_by: user_id.to_string(),
            created_at: now,
            expires_at: link.expires_at,
            access_count: 0,
            last_accessed_at: None,
            disabled_at: None,
        };
        store::tokens::replace(&mut tx, &token).await?;

        // Existing section data survives a new link; the menu is rebuilt
        // from whatever state the sections are already in.
        let mut steps = StepList::seed(selected, required, now);
        let mut completed = 0;
        for kind in steps.sections() {
            store::sections::insert_if_missing(&mut tx, project_id, kind, now).await?;
            let config = store::sections::find_config(&mut tx, project_id, kind)
                .await?
                .ok_or_else(|| PortalError::Internal(format!("Section {} missing", kind)))?;
            if config.finalized {
                completed += 1;
            }
            if let Some(entry) = steps.get_mut(kind.as_str()) {
                entry.mirror(&config, now);
            }
        }

        let previous = store::status::find(&mut tx, project_id).await?;
        let section_count = steps.sections().len() as u32;
        let mut metadata = PortalMetadata::new(section_count, required.len() as u32);
        metadata.set_completed(completed);
        if let Some(previous) = &previous {
            metadata.launch = previous.metadata.launch.clone();
        }

        let status = PortalStatus {
            project_id: project_id.to_string(),
            is_setup: true,
            is_enabled: true,
            portal_url: link.portal_url.clone(),
            portal_id: link.portal_id.clone(),
            current_step_id: WELCOME_STEP.to_string(),
            steps,
            metadata,
            created_at: previous.map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
        };
        store::status::put(&mut tx, &status).await?;

        store::projects::mark_launched(&mut tx, project_id, now).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Turn the link off; calling it again changes nothing
    pub async fn disable_portal_link(&self, project_id: &str, user_id: Option<&str>) -> PortalResult<()> {
        let user_id = require_user(user_id)?;
        require("projectId", project_id)?;

        db::with_retry("disable_portal_link", self.max_retries, move || async move {
            let now = self.clock.now();
            let mut tx = self.db.begin().await?;

            authorize_owner(&mut tx, project_id, user_id).await?;
            if !store::tokens::disable(&mut tx, project_id, now).await? {
                return Err(PortalError::NotFound("Portal link not found".to_string()));
            }
            if !store::status::set_enabled(&mut tx, project_id, false, now).await? {
                return Err(PortalError::NotFound("Portal not found".to_string()));
            }

            tx.commit().await?;
            Ok(())
        })
        .await?;

        tracing::info!(project_id, "Portal link disabled");
        Ok(())
    }

    /// Check a client's token without touching any counter
    pub async fn validate_token(&self, project_id: &str, token: &str) -> PortalResult<AccessToken> {
        require("projectId", project_id)?;
        require("accessToken", token)?;

        let mut conn = self.db.acquire().await?;
        let stored = store::tokens::find(&mut conn, project_id).await?;
        let result = check_token(stored, token, self.clock.now());

        let outcome = match &result {
            Ok(_) => "ok",
            Err(PortalError::NotFound(_)) => "not_found",
            Err(PortalError::PermissionDenied(_)) => "denied",
            Err(PortalError::DeadlineExceeded(_)) => "expired",
            Err(_) => "error",
        };
        metrics::record_token_validation(outcome);

        result
    }

    /// Count one client request against the token
    pub async fn record_access(&self, project_id: &str) -> PortalResult<()> {
        let mut conn = self.db.acquire().await?;
        if !store::tokens::record_access(&mut conn, project_id, self.clock.now()).await? {
            return Err(PortalError::NotFound("Portal link not found".to_string()));
        }
        Ok(())
    }

    /// Count a portal launch, debounced per client session
    ///
    /// Stats go on the config of the section named by `step_id`, or on the
    /// status document for the pseudo-steps and when no step is given.
    pub async fn record_portal_launch(
        &self,
        project_id: &str,
        token: &str,
        step_id: Option<&str>,
    ) -> PortalResult<LaunchStats> {
        let target = match step_id.filter(|id| !id.is_empty()) {
            None => None,
            Some(id) if id == WELCOME_STEP || id == THANK_YOU_STEP => None,
            Some(id) => Some(id.parse::<SectionKind>()?),
        };

        let (stats, new_session) = db::with_retry("record_portal_launch", self.max_retries, || {
            self.try_record_launch(project_id, token, target)
        })
        .await?;

        if new_session {
            metrics::record_portal_session();
            tracing::debug!(project_id, count = stats.client_access_count, "New portal session");
        }

        Ok(stats)
    }

    async fn try_record_launch(
        &self,
        project_id: &str,
        token: &str,
        target: Option<SectionKind>,
    ) -> PortalResult<(LaunchStats, bool)> {
        let now = self.clock.now();
        let mut tx = self.db.begin().await?;
        authorize_client(&mut tx, project_id, token, now).await?;

        let result = match target {
            Some(kind) => {
                require_portal_section(&mut tx, project_id, kind).await?;
                let mut config = store::sections::find_config(&mut tx, project_id, kind)
                    .await?
                    .ok_or_else(|| PortalError::NotFound("Section not found".to_string()))?;
                let new_session = config.launch.register(now, self.launch_debounce);
                store::sections::write_config(&mut tx, project_id, kind, &config).await?;
                (config.launch, new_session)
            }
            None => {
                let mut status = store::status::find(&mut tx, project_id)
                    .await?
                    .ok_or_else(|| PortalError::NotFound("Portal not found".to_string()))?;
                let new_session = status.metadata.launch.register(now, self.launch_debounce);
                status.updated_at = now;
                store::status::put(&mut tx, &status).await?;
                (status.metadata.launch, new_session)
            }
        };

        tx.commit().await?;
        Ok(result)
    }

    /// The menu document, for a client holding a valid token
    pub async fn get_portal_status(&self, project_id: &str, token: &str) -> PortalResult<PortalStatus> {
        let mut conn = self.db.acquire().await?;
        authorize_client(&mut conn, project_id, token, self.clock.now()).await?;
        store::status::find(&mut conn, project_id)
            .await?
            .ok_or_else(|| PortalError::NotFound("Portal not found".to_string()))
    }
}
