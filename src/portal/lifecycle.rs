/// Section state machine
///
/// ```text
/// UNLOCKED --submit--> LOCKED --approve--> FINALIZED
///    |                   |                    |
///    |                   +----revision--------+--> UNLOCKED
///    +--skip (optional sections)--> FINALIZED
/// ```
///
/// Each transition updates the section config and its menu entry in the
/// same transaction.
use super::models::{
    ActionOn, PortalStatus, PortalStatusEntry, SectionConfig, SectionKind, StepStatus,
    WELCOME_STEP,
};
use super::{authorize_client, authorize_owner, require, require_portal_section, require_user};
use crate::clock::SharedClock;
use crate::config::PortalConfig;
use crate::db;
use crate::error::{PortalError, PortalResult};
use crate::metrics;
use crate::store;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

const MAX_REVISION_REASON: usize = 1000;

/// Section lifecycle engine
#[derive(Clone)]
pub struct LifecycleEngine {
    db: SqlitePool,
    clock: SharedClock,
    max_retries: usize,
}

async fn load_config(
    conn: &mut SqliteConnection,
    project_id: &str,
    kind: SectionKind,
) -> PortalResult<SectionConfig> {
    store::sections::find_config(conn, project_id, kind)
        .await?
        .ok_or_else(|| PortalError::NotFound(format!("Section {} not found", kind)))
}

async fn load_status(conn: &mut SqliteConnection, project_id: &str) -> PortalResult<PortalStatus> {
    store::status::find(conn, project_id)
        .await?
        .ok_or_else(|| PortalError::NotFound("Portal not found".to_string()))
}

/// Mirror a section's new state onto its menu entry, if it has one
///
/// `completed` moves the completion counter by one step in either
/// direction.
async fn mirror_step(
    conn: &mut SqliteConnection,
    project_id: &str,
    kind: SectionKind,
    config: &SectionConfig,
    completed: Option<bool>,
    now: DateTime<Utc>,
) -> PortalResult<()> {
    let Some(mut status) = store::status::find(conn, project_id).await? else {
        return Ok(());
    };
    let Some(entry) = status.steps.get_mut(kind.as_str()) else {
        return Ok(());
    };

    entry.mirror(config, now);
    match completed {
        Some(true) => status.metadata.step_completed(),
        Some(false) => status.metadata.step_reopened(),
        None => {}
    }
    status.updated_at = now;
    store::status::put(conn, &status).await
}

impl LifecycleEngine {
    pub fn new(db: SqlitePool, clock: SharedClock, config: &PortalConfig) -> Self {
        Self {
            db,
            clock,
            max_retries: config.portal.tx_max_retries,
        }
    }

    /// Client hands a section over for review
    ///
    /// Submitting an already submitted section succeeds without changes.
    pub async fn submit_section(
        &self,
        project_id: &str,
        section_id: &str,
        token: &str,
    ) -> PortalResult<SectionConfig> {
        require("sectionId", section_id)?;
        let kind = section_id.parse::<SectionKind>()?;

        let config = db::with_retry("submit_section", self.max_retries, move || async move {
            let now = self.clock.now();
            let mut tx = self.db.begin().await?;
            authorize_client(&mut tx, project_id, token, now).await?;
            require_portal_section(&mut tx, project_id, kind).await?;

            let mut config = load_config(&mut tx, project_id, kind).await?;
            if config.finalized {
                return Err(PortalError::InvalidArgument(format!(
                    "Section {} is already finalized",
                    kind
                )));
            }
            if config.locked {
                return Ok(config);
            }

            config.submit(now);
            store::sections::write_config(&mut tx, project_id, kind, &config).await?;
            mirror_step(&mut tx, project_id, kind, &config, None, now).await?;

            tx.commit().await?;
            metrics::record_transition("submit", kind.as_str());
            Ok(config)
        })
        .await?;

        tracing::info!(project_id, section = %kind, "Section submitted");
        Ok(config)
    }

    /// Photographer signs a section off
    pub async fn approve_section(
        &self,
        project_id: &str,
        section_id: &str,
        user_id: Option<&str>,
    ) -> PortalResult<SectionConfig> {
        let user_id = require_user(user_id)?;
        require("projectId", project_id)?;
        require("sectionId", section_id)?;
        let kind = section_id.parse::<SectionKind>()?;

        let config = db::with_retry("approve_section", self.max_retries, move || async move {
            let now = self.clock.now();
            let mut tx = self.db.begin().await?;
            authorize_owner(&mut tx, project_id, user_id).await?;

            let mut config = load_config(&mut tx, project_id, kind).await?;
            let newly_finalized = !config.finalized;

            config.approve(user_id, now);
            store::sections::write_config(&mut tx, project_id, kind, &config).await?;
            mirror_step(&mut tx, project_id, kind, &config, newly_finalized.then_some(true), now)
                .await?;

            tx.commit().await?;
            Ok(config)
        })
        .await?;

        metrics::record_transition("approve", kind.as_str());
        tracing::info!(project_id, section = %kind, approved_by = user_id, "Section approved");
        Ok(config)
    }

    /// Photographer sends a section back to the client
    pub async fn request_revision(
        &self,
        project_id: &str,
        section_id: &str,
        user_id: Option<&str>,
        reason: &str,
    ) -> PortalResult<SectionConfig> {
        let user_id = require_user(user_id)?;
        require("projectId", project_id)?;
        require("sectionId", section_id)?;
        let kind = section_id.parse::<SectionKind>()?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PortalError::InvalidArgument(
                "A revision reason is required".to_string(),
            ));
        }
        if reason.chars().count() > MAX_REVISION_REASON {
            return Err(PortalError::InvalidArgument(format!(
                "Revision reason must be at most {} characters",
                MAX_REVISION_REASON
            )));
        }

        let config = db::with_retry("request_revision", self.max_retries, move || async move {
            let now = self.clock.now();
            let mut tx = self.db.begin().await?;
            authorize_owner(&mut tx, project_id, user_id).await?;

            let mut config = load_config(&mut tx, project_id, kind).await?;
            let was_finalized = config.finalized;

            config.request_revision(user_id, reason, now);
            store::sections::write_config(&mut tx, project_id, kind, &config).await?;
            mirror_step(&mut tx, project_id, kind, &config, was_finalized.then_some(false), now)
                .await?;

            tx.commit().await?;
            Ok(config)
        })
        .await?;

        metrics::record_transition("revision", kind.as_str());
        tracing::info!(project_id, section = %kind, requested_by = user_id, "Revision requested");
        Ok(config)
    }

    /// Client skips an optional, still unlocked section
    pub async fn skip_step(&self, project_id: &str, token: &str, step_id: &str) -> PortalResult<PortalStatus> {
        require("stepId", step_id)?;

        let status = db::with_retry("skip_step", self.max_retries, || {
            self.try_skip(project_id, token, step_id)
        })
        .await?;

        metrics::record_transition("skip", step_id);
        tracing::info!(
            project_id,
            step = step_id,
            completed = status.metadata.completed_steps,
            "Step skipped"
        );
        Ok(status)
    }

    async fn try_skip(&self, project_id: &str, token: &str, step_id: &str) -> PortalResult<PortalStatus> {
        let now = self.clock.now();
        let mut tx = self.db.begin().await?;
        authorize_client(&mut tx, project_id, token, now).await?;

        let mut status = load_status(&mut tx, project_id).await?;
        let entry = status
            .steps
            .get(step_id)
            .ok_or_else(|| PortalError::NotFound(format!("Step {} not found", step_id)))?;
        let kind = SectionKind::from_step_id(step_id).ok_or_else(|| {
            PortalError::InvalidArgument(format!("Step {} cannot be skipped", step_id))
        })?;
        if entry.required_step {
            return Err(PortalError::InvalidArgument(format!(
                "Step {} is required and cannot be skipped",
                step_id
            )));
        }

        let mut config = load_config(&mut tx, project_id, kind).await?;
        if config.locked || config.finalized {
            return Err(PortalError::InvalidArgument(format!(
                "Step {} is not open for skipping",
                step_id
            )));
        }

        config.skip(now);
        store::sections::write_config(&mut tx, project_id, kind, &config).await?;

        if let Some(entry) = status.steps.get_mut(step_id) {
            entry.mirror(&config, now);
        }
        status.metadata.step_completed();
        status.current_step_id = WELCOME_STEP.to_string();
        status.updated_at = now;
        store::status::put(&mut tx, &status).await?;

        tx.commit().await?;
        Ok(status)
    }

    /// Remember where the client is in the portal
    pub async fn update_current_step(&self, project_id: &str, token: &str, step_id: &str) -> PortalResult<()> {
        require("stepId", step_id)?;

        db::with_retry("update_current_step", self.max_retries, move || async move {
            let now = self.clock.now();
            let mut tx = self.db.begin().await?;
            authorize_client(&mut tx, project_id, token, now).await?;

            if !store::status::set_current_step(&mut tx, project_id, step_id, now).await? {
                return Err(PortalError::NotFound("Portal not found".to_string()));
            }

            tx.commit().await?;
            Ok(())
        })
        .await
    }

    /// Set a menu entry's UI status
    ///
    /// Section steps may only move between `unlocked` and `inProgress` while
    /// the section itself is unlocked; the pseudo-steps may also be marked
    /// `finalized`. Everything else goes through submit/approve.
    pub async fn update_section_item_status(
        &self,
        project_id: &str,
        token: &str,
        step_id: &str,
        step_status: StepStatus,
        action_on: ActionOn,
    ) -> PortalResult<PortalStatusEntry> {
        require("stepId", step_id)?;

        db::with_retry("update_section_item_status", self.max_retries, || {
            self.try_update_item_status(project_id, token, step_id, step_status, action_on)
        })
        .await
    }

    async fn try_update_item_status(
        &self,
        project_id: &str,
        token: &str,
        step_id: &str,
        step_status: StepStatus,
        action_on: ActionOn,
    ) -> PortalResult<PortalStatusEntry> {
        let now = self.clock.now();
        let mut tx = self.db.begin().await?;
        authorize_client(&mut tx, project_id, token, now).await?;

        let mut status = load_status(&mut tx, project_id).await?;
        if !status.steps.contains(step_id) {
            return Err(PortalError::NotFound(format!("Step {} not found", step_id)));
        }

        match SectionKind::from_step_id(step_id) {
            Some(kind) => {
                let config = load_config(&mut tx, project_id, kind).await?;
                if config.locked {
                    return Err(PortalError::InvalidArgument(format!(
                        "Section {} is locked",
                        kind
                    )));
                }
                if !matches!(step_status, StepStatus::Unlocked | StepStatus::InProgress)
                    || action_on != ActionOn::Client
                {
                    return Err(PortalError::InvalidArgument(format!(
                        "Section steps can only be marked unlocked or inProgress by the client, not {}",
                        step_status.as_str()
                    )));
                }
            }
            None => {
                if step_status == StepStatus::Locked || action_on == ActionOn::Photographer {
                    return Err(PortalError::InvalidArgument(format!(
                        "Step {} cannot be handed to the photographer",
                        step_id
                    )));
                }
            }
        }

        let entry = status
            .steps
            .get_mut(step_id)
            .ok_or_else(|| PortalError::NotFound(format!("Step {} not found", step_id)))?;
        entry.step_status = step_status;
        entry.action_on = action_on;
        entry.updated_at = Some(now);
        let entry = entry.clone();

        status.updated_at = now;
        store::status::put(&mut tx, &status).await?;

        tx.commit().await?;
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortalConfig;
    use crate::db::{create_pool, run_migrations, DatabaseOptions};
    use crate::portal::testing::{Harness, OWNER};

    const ALL: [SectionKind; 5] = SectionKind::ALL;

    async fn section_config(h: &Harness, kind: SectionKind) -> SectionConfig {
        let mut conn = h.db.acquire().await.unwrap();
        store::sections::find_config(&mut conn, "P1", kind)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_skip_updates_section_and_menu() {
        let h = Harness::new().await;
        let link = h.launch(&ALL).await;
        let token = link.access_token.as_str();

        // One step already done: 5 total, 1 completed
        h.lifecycle.approve_section("P1", "timeline", Some(OWNER)).await.unwrap();
        h.lifecycle.update_current_step("P1", token, "keyPeople").await.unwrap();

        let status = h.lifecycle.skip_step("P1", token, "keyPeople").await.unwrap();
        assert_eq!(status.metadata.total_steps, 5);
        assert_eq!(status.metadata.completed_steps, 2);
        assert_eq!(status.metadata.completion_percentage, 40);
        assert_eq!(status.current_step_id, WELCOME_STEP);
        assert_eq!(
            status.steps.get("keyPeople").unwrap().step_status,
            StepStatus::Finalized
        );

        let config = section_config(&h, SectionKind::KeyPeople).await;
        assert!(config.finalized && config.locked && config.skipped);
        assert_eq!(config.action_on, ActionOn::None);
    }

    #[tokio::test]
    async fn test_skip_rejections() {
        let h = Harness::new().await;
        let link = h.launch(&[SectionKind::KeyPeople, SectionKind::Locations]).await;
        let token = link.access_token.as_str();

        assert!(matches!(
            h.lifecycle.skip_step("P1", token, "locations").await,
            Err(PortalError::InvalidArgument(_))
        ));
        assert!(matches!(
            h.lifecycle.skip_step("P1", token, WELCOME_STEP).await,
            Err(PortalError::InvalidArgument(_))
        ));
        assert!(matches!(
            h.lifecycle.skip_step("P1", token, "timeline").await,
            Err(PortalError::NotFound(_))
        ));

        h.lifecycle.skip_step("P1", token, "keyPeople").await.unwrap();
        assert!(matches!(
            h.lifecycle.skip_step("P1", token, "keyPeople").await,
            Err(PortalError::InvalidArgument(_))
        ));
        assert!(matches!(
            h.lifecycle.skip_step("P1", "wrong", "keyPeople").await,
            Err(PortalError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_skips_both_land() {
        let h = Harness::new().await;
        let link = h.launch(&ALL).await;
        let token = link.access_token.as_str();

        let (a, b, c) = tokio::join!(
            h.lifecycle.skip_step("P1", token, "keyPeople"),
            h.lifecycle.skip_step("P1", token, "groupShots"),
            h.lifecycle.update_current_step("P1", token, "photoRequests"),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        let status = h.access.get_portal_status("P1", token).await.unwrap();
        assert_eq!(status.metadata.completed_steps, 2);
        assert_eq!(status.metadata.completion_percentage, 40);
        for id in ["keyPeople", "groupShots"] {
            assert_eq!(status.steps.get(id).unwrap().step_status, StepStatus::Finalized);
        }
    }

    #[tokio::test]
    async fn test_concurrent_skips_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_pool(
            &dir.path().join("portal.sqlite"),
            DatabaseOptions {
                max_connections: 4,
                enable_wal: true,
            },
        )
        .await
        .unwrap();
        run_migrations(&pool).await.unwrap();

        let mut config = PortalConfig::for_tests();
        config.portal.tx_max_retries = 10;
        let h = Harness::with_pool(pool, config).await;
        let link = h.launch(&ALL).await;
        let token = link.access_token.as_str();

        let (a, b) = tokio::join!(
            h.lifecycle.skip_step("P1", token, "keyPeople"),
            h.lifecycle.skip_step("P1", token, "photoRequests"),
        );
        a.unwrap();
        b.unwrap();

        let status = h.access.get_portal_status("P1", token).await.unwrap();
        assert_eq!(status.metadata.completed_steps, 2);
    }

    #[tokio::test]
    async fn test_submit_locks_and_mirrors() {
        let h = Harness::new().await;
        let link = h.launch(&[SectionKind::Locations]).await;
        let token = link.access_token.as_str();

        let config = h.lifecycle.submit_section("P1", "locations", token).await.unwrap();
        assert!(config.locked && !config.finalized);
        assert_eq!(config.action_on, ActionOn::Photographer);
        assert!(config.is_consistent());

        let status = h.access.get_portal_status("P1", token).await.unwrap();
        let entry = status.steps.get("locations").unwrap();
        assert_eq!(entry.step_status, StepStatus::Locked);
        assert_eq!(entry.action_on, ActionOn::Photographer);

        // Re-submitting is a no-op
        let again = h.lifecycle.submit_section("P1", "locations", token).await.unwrap();
        assert_eq!(again, config);
    }

    #[tokio::test]
    async fn test_submit_errors() {
        let h = Harness::new().await;
        let link = h.launch(&[SectionKind::Locations]).await;
        let token = link.access_token.as_str();

        assert!(matches!(
            h.lifecycle.submit_section("P1", "timeline", token).await,
            Err(PortalError::NotFound(_))
        ));
        assert!(matches!(
            h.lifecycle.submit_section("P1", "moodBoard", token).await,
            Err(PortalError::InvalidArgument(_))
        ));

        h.lifecycle.approve_section("P1", "locations", Some(OWNER)).await.unwrap();
        assert!(matches!(
            h.lifecycle.submit_section("P1", "locations", token).await,
            Err(PortalError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_sections_dropped_by_new_link_are_closed() {
        let h = Harness::new().await;
        h.launch(&[SectionKind::Locations, SectionKind::KeyPeople]).await;
        let link = h
            .access
            .generate_portal_link("P1", &["locations".to_string()], None, Some(OWNER))
            .await
            .unwrap();
        let token = link.access_token.as_str();

        assert!(matches!(
            h.drafts.save_draft("P1", token, "keyPeople", vec![], None).await,
            Err(PortalError::NotFound(_))
        ));
        assert!(matches!(
            h.drafts.get_section("P1", token, "keyPeople").await,
            Err(PortalError::NotFound(_))
        ));
        assert!(matches!(
            h.lifecycle.submit_section("P1", "keyPeople", token).await,
            Err(PortalError::NotFound(_))
        ));
        assert!(matches!(
            h.lifecycle.skip_step("P1", token, "keyPeople").await,
            Err(PortalError::NotFound(_))
        ));
        assert!(matches!(
            h.access.record_portal_launch("P1", token, Some("keyPeople")).await,
            Err(PortalError::NotFound(_))
        ));

        // The dropped row is untouched and still readable by the photographer
        let section = h.drafts.review_section("P1", "keyPeople", Some(OWNER)).await.unwrap();
        assert!(!section.config.locked);

        h.drafts.save_draft("P1", token, "locations", vec![], None).await.unwrap();
        h.lifecycle.submit_section("P1", "locations", token).await.unwrap();
    }

    #[tokio::test]
    async fn test_approve_then_revision_round_trip() {
        let h = Harness::new().await;
        let link = h.launch(&[SectionKind::Locations, SectionKind::Timeline]).await;
        let token = link.access_token.as_str();

        h.lifecycle.submit_section("P1", "locations", token).await.unwrap();
        let config = h.lifecycle.approve_section("P1", "locations", Some(OWNER)).await.unwrap();
        assert!(config.finalized && config.locked);
        assert_eq!(config.approved_by.as_deref(), Some(OWNER));
        assert_eq!(config.action_on, ActionOn::None);

        // Approving twice does not double count
        h.lifecycle.approve_section("P1", "locations", Some(OWNER)).await.unwrap();
        let status = h.access.get_portal_status("P1", token).await.unwrap();
        assert_eq!(status.metadata.completed_steps, 1);
        assert_eq!(status.metadata.completion_percentage, 50);
        assert_eq!(
            status.steps.get("locations").unwrap().step_status,
            StepStatus::Finalized
        );

        let config = h
            .lifecycle
            .request_revision("P1", "locations", Some(OWNER), "  Add the ceremony venue ")
            .await
            .unwrap();
        assert!(!config.finalized && !config.locked);
        assert_eq!(config.action_on, ActionOn::Client);
        assert_eq!(config.revision_reason.as_deref(), Some("Add the ceremony venue"));
        assert_eq!(config.requested_by.as_deref(), Some(OWNER));

        let status = h.access.get_portal_status("P1", token).await.unwrap();
        assert_eq!(status.metadata.completed_steps, 0);
        let entry = status.steps.get("locations").unwrap();
        assert_eq!(entry.step_status, StepStatus::Unlocked);
        assert_eq!(entry.action_on, ActionOn::Client);
    }

    #[tokio::test]
    async fn test_revision_of_submitted_section_keeps_count() {
        let h = Harness::new().await;
        let link = h.launch(&[SectionKind::Locations]).await;
        let token = link.access_token.as_str();

        h.lifecycle.submit_section("P1", "locations", token).await.unwrap();
        h.lifecycle
            .request_revision("P1", "locations", Some(OWNER), "Missing addresses")
            .await
            .unwrap();

        let status = h.access.get_portal_status("P1", token).await.unwrap();
        assert_eq!(status.metadata.completed_steps, 0);
        assert!(!section_config(&h, SectionKind::Locations).await.locked);
    }

    #[tokio::test]
    async fn test_photographer_operations_require_owner() {
        let h = Harness::new().await;
        h.launch(&[SectionKind::Locations]).await;

        assert!(matches!(
            h.lifecycle.approve_section("P1", "locations", None).await,
            Err(PortalError::Unauthenticated(_))
        ));
        assert!(matches!(
            h.lifecycle.approve_section("P1", "", Some(OWNER)).await,
            Err(PortalError::InvalidArgument(_))
        ));
        assert!(matches!(
            h.lifecycle.approve_section("P1", "locations", Some("intruder")).await,
            Err(PortalError::PermissionDenied(_))
        ));
        assert!(matches!(
            h.lifecycle.request_revision("P1", "locations", None, "why").await,
            Err(PortalError::Unauthenticated(_))
        ));
        assert!(matches!(
            h.lifecycle.request_revision("P1", "locations", Some(OWNER), "   ").await,
            Err(PortalError::InvalidArgument(_))
        ));
        let too_long = "x".repeat(MAX_REVISION_REASON + 1);
        assert!(matches!(
            h.lifecycle.request_revision("P1", "locations", Some(OWNER), &too_long).await,
            Err(PortalError::InvalidArgument(_))
        ));
        assert!(matches!(
            h.lifecycle.approve_section("P1", "timeline", Some(OWNER)).await,
            Err(PortalError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_only_revision_clears_finalized() {
        let h = Harness::new().await;
        let link = h.launch(&[SectionKind::KeyPeople]).await;
        let token = link.access_token.as_str();

        h.lifecycle.skip_step("P1", token, "keyPeople").await.unwrap();
        assert!(h.lifecycle.submit_section("P1", "keyPeople", token).await.is_err());
        assert!(h
            .lifecycle
            .update_section_item_status("P1", token, "keyPeople", StepStatus::Unlocked, ActionOn::Client)
            .await
            .is_err());
        assert!(section_config(&h, SectionKind::KeyPeople).await.finalized);

        h.lifecycle
            .request_revision("P1", "keyPeople", Some(OWNER), "Please add the grandparents")
            .await
            .unwrap();
        let config = section_config(&h, SectionKind::KeyPeople).await;
        assert!(!config.finalized && !config.skipped);
    }

    #[tokio::test]
    async fn test_update_current_step() {
        let h = Harness::new().await;
        let link = h.launch(&[SectionKind::Locations]).await;
        let token = link.access_token.as_str();

        h.lifecycle.update_current_step("P1", token, "locations").await.unwrap();
        let status = h.access.get_portal_status("P1", token).await.unwrap();
        assert_eq!(status.current_step_id, "locations");

        assert!(matches!(
            h.lifecycle.update_current_step("P1", token, "").await,
            Err(PortalError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_update_section_item_status() {
        let h = Harness::new().await;
        let link = h.launch(&[SectionKind::Locations, SectionKind::Timeline]).await;
        let token = link.access_token.as_str();

        let entry = h
            .lifecycle
            .update_section_item_status("P1", token, "locations", StepStatus::InProgress, ActionOn::Client)
            .await
            .unwrap();
        assert_eq!(entry.step_status, StepStatus::InProgress);

        let status = h.access.get_portal_status("P1", token).await.unwrap();
        assert_eq!(
            status.steps.get("locations").unwrap().step_status,
            StepStatus::InProgress
        );
        let ids: Vec<&str> = status.steps.iter().map(|s| s.step_id.as_str()).collect();
        assert_eq!(ids, vec!["welcome", "locations", "timeline", "thankYou"]);

        h.lifecycle
            .update_section_item_status("P1", token, WELCOME_STEP, StepStatus::Finalized, ActionOn::None)
            .await
            .unwrap();

        assert!(matches!(
            h.lifecycle
                .update_section_item_status("P1", token, "locations", StepStatus::Finalized, ActionOn::None)
                .await,
            Err(PortalError::InvalidArgument(_))
        ));
        assert!(matches!(
            h.lifecycle
                .update_section_item_status("P1", token, "groupShots", StepStatus::InProgress, ActionOn::Client)
                .await,
            Err(PortalError::NotFound(_))
        ));

        h.lifecycle.submit_section("P1", "timeline", token).await.unwrap();
        assert!(matches!(
            h.lifecycle
                .update_section_item_status("P1", token, "timeline", StepStatus::Unlocked, ActionOn::Client)
                .await,
            Err(PortalError::InvalidArgument(_))
        ));
    }
}
