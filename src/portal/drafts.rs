/// Client draft saves and section reads
use super::models::{Section, SectionItem, SectionKind};
use super::patch::SectionConfigPatch;
use super::{authorize_client, authorize_owner, require, require_portal_section, require_user};
use crate::clock::SharedClock;
use crate::config::PortalConfig;
use crate::db;
use crate::error::{PortalError, PortalResult};
use crate::metrics;
use crate::store;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashSet;

/// Item list writer for the client portal
#[derive(Clone)]
pub struct DraftManager {
    db: SqlitePool,
    clock: SharedClock,
    enforce_section_lock: bool,
    max_retries: usize,
}

/// Ceiling and id checks on a draft's item list
fn validate_items(kind: SectionKind, items: &[SectionItem]) -> PortalResult<()> {
    if items.len() > kind.max_items() {
        return Err(PortalError::InvalidArgument(format!(
            "Too many {} provided",
            kind.item_label()
        )));
    }

    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if item.id.trim().is_empty() {
            return Err(PortalError::InvalidArgument("Item id is required".to_string()));
        }
        if !seen.insert(item.id.as_str()) {
            return Err(PortalError::InvalidArgument(format!(
                "Duplicate item id: {}",
                item.id
            )));
        }
    }

    Ok(())
}

async fn load_section(conn: &mut SqliteConnection, project_id: &str, kind: SectionKind) -> PortalResult<Section> {
    store::sections::find(conn, project_id, kind)
        .await?
        .ok_or_else(|| PortalError::NotFound(format!("Section {} not found", kind)))
}

impl DraftManager {
    pub fn new(db: SqlitePool, clock: SharedClock, config: &PortalConfig) -> Self {
        Self {
            db,
            clock,
            enforce_section_lock: config.portal.enforce_section_lock,
            max_retries: config.portal.tx_max_retries,
        }
    }

    /// Replace a section's items and merge an optional config patch
    pub async fn save_draft(
        &self,
        project_id: &str,
        token: &str,
        section_id: &str,
        items: Vec<SectionItem>,
        config: Option<serde_json::Value>,
    ) -> PortalResult<Section> {
        let section = db::with_retry("save_draft", self.max_retries, || {
            self.try_save(project_id, token, section_id, &items, config.as_ref())
        })
        .await?;

        metrics::record_draft_save(section.kind.as_str());
        tracing::debug!(
            project_id,
            section = %section.kind,
            items = section.items.len(),
            "Draft saved"
        );
        Ok(section)
    }

    async fn try_save(
        &self,
        project_id: &str,
        token: &str,
        section_id: &str,
        items: &[SectionItem],
        config: Option<&serde_json::Value>,
    ) -> PortalResult<Section> {
        let now = self.clock.now();
        let mut tx = self.db.begin().await?;
        authorize_client(&mut tx, project_id, token, now).await?;

        require("section", section_id)?;
        let kind = section_id.parse::<SectionKind>()?;
        require_portal_section(&mut tx, project_id, kind).await?;
        validate_items(kind, items)?;
        let patch = match config {
            Some(value) if !value.is_null() => Some(SectionConfigPatch::parse(kind, value.clone())?),
            _ => None,
        };

        let mut section = load_section(&mut tx, project_id, kind).await?;
        if self.enforce_section_lock && section.config.locked {
            return Err(PortalError::PermissionDenied(format!(
                "Section {} is locked",
                kind
            )));
        }

        if let Some(patch) = patch.filter(|p| !p.is_empty()) {
            patch.apply(&mut section.config.fields);
        }
        section.config.updated_at = now;
        section.items = items.to_vec();

        store::sections::write_draft(&mut tx, project_id, kind, &section.items, &section.config).await?;

        tx.commit().await?;
        Ok(section)
    }

    /// Section contents for the client
    pub async fn get_section(&self, project_id: &str, token: &str, section_id: &str) -> PortalResult<Section> {
        let mut conn = self.db.acquire().await?;
        authorize_client(&mut conn, project_id, token, self.clock.now()).await?;
        require("section", section_id)?;
        let kind = section_id.parse::<SectionKind>()?;
        require_portal_section(&mut conn, project_id, kind).await?;
        load_section(&mut conn, project_id, kind).await
    }

    /// Section contents for the owning photographer
    pub async fn review_section(
        &self,
        project_id: &str,
        section_id: &str,
        user_id: Option<&str>,
    ) -> PortalResult<Section> {
        let user_id = require_user(user_id)?;
        require("projectId", project_id)?;
        require("section", section_id)?;
        let kind = section_id.parse::<SectionKind>()?;

        let mut conn = self.db.acquire().await?;
        authorize_owner(&mut conn, project_id, user_id).await?;
        load_section(&mut conn, project_id, kind).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortalConfig;
    use crate::db::memory_pool;
    use crate::portal::testing::{Harness, OWNER};
    use serde_json::json;

    fn items(prefix: &str, n: usize) -> Vec<SectionItem> {
        (0..n)
            .map(|i| {
                serde_json::from_value(json!({
                    "id": format!("{}-{}", prefix, i),
                    "name": format!("Venue {}", i),
                }))
                .unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_save_and_read_back() {
        let h = Harness::new().await;
        let link = h.launch(&[SectionKind::Locations]).await;
        let token = link.access_token.as_str();

        let saved = h
            .drafts
            .save_draft("P1", token, "locations", items("loc", 6), Some(json!({ "multipleLocations": true })))
            .await
            .unwrap();
        assert_eq!(saved.items.len(), 6);
        assert_eq!(saved.config.fields.multiple_locations, Some(true));

        let read = h.drafts.get_section("P1", token, "locations").await.unwrap();
        assert_eq!(read.items, saved.items);
        assert_eq!(read.items[2].fields["name"], "Venue 2");

        let reviewed = h.drafts.review_section("P1", "locations", Some(OWNER)).await.unwrap();
        assert_eq!(reviewed.items.len(), 6);
    }

    #[tokio::test]
    async fn test_too_many_locations() {
        let h = Harness::new().await;
        let link = h.launch(&[SectionKind::Locations]).await;
        let token = link.access_token.as_str();

        h.drafts
            .save_draft("P1", token, "locations", items("loc", 6), None)
            .await
            .unwrap();
        let err = h
            .drafts
            .save_draft("P1", token, "locations", items("loc", 7), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::InvalidArgument(_)));
        assert_eq!(err.public_message(), "Too many locations provided");

        // The earlier draft is untouched
        let read = h.drafts.get_section("P1", token, "locations").await.unwrap();
        assert_eq!(read.items.len(), 6);
    }

    #[test]
    fn test_item_ceilings_per_section() {
        for kind in SectionKind::ALL {
            assert!(validate_items(kind, &items("x", kind.max_items())).is_ok());
            let err = validate_items(kind, &items("x", kind.max_items() + 1)).unwrap_err();
            assert_eq!(
                err.public_message(),
                format!("Too many {} provided", kind.item_label())
            );
        }
    }

    #[test]
    fn test_item_ids_must_be_unique() {
        let mut list = items("p", 2);
        list[1].id = list[0].id.clone();
        assert!(validate_items(SectionKind::KeyPeople, &list).is_err());

        list[1].id = " ".to_string();
        assert!(validate_items(SectionKind::KeyPeople, &list).is_err());
    }

    #[tokio::test]
    async fn test_items_replace_and_config_merges() {
        let h = Harness::new().await;
        let link = h.launch(&[SectionKind::Timeline]).await;
        let token = link.access_token.as_str();

        h.drafts
            .save_draft("P1", token, "timeline", items("t", 4), Some(json!({ "totalTimeEstimated": 240 })))
            .await
            .unwrap();
        let saved = h
            .drafts
            .save_draft("P1", token, "timeline", items("u", 2), Some(json!({})))
            .await
            .unwrap();

        assert_eq!(saved.items.len(), 2);
        assert_eq!(saved.items[0].id, "u-0");
        assert_eq!(saved.config.fields.total_time_estimated, Some(240));
        assert!(!saved.config.locked);
    }

    #[tokio::test]
    async fn test_draft_cannot_touch_lifecycle_flags() {
        let h = Harness::new().await;
        let link = h.launch(&[SectionKind::Timeline]).await;
        let token = link.access_token.as_str();

        let err = h
            .drafts
            .save_draft("P1", token, "timeline", vec![], Some(json!({ "locked": true })))
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_locked_section_rejects_drafts() {
        let h = Harness::new().await;
        let link = h.launch(&[SectionKind::Locations]).await;
        let token = link.access_token.as_str();

        h.drafts
            .save_draft("P1", token, "locations", items("loc", 2), None)
            .await
            .unwrap();
        h.lifecycle.submit_section("P1", "locations", token).await.unwrap();

        assert!(matches!(
            h.drafts.save_draft("P1", token, "locations", items("loc", 3), None).await,
            Err(PortalError::PermissionDenied(_))
        ));
        let read = h.drafts.get_section("P1", token, "locations").await.unwrap();
        assert_eq!(read.items.len(), 2);
    }

    #[tokio::test]
    async fn test_lock_enforcement_can_be_switched_off() {
        let mut config = PortalConfig::for_tests();
        config.portal.enforce_section_lock = false;
        let h = Harness::with_pool(memory_pool().await, config).await;
        let link = h.launch(&[SectionKind::Locations]).await;
        let token = link.access_token.as_str();

        h.lifecycle.submit_section("P1", "locations", token).await.unwrap();
        let saved = h
            .drafts
            .save_draft("P1", token, "locations", items("loc", 3), None)
            .await
            .unwrap();

        // Items land, the lock stays
        assert_eq!(saved.items.len(), 3);
        assert!(saved.config.locked);
    }

    #[tokio::test]
    async fn test_draft_requires_valid_token() {
        let h = Harness::new().await;
        h.launch(&[SectionKind::Locations]).await;

        assert!(matches!(
            h.drafts.save_draft("P1", "wrong", "locations", items("loc", 7), None).await,
            Err(PortalError::PermissionDenied(_))
        ));
        assert!(matches!(
            h.drafts.get_section("P1", "wrong", "locations").await,
            Err(PortalError::PermissionDenied(_))
        ));
        assert!(matches!(
            h.drafts.review_section("P1", "locations", Some("intruder")).await,
            Err(PortalError::PermissionDenied(_))
        ));
    }
}
