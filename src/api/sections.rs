/// Section read, draft and review endpoints
use super::middleware::admit_client;
use super::portal::Body;
use crate::{
    auth::Photographer,
    context::AppContext,
    error::PortalResult,
    portal::models::SectionItem,
};
use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::{json, Value};

/// Build section routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        // Client
        .route("/api/sections.get", post(get_section))
        .route("/api/sections.saveDraft", post(save_draft))
        .route("/api/sections.submit", post(submit_section))
        // Photographer
        .route("/api/sections.review", post(review_section))
        .route("/api/sections.approve", post(approve_section))
        .route("/api/sections.requestRevision", post(request_revision))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ClientSectionRequest {
    project_id: String,
    access_token: String,
    section_id: String,
}

async fn get_section(
    State(ctx): State<AppContext>,
    WithRejection(Json(req), _): Body<ClientSectionRequest>,
) -> PortalResult<Json<Value>> {
    admit_client(&ctx, &req.project_id, &req.access_token).await?;
    let section = ctx
        .drafts
        .get_section(&req.project_id, &req.access_token, &req.section_id)
        .await?;

    Ok(Json(json!({ "success": true, "section": section })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SaveDraftRequest {
    project_id: String,
    access_token: String,
    section_id: String,
    items: Vec<SectionItem>,
    config: Option<Value>,
}

async fn save_draft(
    State(ctx): State<AppContext>,
    WithRejection(Json(req), _): Body<SaveDraftRequest>,
) -> PortalResult<Json<Value>> {
    admit_client(&ctx, &req.project_id, &req.access_token).await?;
    let section = ctx
        .drafts
        .save_draft(
            &req.project_id,
            &req.access_token,
            &req.section_id,
            req.items,
            req.config,
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "itemCount": section.items.len(),
        "config": section.config,
    })))
}

async fn submit_section(
    State(ctx): State<AppContext>,
    WithRejection(Json(req), _): Body<ClientSectionRequest>,
) -> PortalResult<Json<Value>> {
    admit_client(&ctx, &req.project_id, &req.access_token).await?;
    let config = ctx
        .lifecycle
        .submit_section(&req.project_id, &req.section_id, &req.access_token)
        .await?;

    Ok(Json(json!({ "success": true, "config": config })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PhotographerSectionRequest {
    project_id: String,
    section_id: String,
    reason: String,
}

async fn review_section(
    State(ctx): State<AppContext>,
    auth: Photographer,
    WithRejection(Json(req), _): Body<PhotographerSectionRequest>,
) -> PortalResult<Json<Value>> {
    let section = ctx
        .drafts
        .review_section(&req.project_id, &req.section_id, auth.id())
        .await?;

    Ok(Json(json!({ "success": true, "section": section })))
}

async fn approve_section(
    State(ctx): State<AppContext>,
    auth: Photographer,
    WithRejection(Json(req), _): Body<PhotographerSectionRequest>,
) -> PortalResult<Json<Value>> {
    let config = ctx
        .lifecycle
        .approve_section(&req.project_id, &req.section_id, auth.id())
        .await?;

    Ok(Json(json!({ "success": true, "config": config })))
}

async fn request_revision(
    State(ctx): State<AppContext>,
    auth: Photographer,
    WithRejection(Json(req), _): Body<PhotographerSectionRequest>,
) -> PortalResult<Json<Value>> {
    let config = ctx
        .lifecycle
        .request_revision(&req.project_id, &req.section_id, auth.id(), &req.reason)
        .await?;

    Ok(Json(json!({ "success": true, "config": config })))
}
