/// Portal link, token and menu endpoints
use super::middleware::admit_client;
use crate::{
    auth::Photographer,
    context::AppContext,
    error::{PortalError, PortalResult},
    portal::models::{ActionOn, StepStatus},
};
use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::{json, Value};

/// JSON body whose parse errors surface as `invalid-argument`
pub type Body<T> = WithRejection<Json<T>, PortalError>;

/// Build portal routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/projects.create", post(create_project))
        .route("/api/portal.generateLink", post(generate_link))
        .route("/api/portal.disableLink", post(disable_link))
        .route("/api/portal.validateToken", post(validate_token))
        .route("/api/portal.recordLaunch", post(record_launch))
        .route("/api/portal.getStatus", post(get_status))
        .route("/api/portal.updateCurrentStep", post(update_current_step))
        .route("/api/portal.updateStepStatus", post(update_step_status))
        .route("/api/portal.skipStep", post(skip_step))
}

// ============================================================================
// Photographer endpoints
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CreateProjectRequest {
    name: String,
    project_id: Option<String>,
}

async fn create_project(
    State(ctx): State<AppContext>,
    auth: Photographer,
    WithRejection(Json(req), _): Body<CreateProjectRequest>,
) -> PortalResult<Json<Value>> {
    let project = ctx
        .access
        .create_project(auth.id(), &req.name, req.project_id.as_deref())
        .await?;

    Ok(Json(json!({ "success": true, "project": project })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GenerateLinkRequest {
    project_id: String,
    selected_section_ids: Vec<String>,
    required_section_ids: Option<Vec<String>>,
}

async fn generate_link(
    State(ctx): State<AppContext>,
    auth: Photographer,
    WithRejection(Json(req), _): Body<GenerateLinkRequest>,
) -> PortalResult<Json<Value>> {
    let link = ctx
        .access
        .generate_portal_link(
            &req.project_id,
            &req.selected_section_ids,
            req.required_section_ids.as_deref(),
            auth.id(),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "portalUrl": link.portal_url,
        "accessToken": link.access_token,
        "portalId": link.portal_id,
        "expiresAt": link.expires_at,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectRequest {
    project_id: String,
}

async fn disable_link(
    State(ctx): State<AppContext>,
    auth: Photographer,
    WithRejection(Json(req), _): Body<ProjectRequest>,
) -> PortalResult<Json<Value>> {
    ctx.access.disable_portal_link(&req.project_id, auth.id()).await?;
    Ok(Json(json!({ "success": true })))
}

// ============================================================================
// Client endpoints (portal token in the body)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ClientRequest {
    project_id: String,
    access_token: String,
}

async fn validate_token(
    State(ctx): State<AppContext>,
    WithRejection(Json(req), _): Body<ClientRequest>,
) -> PortalResult<Json<Value>> {
    let token = admit_client(&ctx, &req.project_id, &req.access_token).await?;

    Ok(Json(json!({
        "success": true,
        "projectId": token.project_id,
        "portalId": token.portal_id,
        "expiresAt": token.expires_at,
    })))
}

async fn get_status(
    State(ctx): State<AppContext>,
    WithRejection(Json(req), _): Body<ClientRequest>,
) -> PortalResult<Json<Value>> {
    admit_client(&ctx, &req.project_id, &req.access_token).await?;
    let status = ctx
        .access
        .get_portal_status(&req.project_id, &req.access_token)
        .await?;

    Ok(Json(json!({ "success": true, "status": status })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RecordLaunchRequest {
    project_id: String,
    access_token: String,
    step_id: Option<String>,
}

async fn record_launch(
    State(ctx): State<AppContext>,
    WithRejection(Json(req), _): Body<RecordLaunchRequest>,
) -> PortalResult<Json<Value>> {
    admit_client(&ctx, &req.project_id, &req.access_token).await?;
    let stats = ctx
        .access
        .record_portal_launch(&req.project_id, &req.access_token, req.step_id.as_deref())
        .await?;

    Ok(Json(json!({
        "success": true,
        "clientAccessCount": stats.client_access_count,
        "lastClientActivity": stats.last_client_activity,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StepRequest {
    project_id: String,
    access_token: String,
    step_id: String,
}

async fn update_current_step(
    State(ctx): State<AppContext>,
    WithRejection(Json(req), _): Body<StepRequest>,
) -> PortalResult<Json<Value>> {
    admit_client(&ctx, &req.project_id, &req.access_token).await?;
    ctx.lifecycle
        .update_current_step(&req.project_id, &req.access_token, &req.step_id)
        .await?;

    Ok(Json(json!({ "success": true, "currentStepId": req.step_id })))
}

async fn skip_step(
    State(ctx): State<AppContext>,
    WithRejection(Json(req), _): Body<StepRequest>,
) -> PortalResult<Json<Value>> {
    admit_client(&ctx, &req.project_id, &req.access_token).await?;
    let status = ctx
        .lifecycle
        .skip_step(&req.project_id, &req.access_token, &req.step_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "completedSteps": status.metadata.completed_steps,
        "completionPercentage": status.metadata.completion_percentage,
        "currentStepId": status.current_step_id,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepStatusRequest {
    #[serde(default)]
    project_id: String,
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    step_id: String,
    status: StepStatus,
    action_on: ActionOn,
}

async fn update_step_status(
    State(ctx): State<AppContext>,
    WithRejection(Json(req), _): Body<StepStatusRequest>,
) -> PortalResult<Json<Value>> {
    admit_client(&ctx, &req.project_id, &req.access_token).await?;
    let entry = ctx
        .lifecycle
        .update_section_item_status(
            &req.project_id,
            &req.access_token,
            &req.step_id,
            req.status,
            req.action_on,
        )
        .await?;

    Ok(Json(json!({ "success": true, "step": entry })))
}
