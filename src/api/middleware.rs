/// Request plumbing shared by the handlers
use crate::{
    context::AppContext,
    error::{PortalError, PortalResult},
    metrics,
    portal::models::AccessToken,
};
use axum::{
    extract::{MatchedPath, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::time::Instant;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Gate for every token-authenticated client call
///
/// The token is checked first. A rejected token is charged to the project's
/// failure bucket, an accepted one to its client quota and one access tick.
pub async fn admit_client(ctx: &AppContext, project_id: &str, token: &str) -> PortalResult<AccessToken> {
    let access_token = match ctx.access.validate_token(project_id, token).await {
        Ok(access_token) => access_token,
        Err(
            err @ (PortalError::NotFound(_)
            | PortalError::PermissionDenied(_)
            | PortalError::DeadlineExceeded(_)
            | PortalError::InvalidArgument(_)),
        ) => {
            ctx.rate_limiter.check_failed_attempt(project_id)?;
            return Err(err);
        }
        Err(err) => return Err(err),
    };

    ctx.rate_limiter.check_project(project_id)?;
    ctx.access.record_access(project_id).await?;
    Ok(access_token)
}

/// Count and time every request by its route template
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    metrics::record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}
