/// Rate limiting
///
/// Token-gated client calls are limited per project; every request also
/// passes a global limiter chosen by whether it carries a bearer token.
/// Rejected tokens draw from their own per-project bucket so guessing
/// cannot use up the quota of the real client.
use crate::config::RateLimitConfig;
use crate::error::{PortalError, PortalResult};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultDirectRateLimiter, DefaultKeyedRateLimiter, NotUntil, Quota,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

/// Keyed state kept before stale projects are pruned
const MAX_TRACKED_PROJECTS: usize = 10_000;

const PHOTOGRAPHER_RPS: u32 = 100;
const ANONYMOUS_RPS: u32 = 50;

fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    per_project: Arc<DefaultKeyedRateLimiter<String>>,
    failed_attempts: Arc<DefaultKeyedRateLimiter<String>>,
    photographer: Arc<DefaultDirectRateLimiter>,
    anonymous: Arc<DefaultDirectRateLimiter>,
    clock: DefaultClock,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let burst = non_zero(config.burst_size);

        let project_quota = Quota::per_minute(non_zero(config.client_requests_per_minute)).allow_burst(burst);
        let photographer_quota = Quota::per_second(non_zero(PHOTOGRAPHER_RPS));
        let anonymous_quota = Quota::per_second(non_zero(ANONYMOUS_RPS));

        Self {
            enabled: config.enabled,
            per_project: Arc::new(governor::RateLimiter::keyed(project_quota)),
            failed_attempts: Arc::new(governor::RateLimiter::keyed(project_quota)),
            photographer: Arc::new(governor::RateLimiter::direct(photographer_quota)),
            anonymous: Arc::new(governor::RateLimiter::direct(anonymous_quota)),
            clock: DefaultClock::default(),
        }
    }

    fn exhausted(&self, not_until: NotUntil<<DefaultClock as Clock>::Instant>) -> PortalError {
        let wait = not_until.wait_time_from(self.clock.now());
        PortalError::ResourceExhausted {
            retry_after: wait.max(Duration::from_secs(1)),
        }
    }

    /// Check the quota of one project's portal
    pub fn check_project(&self, project_id: &str) -> PortalResult<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.per_project.len() > MAX_TRACKED_PROJECTS {
            self.per_project.retain_recent();
        }

        self.per_project
            .check_key(&project_id.to_string())
            .map_err(|not_until| {
                tracing::warn!(project_id, "Portal rate limit exceeded");
                self.exhausted(not_until)
            })
    }

    /// Charge one rejected token against the project's failure bucket
    pub fn check_failed_attempt(&self, project_id: &str) -> PortalResult<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.failed_attempts.len() > MAX_TRACKED_PROJECTS {
            self.failed_attempts.retain_recent();
        }

        self.failed_attempts
            .check_key(&project_id.to_string())
            .map_err(|not_until| {
                tracing::warn!(project_id, "Too many rejected portal tokens");
                self.exhausted(not_until)
            })
    }

    pub fn check_photographer(&self) -> PortalResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.photographer.check().map_err(|n| self.exhausted(n))
    }

    pub fn check_anonymous(&self) -> PortalResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.anonymous.check().map_err(|n| self.exhausted(n))
    }
}

/// Global rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<crate::context::AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, PortalError> {
    let has_auth_header = request.headers().get("authorization").is_some();

    if has_auth_header {
        ctx.rate_limiter.check_photographer()?;
    } else {
        ctx.rate_limiter.check_anonymous()?;
    }

    Ok(next.run(request).await)
}
