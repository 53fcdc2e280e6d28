/// Application context and dependency injection
use crate::{
    clock::{SharedClock, SystemClock},
    config::PortalConfig,
    db,
    error::PortalResult,
    portal::{AccessManager, DraftManager, LifecycleEngine},
    rate_limit::RateLimiter,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<PortalConfig>,
    pub db: SqlitePool,
    pub access: Arc<AccessManager>,
    pub lifecycle: Arc<LifecycleEngine>,
    pub drafts: Arc<DraftManager>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: PortalConfig) -> PortalResult<Self> {
        config.validate()?;

        if !config.storage.data_directory.exists() {
            tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        }

        let options = db::DatabaseOptions {
            max_connections: config.storage.max_connections,
            ..Default::default()
        };
        let pool = db::create_pool(&config.storage.database, options).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        tracing::info!(database = %config.storage.database.display(), "Database ready");

        Ok(Self::from_parts(config, pool, Arc::new(SystemClock)))
    }

    /// Wire the managers over an existing pool and clock
    pub fn from_parts(config: PortalConfig, db: SqlitePool, clock: SharedClock) -> Self {
        let access = Arc::new(AccessManager::new(db.clone(), clock.clone(), &config));
        let lifecycle = Arc::new(LifecycleEngine::new(db.clone(), clock.clone(), &config));
        let drafts = Arc::new(DraftManager::new(db.clone(), clock, &config));
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Self {
            config: Arc::new(config),
            db,
            access,
            lifecycle,
            drafts,
            rate_limiter,
        }
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
