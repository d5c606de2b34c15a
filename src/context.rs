/// Application context and dependency injection
use crate::{
    blob_store::{DiskDocumentBackend, DocumentStore},
    config::ServerConfig,
    db,
    error::AppResult,
    identity::UserDirectory,
    notification::NotificationManager,
    paper::PaperLifecycle,
    suggestion::SuggestionManager,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub users: Arc<UserDirectory>,
    pub papers: Arc<PaperLifecycle>,
    pub documents: DocumentStore,
    pub suggestions: Arc<SuggestionManager>,
    pub notifications: Arc<NotificationManager>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let pool = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let users = Arc::new(UserDirectory::new(
            pool.clone(),
            config.authentication.jwt_secret.clone(),
            config.authentication.token_ttl,
        ));

        let backend = Arc::new(DiskDocumentBackend::new(
            config.storage.document_directory.clone(),
        ));
        let documents = DocumentStore::new(backend, config.service.upload_limit);

        let papers = Arc::new(PaperLifecycle::new(pool.clone(), documents.clone()));
        let suggestions = Arc::new(SuggestionManager::new(pool.clone()));
        let notifications = Arc::new(NotificationManager::new(pool.clone()));

        Ok(Self {
            config: Arc::new(config),
            db: pool,
            users,
            papers,
            documents,
            suggestions,
            notifications,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> AppResult<()> {
        let dirs = [
            &config.storage.data_directory,
            &config.storage.document_directory,
        ];

        for dir in dirs {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }

        Ok(())
    }
}
