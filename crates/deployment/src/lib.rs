use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use db::DBService;
use services::services::config::{Config, ConfigError, save_config_to_file};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Everything a request handler needs from the running shop: the database and
/// the live settings.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn db(&self) -> &DBService;

    fn config(&self) -> &Arc<RwLock<Config>>;

    fn config_path(&self) -> &Path;

    /// Snapshot of the current settings.
    async fn current_config(&self) -> Config {
        self.config().read().await.clone()
    }

    /// Validate, persist and swap in new settings.
    async fn update_config(&self, new_config: Config) -> Result<Config, DeploymentError> {
        save_config_to_file(&new_config, self.config_path()).await?;
        *self.config().write().await = new_config.clone();
        info!(shop_name = %new_config.shop_name, "Config updated");
        Ok(new_config)
    }
}
