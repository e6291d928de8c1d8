use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::config::{Config, config_path, load_config_from_file};
use tokio::sync::RwLock;
use tracing::info;
use utils::env::var_or;

const DEFAULT_DATABASE_URL: &str = "sqlite://repairshop.db";

/// Single-process deployment: one SQLite file and one JSON config on local disk.
#[derive(Clone)]
pub struct LocalDeployment {
    db: DBService,
    config: Arc<RwLock<Config>>,
    config_path: Arc<PathBuf>,
}

impl LocalDeployment {
    /// Assemble a deployment from parts that are already open.
    pub fn from_parts(db: DBService, config: Config, config_path: PathBuf) -> Self {
        Self {
            db,
            config: Arc::new(RwLock::new(config)),
            config_path: Arc::new(config_path),
        }
    }
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let database_url = var_or("DATABASE_URL", DEFAULT_DATABASE_URL);
        let config_path = config_path(std::env::var("SHOP_CONFIG").ok());

        let config = load_config_from_file(&config_path).await?;
        let db = DBService::new(&database_url).await?;
        info!(
            shop_name = %config.shop_name,
            config_path = %config_path.display(),
            "Local deployment ready"
        );

        Ok(Self::from_parts(db, config, config_path))
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn config(&self) -> &Arc<RwLock<Config>> {
        &self.config
    }

    fn config_path(&self) -> &Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_config_persists_and_swaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let db = DBService::new_in_memory().await.unwrap();
        let deployment = LocalDeployment::from_parts(db, Config::default(), path.clone());

        let updated = Config {
            invoice_due_days: 30,
            ..Config::default()
        };
        deployment.update_config(updated.clone()).await.unwrap();

        assert_eq!(deployment.current_config().await, updated);
        assert_eq!(load_config_from_file(&path).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_rejected_config_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        let db = DBService::new_in_memory().await.unwrap();
        let deployment =
            LocalDeployment::from_parts(db, Config::default(), dir.path().join("config.json"));

        let bad = Config {
            shop_name: "  ".to_string(),
            ..Config::default()
        };
        assert!(deployment.update_config(bad).await.is_err());
        assert_eq!(deployment.current_config().await, Config::default());
    }
}
