use std::sync::Arc;

use sift_service::SiftService;
use sift_storage::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SiftService>,
}

impl AppState {
	pub async fn new(config: sift_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.sqlite).await?;
		db.ensure_schema().await?;
		Ok(Self { service: Arc::new(SiftService::new(config, db)) })
	}

	pub fn with_service(service: Arc<SiftService>) -> Self {
		Self { service }
	}
}
