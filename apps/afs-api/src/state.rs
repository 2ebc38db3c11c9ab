use std::sync::Arc;

use afs_config::Config;
use afs_service::AfsService;
use afs_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<AfsService>,
}
impl AppState {
	/// Connects Postgres, bootstraps the schema, and wires Qdrant when it is configured.
	pub async fn new(config: Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema(config.storage.vector_dim).await?;

		let qdrant = match config.storage.qdrant.as_ref() {
			Some(qdrant) => Some(QdrantStore::new(qdrant, config.storage.vector_dim)?),
			None => {
				tracing::warn!("Qdrant is not configured. Searches run without the vector path.");

				None
			},
		};
		let service = AfsService::new(config, db, qdrant)?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: AfsService) -> Self {
		Self { service: Arc::new(service) }
	}
}
