#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Postgres query failed: {0}")]
	Sqlx(#[from] sqlx::Error),
	#[error("Qdrant request failed: {0}")]
	Qdrant(#[from] Box<qdrant_client::QdrantError>),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
}
impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}
