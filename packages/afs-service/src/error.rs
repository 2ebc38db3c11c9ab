pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Retrieval failed: {message}")]
	Retrieval { message: String },
	#[error("Search exceeded its {timeout_ms} ms deadline.")]
	Timeout { timeout_ms: u64 },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Qdrant error: {message}")]
	Qdrant { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<afs_storage::Error> for Error {
	fn from(err: afs_storage::Error) -> Self {
		match err {
			afs_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			afs_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			afs_storage::Error::Qdrant(inner) => Self::Qdrant { message: inner.to_string() },
		}
	}
}

impl From<afs_providers::Error> for Error {
	fn from(err: afs_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
