pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("AFS_PG_DSN is not a valid Postgres DSN: {message}")]
	InvalidDsn { message: String },
	#[error("No admin database ({tried}) accepted a connection.")]
	NoAdminDatabase { tried: String },
	#[error("The server does not offer the `{name}` extension.")]
	MissingExtension { name: String },
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
}
