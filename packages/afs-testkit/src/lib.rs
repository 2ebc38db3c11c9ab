//! Disposable Postgres databases for storage tests.
//!
//! Each [`SearchTestDb`] lives on the server named by `AFS_PG_DSN` and is dropped when the handle
//! is released. Creation fails fast when pgvector is missing, since the cache table needs it.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::runtime::Builder;
use uuid::Uuid;

const DSN_ENV: &str = "AFS_PG_DSN";
const ADMIN_DATABASES: [&str; 2] = ["postgres", "template1"];
const REQUIRED_EXTENSION: &str = "vector";

pub fn env_dsn() -> Option<String> {
	env::var(DSN_ENV).ok().filter(|dsn| !dsn.trim().is_empty())
}

pub struct SearchTestDb {
	name: String,
	dsn: String,
	admin: PgConnectOptions,
	dropped: bool,
}
impl SearchTestDb {
	pub async fn create(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::InvalidDsn { message: err.to_string() })?;
		let (admin, mut conn) = admin_connection(&base).await?;

		require_extension(&mut conn).await?;

		let name = format!("afs_search_{}", Uuid::new_v4().simple());

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str()).await?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin, dropped: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	/// Drops the database now and reports failures instead of logging them from `Drop`.
	pub async fn destroy(mut self) -> Result<()> {
		drop_database(&self.name, &self.admin).await?;

		self.dropped = true;

		Ok(())
	}
}
impl Drop for SearchTestDb {
	fn drop(&mut self) {
		if self.dropped {
			return;
		}

		let name = self.name.clone();
		let admin = self.admin.clone();
		// `Drop` may run inside a runtime, so cleanup gets its own thread and runtime.
		let handle = thread::spawn(move || {
			let result = Builder::new_current_thread()
				.enable_all()
				.build()
				.map_err(|err| err.to_string())
				.and_then(|runtime| {
					runtime.block_on(drop_database(&name, &admin)).map_err(|err| err.to_string())
				});

			if let Err(err) = result {
				eprintln!("Failed to drop test database {name}: {err}");
			}
		});

		let _ = handle.join();
	}
}

async fn admin_connection(base: &PgConnectOptions) -> Result<(PgConnectOptions, PgConnection)> {
	for database in ADMIN_DATABASES {
		let options = base.clone().database(database);

		if let Ok(conn) = PgConnection::connect_with(&options).await {
			return Ok((options, conn));
		}
	}

	Err(Error::NoAdminDatabase { tried: ADMIN_DATABASES.join(", ") })
}

async fn require_extension(conn: &mut PgConnection) -> Result<()> {
	let available: bool = sqlx::query_scalar(
		"SELECT EXISTS (SELECT 1 FROM pg_available_extensions WHERE name = $1)",
	)
	.bind(REQUIRED_EXTENSION)
	.fetch_one(&mut *conn)
	.await?;

	if !available {
		return Err(Error::MissingExtension { name: REQUIRED_EXTENSION.to_string() });
	}

	Ok(())
}

async fn drop_database(name: &str, admin: &PgConnectOptions) -> Result<()> {
	let mut conn = PgConnection::connect_with(admin).await?;

	// Pooled connections from the test may still be open.
	sqlx::query(
		"SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
		 WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.execute(&mut conn)
	.await?;
	conn.execute(format!(r#"DROP DATABASE IF EXISTS "{name}""#).as_str()).await?;

	Ok(())
}
