use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::Result;

pub struct Db {
	pub pool: SqlitePool,
}

impl Db {
	pub async fn connect(cfg: &sift_config::Sqlite) -> Result<Self> {
		let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", cfg.path))?
			.create_if_missing(true)
			.journal_mode(SqliteJournalMode::Wal);
		let pool = SqlitePoolOptions::new()
			.max_connections(cfg.pool_max_conns)
			.connect_with(options)
			.await?;
		Ok(Self { pool })
	}

	/// Single-connection in-memory database; a wider pool would hand each
	/// connection its own empty database.
	pub async fn connect_in_memory() -> Result<Self> {
		let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
		let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await?;
		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self) -> Result<()> {
		for statement in crate::schema::SCHEMA_SQL.split(';') {
			let trimmed = statement.trim();
			if trimmed.is_empty() {
				continue;
			}
			sqlx::query(trimmed).execute(&self.pool).await?;
		}
		Ok(())
	}
}
