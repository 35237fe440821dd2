//! Error type for `copd-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A stored enum tag or artefact payload no longer decodes.
  #[error("core error: {0}")]
  Core(#[from] copd_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
