//! Batch store backends.
//!
//! Available backends:
//! - `LibsqlStore` - Remote libSQL database (always available)
//! - `MemoryStore` - In-memory storage (always available)
//! - `SqliteStore` - SQLite file-based storage (requires `sqlite` feature)

pub mod libsql;
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use self::libsql::LibsqlStore;
pub use memory::MemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::security::credentials::StoreCredentials;
use crate::traits::store::BatchStore;

/// Open the backend matching the URL scheme.
///
/// - `memory:` gives a fresh [`MemoryStore`]
/// - `sqlite:` gives a [`SqliteStore`] when built with the `sqlite` feature
/// - `libsql://`, `https://` and `http://` give a [`LibsqlStore`]
pub async fn connect(credentials: &StoreCredentials) -> StoreResult<Box<dyn BatchStore>> {
    let url = credentials.url.as_str();

    if url.starts_with("memory:") {
        info!("Using in-memory batch store");
        return Ok(Box::new(MemoryStore::new()));
    }

    if url.starts_with("sqlite:") {
        #[cfg(feature = "sqlite")]
        {
            info!(url = %url, "Using SQLite batch store");
            return Ok(Box::new(SqliteStore::new(url).await?));
        }
        #[cfg(not(feature = "sqlite"))]
        return Err(StoreError::UnsupportedUrl(format!(
            "{url} (built without the sqlite feature)"
        )));
    }

    if credentials.is_remote() {
        info!(url = %url, "Using libSQL batch store");
        return Ok(Box::new(LibsqlStore::new(credentials).await?));
    }

    Err(StoreError::UnsupportedUrl(url.to_string()))
}
