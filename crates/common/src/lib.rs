#[cfg(test)]
mod tests;

pub mod pretty;

use std::path::PathBuf;
use thiserror::Error;

/// Logical page number within a page file.
///
/// Examples:
/// - `let first: PageNumber = 0;`
/// - `let sentinel: PageNumber = NO_PAGE;`
/// - `let tenth: PageNumber = 9;`
pub type PageNumber = i64;

/// Sentinel value marking "no page" — used by an empty buffer pool frame.
pub const NO_PAGE: PageNumber = -1;

/// Replacement policy a buffer pool selects victims with.
///
/// `LruK` is accepted for source compatibility with the original enum but is
/// treated identically to `Lru` (see DESIGN.md — no K-distance tracking is
/// implemented).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ReplacementStrategy {
    Fifo,
    Lru,
    LruK,
}

impl ReplacementStrategy {
    /// Normalizes `LruK` down to `Lru`; all other variants pass through unchanged.
    pub fn normalized(self) -> Self {
        match self {
            Self::LruK => Self::Lru,
            other => other,
        }
    }
}

/// Canonical error type shared across the storage and buffer layers.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("file handle not initialized: {0}")]
    FileHandleNotInit(String),
    #[error("write failed: {0}")]
    WriteFailed(String),
    #[error("read failed: {0}")]
    ReadNonExistingPage(String),
    #[error("no free buffer frame available: {0}")]
    NoFreeBuffer(String),
}

/// Result alias that carries a `DbError`.
pub type DbResult<T> = Result<T, DbError>;

/// Runtime configuration for embedding this page store.
///
/// # Example
/// ```
/// use common::{Config, ReplacementStrategy};
/// use std::path::PathBuf;
///
/// let config = Config::builder()
///     .data_dir(PathBuf::from("./my_db"))
///     .buffer_pool_pages(64)
///     .replacement_strategy(ReplacementStrategy::Lru)
///     .build();
/// ```
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, bon::Builder)]
pub struct Config {
    /// Directory where page files live.
    #[builder(default = PathBuf::from("./db_data"))]
    pub data_dir: PathBuf,
    /// Number of frames the buffer pool keeps resident.
    #[builder(default = 256)]
    pub buffer_pool_pages: usize,
    /// Replacement policy the buffer pool uses by default.
    #[builder(default = ReplacementStrategy::Lru)]
    pub replacement_strategy: ReplacementStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./db_data"),
            buffer_pool_pages: 256,
            replacement_strategy: ReplacementStrategy::Lru,
        }
    }
}

/// Convenient re-exports for downstream crates.
pub mod prelude {
    pub use crate::{Config, DbError, DbResult, NO_PAGE, PageNumber, ReplacementStrategy};
}
