//! Download, cache and load Statistics Canada data tables.
//!
//! ```no_run
//! use statscan::{get_table, Language};
//!
//! // Labour Force Survey, English
//! let table = get_table("14-10-0287", None, Language::English)?;
//! println!("{}", table.head(5));
//! # Ok::<(), statscan::TableError>(())
//! ```
//!
//! The free functions read their configuration from the environment on each
//! call (see [`Config::from_env`]). Use [`StatCan`] to inject a [`Config`] or
//! a different [`fetch::Transport`].

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod language;
pub mod table;

#[cfg(test)]
mod test_support;

pub use client::StatCan;
pub use config::Config;
pub use error::{Error, Result, TableError};
pub use language::Language;
pub use table::Table;

use std::path::{Path, PathBuf};
use url::Url;

/// Return `custom` if given, else the default cache root, creating it if needed.
pub fn resolve_cache_dir(custom: Option<&Path>) -> Result<PathBuf> {
    match custom {
        Some(dir) => Config::new(dir).resolve_cache_dir(None),
        None => Config::from_env()?.resolve_cache_dir(None),
    }
}

/// Download URL of a table, e.g. `.../14100287-eng.zip` for `14-10-0287`.
pub fn build_url(table_id: &str, language: Language) -> Result<Url> {
    fetch::urls::table_url(&config::default_base_url(), table_id, language)
}

/// Path of the table's cached CSV, downloading it first if needed.
pub fn fetch_table_file(
    table_id: &str,
    cache_dir: Option<&Path>,
    language: Language,
) -> Result<PathBuf> {
    StatCan::from_env()?.fetch_table_file(table_id, cache_dir, language)
}

/// Fetch (if needed) and parse a table.
pub fn get_table(
    table_id: &str,
    cache_dir: Option<&Path>,
    language: Language,
) -> Result<Table, TableError> {
    StatCan::from_env()
        .map_err(|e| TableError::new(table_id, e))?
        .get_table(table_id, cache_dir, language)
}
