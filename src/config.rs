//! Where tables are cached and downloaded from

use crate::{
    error::{Error, Result},
    fetch::urls,
    language::Language,
};
use std::{
    env,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};
use url::Url;

/// Download location of the zipped CSV tables.
pub const DEFAULT_BASE_URL: &str = "https://www150.statcan.gc.ca/n1/tbl/csv/";

/// Name of the default cache directory, under the user's home.
pub const CACHE_DIR_NAME: &str = ".statscan_cache";

const CACHE_DIR_VAR: &str = "STATSCAN_CACHE_DIR";
const BASE_URL_VAR: &str = "STATSCAN_BASE_URL";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Cache root used when a call doesn't name its own directory
    pub cache_root: PathBuf,

    /// Directory URL the `<id>-<lang>.zip` names are joined onto
    pub base_url: Url,
}

impl Config {
    /// Configuration with the given default cache root and the public base URL.
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            base_url: default_base_url(),
        }
    }

    /// Replace the base URL. A trailing `/` is added when missing so that
    /// joining a file name keeps the last path segment.
    pub fn with_base_url(mut self, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        self.base_url = base_url;
        self
    }

    /// Read `STATSCAN_CACHE_DIR` and `STATSCAN_BASE_URL`, falling back to
    /// `~/.statscan_cache` and the public download location.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            env::var_os(CACHE_DIR_VAR),
            env::var(BASE_URL_VAR).ok(),
        )
    }

    fn from_vars(cache_dir: Option<OsString>, base_url: Option<String>) -> Result<Self> {
        let cache_root = match cache_dir.filter(|d| !d.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => default_cache_root()?,
        };
        let config = Self::new(cache_root);
        match base_url.filter(|u| !u.trim().is_empty()) {
            Some(url) => Ok(config.with_base_url(Url::parse(url.trim())?)),
            None => Ok(config),
        }
    }

    /// Return `custom` if given, else the configured root, creating it
    /// (and its parents) if needed.
    pub fn resolve_cache_dir(&self, custom: Option<&Path>) -> Result<PathBuf> {
        let dir = custom.unwrap_or(&self.cache_root).to_path_buf();
        fs::create_dir_all(&dir).map_err(Error::io(&dir))?;
        Ok(dir)
    }

    /// Download URL of a table in the given language.
    pub fn table_url(&self, table_id: &str, language: Language) -> Result<Url> {
        urls::table_url(&self.base_url, table_id, language)
    }
}

/// `~/.statscan_cache`
pub fn default_cache_root() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(CACHE_DIR_NAME))
        .ok_or(Error::NoHomeDir)
}

pub(crate) fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL should parse")
}
