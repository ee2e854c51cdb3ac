use crate::{
    cache::{CacheEntry, Manifest},
    config::Config,
    error::{Error, Result, TableError},
    fetch::{zips, Transport},
    language::Language,
    table::Table,
};
use chrono::Utc;
use reqwest::blocking::Client;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};
use url::Url;

/// Fetches tables through a [`Transport`] into a local cache.
pub struct StatCan<T = Client> {
    config: Config,
    transport: T,
}

impl StatCan<Client> {
    pub fn new(config: Config) -> Self {
        Self::with_transport(config, Client::new())
    }

    /// Client configured from `STATSCAN_CACHE_DIR` / `STATSCAN_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(Config::from_env()?))
    }
}

impl<T: Transport> StatCan<T> {
    pub fn with_transport(config: Config, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Return `custom` or the configured root, creating it if needed.
    pub fn resolve_cache_dir(&self, custom: Option<&Path>) -> Result<PathBuf> {
        self.config.resolve_cache_dir(custom)
    }

    pub fn build_url(&self, table_id: &str, language: Language) -> Result<Url> {
        self.config.table_url(table_id, language)
    }

    /// Path of the cached CSV for this table, downloading and extracting it
    /// first if it isn't cached yet.
    ///
    /// An existing file is returned as is, without any network access.
    #[instrument(level = "info", skip(self))]
    pub fn fetch_table_file(
        &self,
        table_id: &str,
        cache_dir: Option<&Path>,
        language: Language,
    ) -> Result<PathBuf> {
        let root = self.resolve_cache_dir(cache_dir)?;
        let entry = CacheEntry::new(&root, table_id, language);
        if entry.is_cached() {
            debug!(path = %entry.csv_path().display(), "cache hit");
            return Ok(entry.csv_path().to_path_buf());
        }

        let _lock = entry.lock()?;
        // Someone else may have filled the entry while we waited.
        if entry.is_cached() {
            debug!(path = %entry.csv_path().display(), "filled while waiting for lock");
            return Ok(entry.csv_path().to_path_buf());
        }

        fs::create_dir_all(entry.dir()).map_err(Error::io(entry.dir()))?;
        let url = self.build_url(table_id, language)?;
        info!(%url, "downloading");
        let (archive, archive_bytes) =
            zips::download_archive(&self.transport, &url, &root, entry.key())?;
        let member = zips::extract_csv(archive.path(), entry.dir(), entry.csv_path(), table_id)?;
        archive.close().map_err(Error::io(&root))?;

        entry.write_manifest(&Manifest {
            table_id: table_id.to_string(),
            language,
            url: url.to_string(),
            member,
            archive_bytes,
            fetched_at: Utc::now(),
        })?;
        info!(path = %entry.csv_path().display(), archive_bytes, "cached");
        Ok(entry.csv_path().to_path_buf())
    }

    /// Fetch (if needed) and parse a table. French tables are read with `;`
    /// as the separator, everything else with `,`.
    #[instrument(level = "info", skip(self))]
    pub fn get_table(
        &self,
        table_id: &str,
        cache_dir: Option<&Path>,
        language: Language,
    ) -> Result<Table, TableError> {
        self.fetch_table_file(table_id, cache_dir, language)
            .and_then(|path| Table::read_csv(&path, language.delimiter()))
            .map_err(|e| TableError::new(table_id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::list_entries,
        test_support::{init_test_logging, zip_bytes, FakeTransport, SAMPLE_CSV},
    };
    use std::thread;
    use tempfile::tempdir;

    fn client(root: &Path, transport: FakeTransport) -> StatCan<FakeTransport> {
        StatCan::with_transport(Config::new(root), transport)
    }

    fn zip_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("zip"))
            .collect()
    }

    #[test]
    fn downloads_extracts_and_cleans_up() {
        init_test_logging();
        let tmp = tempdir().unwrap();
        let statcan = client(
            tmp.path(),
            FakeTransport::ok(zip_bytes(&[("14100287.csv", SAMPLE_CSV)]), 1),
        );

        let path = statcan
            .fetch_table_file("14-10-0287", None, Language::English)
            .unwrap();
        assert_eq!(
            path,
            tmp.path().join("14-10-0287-eng").join("14-10-0287-eng.csv")
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE_CSV);
        assert!(zip_files(tmp.path()).is_empty());
        assert!(zip_files(&tmp.path().join("14-10-0287-eng")).is_empty());
        assert_eq!(
            statcan.transport.urls(),
            ["https://www150.statcan.gc.ca/n1/tbl/csv/14100287-eng.zip"]
        );

        let manifest = CacheEntry::new(tmp.path(), "14-10-0287", Language::English)
            .read_manifest()
            .unwrap()
            .unwrap();
        assert_eq!(manifest.member, "14100287.csv");
        assert_eq!(manifest.language, Language::English);
        assert!(manifest.archive_bytes > 0);

        let listed = list_entries(tmp.path()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "14-10-0287-eng");
        assert_eq!(listed[0].manifest.as_ref(), Some(&manifest));
    }

    #[test]
    fn second_call_is_served_from_cache() {
        let tmp = tempdir().unwrap();
        let statcan = client(
            tmp.path(),
            FakeTransport::ok(zip_bytes(&[("14100287.csv", SAMPLE_CSV)]), 1),
        );

        let first = statcan.get_table("14-10-0287", None, Language::English).unwrap();
        let second = statcan.get_table("14-10-0287", None, Language::English).unwrap();
        assert_eq!(statcan.transport.calls(), 1);
        assert_eq!(first, second);
        assert_eq!(first.shape(), (2, 3));
        assert_eq!(first.column_names(), ["REF_DATE", "GEO", "VALUE"]);
    }

    #[test]
    fn seeded_entry_needs_no_network() {
        let tmp = tempdir().unwrap();
        let entry = CacheEntry::new(tmp.path(), "14-10-0287", Language::English);
        fs::create_dir_all(entry.dir()).unwrap();
        fs::write(entry.csv_path(), SAMPLE_CSV).unwrap();

        let statcan = client(&tmp.path().join("elsewhere"), FakeTransport::offline());
        let table = statcan
            .get_table("14-10-0287", Some(tmp.path()), Language::English)
            .unwrap();
        assert_eq!(table.shape(), (2, 3));
        assert_eq!(statcan.transport.calls(), 0);
    }

    #[test]
    fn french_tables_use_semicolons() {
        let tmp = tempdir().unwrap();
        let content = "a;b;c\n1;2;3\n4;5;6\n";
        for language in [Language::English, Language::French] {
            let entry = CacheEntry::new(tmp.path(), "1", language);
            fs::create_dir_all(entry.dir()).unwrap();
            fs::write(entry.csv_path(), content).unwrap();
        }
        let statcan = client(tmp.path(), FakeTransport::offline());

        let fra = statcan.get_table("1", None, Language::French).unwrap();
        assert_eq!(fra.shape(), (2, 3));
        assert_eq!(fra.column_names(), ["a", "b", "c"]);

        let eng = statcan.get_table("1", None, Language::English).unwrap();
        assert_eq!(eng.shape(), (2, 1));
        assert_eq!(eng.column_names(), ["a;b;c"]);
    }

    #[test]
    fn http_error_names_the_table() {
        let tmp = tempdir().unwrap();
        let statcan = client(tmp.path(), FakeTransport::status(404));

        let err = statcan
            .get_table("invalid-table", None, Language::English)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Error fetching table"), "{msg}");
        assert!(msg.contains("invalid-table"), "{msg}");
        assert_eq!(err.table_id(), "invalid-table");
        assert!(matches!(err.kind(), Error::Status { status: 404, .. }));

        let entry = CacheEntry::new(tmp.path(), "invalid-table", Language::English);
        assert!(!entry.is_cached());
        assert!(zip_files(tmp.path()).is_empty());
    }

    #[test]
    fn archive_without_csv_fails_and_leaves_no_archive() {
        let tmp = tempdir().unwrap();
        let statcan = client(
            tmp.path(),
            FakeTransport::ok(zip_bytes(&[("README.txt", "nothing here")]), 1),
        );

        let err = statcan
            .get_table("14-10-0287", None, Language::French)
            .unwrap_err();
        assert!(matches!(err.kind(), Error::NoCsvMember { .. }));
        assert!(err.to_string().contains("14-10-0287"));
        assert!(zip_files(tmp.path()).is_empty());
    }

    #[test]
    fn concurrent_misses_download_once() {
        let tmp = tempdir().unwrap();
        let statcan = client(
            tmp.path(),
            FakeTransport::ok(zip_bytes(&[("14100287.csv", SAMPLE_CSV)]), 1),
        );

        let paths: Vec<PathBuf> = thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    s.spawn(|| {
                        statcan
                            .fetch_table_file("14-10-0287", None, Language::English)
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(statcan.transport.calls(), 1);
        assert!(paths.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(fs::read_to_string(&paths[0]).unwrap(), SAMPLE_CSV);
    }
}
