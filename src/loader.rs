use std::collections::HashMap;
use std::sync::Arc;

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::domain::DatasetKey;
use crate::error::SitisError;
use crate::graph::RemoteSource;
use crate::table::{self, Table};

#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub dataset: String,
    pub file: &'static str,
    pub rows: usize,
}

pub struct DatasetLoader<R: RemoteSource> {
    remote: R,
    cache: CacheStore,
    data_dir: Utf8PathBuf,
    loaded: HashMap<DatasetKey, Arc<Table>>,
}

impl<R: RemoteSource> DatasetLoader<R> {
    pub fn new(remote: R, cache: CacheStore, data_dir: Utf8PathBuf) -> Self {
        Self {
            remote,
            cache,
            data_dir,
            loaded: HashMap::new(),
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn load(&mut self, key: DatasetKey) -> Result<Arc<Table>, SitisError> {
        if let Some(table) = self.loaded.get(&key) {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(self.load_uncached(key)?);
        self.loaded.insert(key, Arc::clone(&table));
        Ok(table)
    }

    pub fn load_summary(&mut self, key: DatasetKey) -> Result<LoadSummary, SitisError> {
        let table = self.load(key)?;
        Ok(LoadSummary {
            dataset: key.to_string(),
            file: key.file_name(),
            rows: table.len(),
        })
    }

    fn load_uncached(&self, key: DatasetKey) -> Result<Table, SitisError> {
        let file_name = key.file_name();
        let options = key.parse_options();

        if let Some(bytes) = self.remote.fetch(file_name) {
            // The cache write is best-effort; the just-fetched bytes are
            // parsed either way.
            if let Err(err) = self.cache.put(file_name, &bytes) {
                warn!(file_name, %err, "cache write failed");
            }
            info!(%key, "loaded from sharepoint");
            return table::parse_csv(&bytes, file_name, &options);
        }

        if let Some(path) = self.cache.get(file_name) {
            info!(%key, %path, "loaded from cache");
            return table::parse_csv_path(&path, file_name, &options);
        }

        let local = self.data_dir.join(file_name);
        match std::fs::read(local.as_std_path()) {
            Ok(bytes) => {
                info!(%key, path = %local, "loaded from local file");
                table::parse_csv(&bytes, file_name, &options)
            }
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %local, %err, "local file unreadable");
                }
                Err(SitisError::DatasetUnavailable(key))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use assert_matches::assert_matches;
    use camino::Utf8PathBuf;

    use super::*;
    use crate::graph::DisabledRemote;

    struct CountingRemote {
        payload: Option<Vec<u8>>,
        calls: Cell<usize>,
    }

    impl RemoteSource for CountingRemote {
        fn fetch(&self, _file_name: &str) -> Option<Vec<u8>> {
            self.calls.set(self.calls.get() + 1);
            self.payload.clone()
        }
    }

    fn loader_in<R: RemoteSource>(
        temp: &tempfile::TempDir,
        remote: R,
    ) -> DatasetLoader<R> {
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let cache = CacheStore::new(root.join("cache"));
        DatasetLoader::new(remote, cache, root.join("data"))
    }

    const CATALOG: &str = "ID_ACTXPROG,DES_ACTXPROG\n10,ATENCIï¿½N MEDICA\n20,VACUNACION\n";

    #[test]
    fn load_memoizes_and_fetches_once() {
        let temp = tempfile::tempdir().unwrap();
        let remote = CountingRemote {
            payload: Some(CATALOG.as_bytes().to_vec()),
            calls: Cell::new(0),
        };
        let mut loader = loader_in(&temp, remote);

        let first = loader.load(DatasetKey::ActivityCatalog).unwrap();
        let second = loader.load(DatasetKey::ActivityCatalog).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.remote.calls.get(), 1);
    }

    #[test]
    fn failed_load_leaves_no_memo_entry() {
        let temp = tempfile::tempdir().unwrap();
        let mut loader = loader_in(&temp, DisabledRemote);

        let err = loader.load(DatasetKey::ActivityCatalog).unwrap_err();
        assert_matches!(err, SitisError::DatasetUnavailable(DatasetKey::ActivityCatalog));
        assert!(loader.loaded.is_empty());
        assert!(loader.cache.get("ACTXPROG.csv").is_none());
    }
}
