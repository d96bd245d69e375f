use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::SitisError;

#[derive(Debug, Clone)]
pub struct CacheStore {
    root: Utf8PathBuf,
}

impl CacheStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn entry_path(&self, file_name: &str) -> Utf8PathBuf {
        self.root.join(file_name)
    }

    pub fn put(&self, file_name: &str, bytes: &[u8]) -> Result<(), SitisError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| SitisError::CacheWrite(format!("create {}: {err}", self.root)))?;
        let target = self.entry_path(file_name);
        let tmp = tempfile::Builder::new()
            .prefix(file_name)
            .suffix(".tmp")
            .tempfile_in(self.root.as_std_path())
            .map_err(|err| SitisError::CacheWrite(err.to_string()))?;
        fs::write(tmp.path(), bytes).map_err(|err| SitisError::CacheWrite(err.to_string()))?;
        tmp.persist(target.as_std_path())
            .map_err(|err| SitisError::CacheWrite(err.to_string()))?;
        Ok(())
    }

    pub fn get(&self, file_name: &str) -> Option<Utf8PathBuf> {
        let path = self.entry_path(file_name);
        path.as_std_path().is_file().then_some(path)
    }

    pub fn clear(&self) -> Result<(), SitisError> {
        if self.root.as_std_path().exists() {
            fs::remove_dir_all(self.root.as_std_path())
                .map_err(|err| SitisError::Filesystem(format!("clear {}: {err}", self.root)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(temp: &tempfile::TempDir) -> CacheStore {
        let root = Utf8PathBuf::from_path_buf(temp.path().join("cache")).unwrap();
        CacheStore::new(root)
    }

    #[test]
    fn put_then_get() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_in(&temp);
        assert!(store.get("DAT_PER.csv").is_none());

        store.put("DAT_PER.csv", b"a,b\n1,2\n").unwrap();
        let path = store.get("DAT_PER.csv").unwrap();
        assert_eq!(std::fs::read(path.as_std_path()).unwrap(), b"a,b\n1,2\n");
    }

    #[test]
    fn put_overwrites_previous_entry() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_in(&temp);
        store.put("f.csv", b"old").unwrap();
        store.put("f.csv", b"new").unwrap();
        let path = store.get("f.csv").unwrap();
        assert_eq!(std::fs::read(path.as_std_path()).unwrap(), b"new");
    }

    #[test]
    fn put_leaves_no_temp_files_behind() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_in(&temp);
        store.put("f.csv", b"data").unwrap();
        let entries: Vec<_> = std::fs::read_dir(store.root().as_std_path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["f.csv".to_string()]);
    }

    #[test]
    fn clear_removes_everything() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_in(&temp);
        store.put("f.csv", b"data").unwrap();
        store.clear().unwrap();
        assert!(store.get("f.csv").is_none());
        // clearing an already-empty cache is fine
        store.clear().unwrap();
    }
}
