//! Storage for the set of permanently hidden structure-feature keys.
//!
//! The set is always read once and written in full; stores never merge.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const SNAPSHOT_VERSION: u32 = 1;

/// On-disk form of the hidden set. `BTreeSet` keeps the JSON stable.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenKeySnapshot {
    pub version: u32,
    pub keys: BTreeSet<String>,
}

impl HiddenKeySnapshot {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            version: SNAPSHOT_VERSION,
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    Corrupt(String),
    Io(String),
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistError::Corrupt(msg) => write!(f, "hidden key storage corrupt: {msg}"),
            PersistError::Io(msg) => write!(f, "hidden key storage error: {msg}"),
        }
    }
}

impl std::error::Error for PersistError {}

pub trait HiddenKeyStore {
    fn load(&self) -> Result<Vec<String>, PersistError>;
    /// Replaces the stored set with `keys`.
    fn save(&mut self, keys: &[String]) -> Result<(), PersistError>;
}

/// Sorted and deduplicated, dropping empty keys.
pub fn normalize_keys(keys: impl IntoIterator<Item = String>) -> Vec<String> {
    let set: BTreeSet<String> = keys.into_iter().filter(|k| !k.is_empty()).collect();
    set.into_iter().collect()
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryHiddenKeyStore {
    keys: Vec<String>,
    saves: usize,
}

impl InMemoryHiddenKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: normalize_keys(keys.into_iter().map(Into::into)),
            saves: 0,
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Number of `save` calls so far.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl HiddenKeyStore for InMemoryHiddenKeyStore {
    fn load(&self) -> Result<Vec<String>, PersistError> {
        Ok(self.keys.clone())
    }

    fn save(&mut self, keys: &[String]) -> Result<(), PersistError> {
        self.keys = normalize_keys(keys.iter().cloned());
        self.saves += 1;
        Ok(())
    }
}

type LoadHook = Box<dyn Fn() -> Vec<String>>;
type SaveHook = Box<dyn FnMut(&[String])>;

/// Adapts a host's read/write callbacks. Either hook may be absent: a missing
/// reader yields an empty set and a missing writer drops updates.
#[derive(Default)]
pub struct HookHiddenKeyStore {
    load: Option<LoadHook>,
    save: Option<SaveHook>,
}

impl HookHiddenKeyStore {
    pub fn new(
        load: impl Fn() -> Vec<String> + 'static,
        save: impl FnMut(&[String]) + 'static,
    ) -> Self {
        Self {
            load: Some(Box::new(load)),
            save: Some(Box::new(save)),
        }
    }

    pub fn with_load(mut self, load: impl Fn() -> Vec<String> + 'static) -> Self {
        self.load = Some(Box::new(load));
        self
    }

    pub fn with_save(mut self, save: impl FnMut(&[String]) + 'static) -> Self {
        self.save = Some(Box::new(save));
        self
    }
}

impl std::fmt::Debug for HookHiddenKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookHiddenKeyStore")
            .field("load", &self.load.is_some())
            .field("save", &self.save.is_some())
            .finish()
    }
}

impl HiddenKeyStore for HookHiddenKeyStore {
    fn load(&self) -> Result<Vec<String>, PersistError> {
        Ok(self
            .load
            .as_ref()
            .map(|hook| normalize_keys(hook()))
            .unwrap_or_default())
    }

    fn save(&mut self, keys: &[String]) -> Result<(), PersistError> {
        match self.save.as_mut() {
            Some(hook) => hook(keys),
            None => tracing::debug!(count = keys.len(), "no save hook; hidden keys not persisted"),
        }
        Ok(())
    }
}

/// Versioned JSON snapshot on disk. A missing or blank file is an empty set.
#[derive(Debug, Clone)]
pub struct JsonFileHiddenKeyStore {
    path: PathBuf,
}

impl JsonFileHiddenKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_snapshot(&self) -> Result<HiddenKeySnapshot, PersistError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HiddenKeySnapshot::new(Vec::<String>::new()));
            }
            Err(e) => return Err(PersistError::Io(format!("read {:?}: {e}", self.path))),
        };
        if raw.trim().is_empty() {
            return Ok(HiddenKeySnapshot::new(Vec::<String>::new()));
        }

        let snap = serde_json::from_str::<HiddenKeySnapshot>(&raw)
            .map_err(|e| PersistError::Corrupt(e.to_string()))?;
        if snap.version != SNAPSHOT_VERSION {
            return Err(PersistError::Corrupt(format!(
                "unsupported snapshot version {}",
                snap.version
            )));
        }
        Ok(snap)
    }
}

impl HiddenKeyStore for JsonFileHiddenKeyStore {
    fn load(&self) -> Result<Vec<String>, PersistError> {
        let snap = self.load_snapshot()?;
        Ok(normalize_keys(snap.keys))
    }

    fn save(&mut self, keys: &[String]) -> Result<(), PersistError> {
        let snap = HiddenKeySnapshot::new(normalize_keys(keys.iter().cloned()));
        let raw = serde_json::to_string_pretty(&snap).map_err(|e| PersistError::Io(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PersistError::Io(format!("create {parent:?}: {e}")))?;
        }
        // Write next to the target and rename so readers never see half a file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).map_err(|e| PersistError::Io(format!("write {tmp:?}: {e}")))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| PersistError::Io(format!("rename {tmp:?}: {e}")))?;
        tracing::debug!(path = ?self.path, count = snap.keys.len(), "hidden keys saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        HiddenKeySnapshot, HiddenKeyStore, HookHiddenKeyStore, InMemoryHiddenKeyStore,
        JsonFileHiddenKeyStore, PersistError, normalize_keys,
    };
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn keys(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_sorts_dedups_and_drops_empty() {
        assert_eq!(
            normalize_keys(keys(&["b", "", "a", "b"])),
            keys(&["a", "b"])
        );
    }

    #[test]
    fn in_memory_replaces_in_full() {
        let mut store = InMemoryHiddenKeyStore::with_keys(["id:1", "id:2"]);
        store.save(&keys(&["id:3"])).unwrap();
        assert_eq!(store.load().unwrap(), keys(&["id:3"]));
        assert_eq!(store.saves(), 1);
    }

    #[test]
    fn hooks_are_called_with_the_full_set() {
        let written = Rc::new(RefCell::new(Vec::new()));
        let w = Rc::clone(&written);
        let mut store = HookHiddenKeyStore::new(
            || vec!["x".to_string(), "x".to_string(), "a".to_string()],
            move |k: &[String]| w.borrow_mut().push(k.to_vec()),
        );
        assert_eq!(store.load().unwrap(), keys(&["a", "x"]));

        store.save(&keys(&["a", "b"])).unwrap();
        assert_eq!(*written.borrow(), vec![keys(&["a", "b"])]);
    }

    #[test]
    fn missing_hooks_degrade_quietly() {
        let mut store = HookHiddenKeyStore::default();
        assert!(store.load().unwrap().is_empty());
        store.save(&keys(&["a"])).unwrap();
    }

    #[test]
    fn file_store_round_trips_and_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileHiddenKeyStore::new(dir.path().join("nested").join("hidden.json"));
        assert!(store.load().unwrap().is_empty());

        store.save(&keys(&["identificatie:NL.2", "identificatie:NL.1"])).unwrap();
        let reopened = JsonFileHiddenKeyStore::new(store.path());
        assert_eq!(
            reopened.load().unwrap(),
            keys(&["identificatie:NL.1", "identificatie:NL.2"])
        );
        assert_eq!(
            reopened.load_snapshot().unwrap(),
            HiddenKeySnapshot::new(["identificatie:NL.1", "identificatie:NL.2"])
        );
    }

    #[test]
    fn file_store_rejects_garbage_and_unknown_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hidden.json");

        std::fs::write(&path, "{not json").unwrap();
        let store = JsonFileHiddenKeyStore::new(&path);
        assert!(matches!(store.load(), Err(PersistError::Corrupt(_))));

        std::fs::write(&path, r#"{"version": 99, "keys": []}"#).unwrap();
        assert!(matches!(store.load(), Err(PersistError::Corrupt(_))));

        std::fs::write(&path, "  \n").unwrap();
        assert!(store.load().unwrap().is_empty());
    }
}
