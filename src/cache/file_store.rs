//! Directory-backed durable store: one JSON file per key

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::store::DurableStore;
use crate::error::StoreError;

const ENTRY_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// Longest encoded key used directly as a file name. Leaves room for the
/// temp-file suffix under the usual 255-byte name limit.
const MAX_ENCODED_NAME_LEN: usize = 200;

/// Marks digest-named entries. `encode_key` never emits `~`.
const HASHED_PREFIX: char = '~';

/// Distinguishes temp files of concurrent writers within one process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Where a key lives on disk
enum EntryName {
    /// `<encoded key>.json`, contents are the value
    Plain(String),
    /// `~<sha256 of encoded key>.json`, contents are `<encoded key>\n<value>`
    Hashed { stem: String, encoded: String },
}

impl EntryName {
    fn for_key(key: &str) -> Self {
        let encoded = encode_key(key);
        if encoded.len() <= MAX_ENCODED_NAME_LEN {
            return Self::Plain(encoded);
        }
        let mut hasher = Sha256::new();
        hasher.update(encoded.as_bytes());
        let stem = format!("{HASHED_PREFIX}{}", hex::encode(hasher.finalize()));
        Self::Hashed { stem, encoded }
    }

    fn stem(&self) -> &str {
        match self {
            Self::Plain(stem) | Self::Hashed { stem, .. } => stem,
        }
    }
}

/// Stores each key as `<dir>/<encoded key>.json`.
///
/// Keys are percent-encoded so any string maps to a portable file name.
/// Keys whose encoding is too long for a file name are stored under a
/// SHA-256 digest, with the encoded key kept on the first line of the file.
/// Every write goes to its own temporary file that is renamed into place,
/// so concurrent writers to one key never interleave and the last rename wins.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
        }
        debug!("Opened file store at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, name: &EntryName) -> PathBuf {
        self.dir.join(format!("{}.{ENTRY_EXTENSION}", name.stem()))
    }

    fn temp_path(&self, name: &EntryName) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            "{}.{}.{n}.{TEMP_EXTENSION}",
            name.stem(),
            std::process::id()
        ))
    }

    /// Recovers the caller key of a `.json` file, reading hashed entries' headers
    async fn key_of(&self, path: &Path, stem: &str) -> Result<Option<String>, StoreError> {
        if !stem.starts_with(HASHED_PREFIX) {
            return Ok(decode_key(stem));
        }
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            // Removed between listing and reading
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };
        Ok(split_header(&bytes)
            .and_then(|(header, _)| std::str::from_utf8(header).ok())
            .and_then(decode_key))
    }
}

/// Splits a hashed entry into its key header and value
fn split_header(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let newline = bytes.iter().position(|&b| b == b'\n')?;
    Some((&bytes[..newline], &bytes[newline + 1..]))
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::Io(e)),
    }
}

impl DurableStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let name = EntryName::for_key(key);
        let Some(bytes) = read_optional(&self.entry_path(&name)).await? else {
            return Ok(None);
        };

        match &name {
            EntryName::Plain(_) => Ok(Some(bytes)),
            EntryName::Hashed { encoded, .. } => match split_header(&bytes) {
                Some((header, value)) if header == encoded.as_bytes() => Ok(Some(value.to_vec())),
                _ => {
                    warn!("Hashed entry for {} belongs to another key", key);
                    Ok(None)
                }
            },
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let name = EntryName::for_key(key);
        let path = self.entry_path(&name);
        let temp_path = self.temp_path(&name);

        let written: std::io::Result<()> = async {
            let mut file = fs::File::create(&temp_path).await?;
            if let EntryName::Hashed { encoded, .. } = &name {
                file.write_all(encoded.as_bytes()).await?;
                file.write_all(b"\n").await?;
            }
            file.write_all(&value).await?;
            file.flush().await?;
            drop(file);
            fs::rename(&temp_path, &path).await
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&temp_path).await
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                warn!("Could not remove temp file {}: {}", temp_path.display(), cleanup);
            }
            return Err(StoreError::Io(e));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.entry_path(&EntryName::for_key(key))).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut dir = fs::read_dir(&self.dir).await?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.key_of(&path, stem).await? {
                Some(key) => keys.push(key),
                None => warn!("Skipping unrecognised file in store: {}", path.display()),
            }
        }

        Ok(keys)
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), StoreError> {
        for key in keys {
            self.delete(key).await?;
        }
        Ok(())
    }
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-'
}

/// Percent-encodes every byte outside `[A-Za-z0-9_-]`.
pub(crate) fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for &byte in key.as_bytes() {
        if is_unreserved(byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Reverses [`encode_key`]. Returns `None` for names this store did not produce.
pub(crate) fn decode_key(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = encoded.get(i + 1..i + 3)?;
                decoded.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            byte if is_unreserved(byte) => {
                decoded.push(byte);
                i += 1;
            }
            _ => return None,
        }
    }

    String::from_utf8(decoded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_key_encoding() {
        assert_eq!(encode_key("sports_cache_match_42"), "sports_cache_match_42");
        assert_eq!(encode_key("nfl/scoreboard?week=3"), "nfl%2Fscoreboard%3Fweek%3D3");
        assert_eq!(encode_key("a.b"), "a%2Eb");

        for key in ["sports_cache_match_42", "nfl/scoreboard?week=3", "jääkiekko ottelu"] {
            assert_eq!(decode_key(&encode_key(key)).as_deref(), Some(key));
        }
    }

    #[test]
    fn test_decode_rejects_foreign_names() {
        assert_eq!(decode_key("has space"), None);
        assert_eq!(decode_key("trailing%2"), None);
        assert_eq!(decode_key("bad%ZZ"), None);
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path().join("nested").join("store");

        let store = FileStore::open(&dir).await.unwrap();
        assert!(dir.exists());
        assert_eq!(store.dir(), dir.as_path());
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let temp_dir = tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).await.unwrap();

        assert!(store.get("nba/scoreboard").await.unwrap().is_none());
        store.set("nba/scoreboard", b"{}".to_vec()).await.unwrap();
        assert_eq!(store.get("nba/scoreboard").await.unwrap(), Some(b"{}".to_vec()));

        store.delete("nba/scoreboard").await.unwrap();
        assert!(store.get("nba/scoreboard").await.unwrap().is_none());

        // Deleting a missing key is not an error
        store.delete("nba/scoreboard").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_keys_skips_temp_and_foreign_files() {
        let temp_dir = tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).await.unwrap();

        store.set("sports_cache_a", b"1".to_vec()).await.unwrap();
        store.set("other key", b"2".to_vec()).await.unwrap();
        std::fs::write(temp_dir.path().join("leftover.tmp"), b"x").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), b"x").unwrap();

        let mut keys = store.list_keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["other key", "sports_cache_a"]);
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let temp_dir = tempdir().unwrap();
        {
            let store = FileStore::open(temp_dir.path()).await.unwrap();
            store.set("sports_cache_standings", b"[1,2]".to_vec()).await.unwrap();
        }

        let reopened = FileStore::open(temp_dir.path()).await.unwrap();
        assert_eq!(
            reopened.get("sports_cache_standings").await.unwrap(),
            Some(b"[1,2]".to_vec())
        );
    }

    #[tokio::test]
    async fn test_delete_many() {
        let temp_dir = tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).await.unwrap();
        for key in ["a", "b", "c"] {
            store.set(key, Vec::new()).await.unwrap();
        }

        store
            .delete_many(&["a".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(store.list_keys().await.unwrap(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_long_keys_use_hashed_names() {
        let temp_dir = tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).await.unwrap();
        let key = format!(
            "sports_cache_https://site.api.espn.com/scoreboard?dates=20250101&groups={}",
            "80,".repeat(100)
        );
        assert!(key.len() > 300);

        store.set(&key, b"{\"events\":[]}".to_vec()).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some(b"{\"events\":[]}".to_vec()));
        assert_eq!(store.list_keys().await.unwrap(), vec![key.clone()]);

        let names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with('~'));
        assert!(names[0].len() < 255);

        // A different long key never reads another key's file
        let other = format!("{key}&page=2");
        assert!(store.get(&other).await.unwrap().is_none());

        store.delete(&key).await.unwrap();
        assert!(store.get(&key).await.unwrap().is_none());
        assert!(store.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_to_one_key_stay_whole() {
        let temp_dir = tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).await.unwrap();
        let large = vec![b'a'; 200_000];
        let small = b"{\"ok\":1}".to_vec();

        for _ in 0..50 {
            let first = tokio::spawn({
                let store = store.clone();
                let value = large.clone();
                async move { store.set("sports_cache_live", value).await }
            });
            let second = tokio::spawn({
                let store = store.clone();
                let value = small.clone();
                async move { store.set("sports_cache_live", value).await }
            });

            first.await.unwrap().unwrap();
            second.await.unwrap().unwrap();

            let stored = store.get("sports_cache_live").await.unwrap().unwrap();
            assert!(stored == large || stored == small);
        }

        // No temp files are left behind
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }
}
