//! Keyword -> responses map, mirrored one file per keyword in the data directory.
//!
//! Each file is named exactly as its keyword and holds one response per line.

use regex::Regex;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("data path {} exists but is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to access data directory {}: {source}", path.display())]
    DataDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write data file {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to delete data file {}: {source}", path.display())]
    FileRemove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("already in the list")]
    Duplicate,

    #[error("no item with id {0}")]
    InvalidId(usize),

    #[error("keyword `{0}` does not exist")]
    UnknownKeyword(String),

    #[error("`{0}` cannot be used as a keyword")]
    InvalidKeyword(String),

    #[error("items must be a single non-empty line")]
    InvalidItem,

    #[error("failed to build trigger pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result of a mutation that was applied in memory. `write_error` is set when
/// the data file could not be brought in line; the in-memory change stands.
#[derive(Debug)]
pub struct Persisted<T> {
    pub outcome: T,
    pub write_error: Option<StoreError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Created,
    Appended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    RemovedItem,
    RemovedKeyword,
}

struct KeywordEntry {
    responses: Vec<String>,
    trigger: Regex,
}

pub struct KeywordStore {
    data_dir: PathBuf,
    items: BTreeMap<String, KeywordEntry>,
}

impl KeywordStore {
    /// Creates an empty store bound to `data_dir`. Call [`reload`](Self::reload)
    /// to pull in what is on disk.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into(), items: BTreeMap::new() }
    }

    /// Discards the in-memory map and rebuilds it from the data directory.
    ///
    /// On error the store is left empty.
    pub async fn reload(&mut self) -> StoreResult<()> {
        self.items.clear();
        self.items = load_dir(&self.data_dir).await?;

        tracing::info!(
            count = self.items.len(),
            "Loaded keywords: {}",
            self.list_keywords().join(", ")
        );
        Ok(())
    }

    /// All keywords in lexicographic order.
    pub fn list_keywords(&self) -> Vec<&str> {
        self.items.keys().map(String::as_str).collect()
    }

    pub fn list_responses(&self, keyword: &str) -> StoreResult<&[String]> {
        self.items
            .get(keyword)
            .map(|entry| entry.responses.as_slice())
            .ok_or_else(|| StoreError::UnknownKeyword(keyword.to_string()))
    }

    /// First keyword (in listing order) whose `!keyword` trigger appears in
    /// `text` as a standalone token. Keywords without responses never match.
    pub fn find_trigger(&self, text: &str) -> Option<(&str, &[String])> {
        self.items
            .iter()
            .find(|(_, entry)| !entry.responses.is_empty() && entry.trigger.is_match(text))
            .map(|(keyword, entry)| (keyword.as_str(), entry.responses.as_slice()))
    }

    pub async fn add(&mut self, keyword: &str, item: &str) -> StoreResult<Persisted<AddOutcome>> {
        validate_keyword(keyword)?;
        if item.is_empty() || item.contains(['\n', '\r']) {
            return Err(StoreError::InvalidItem);
        }

        let outcome = match self.items.get_mut(keyword) {
            Some(entry) => {
                if entry.responses.iter().any(|r| r == item) {
                    return Err(StoreError::Duplicate);
                }
                entry.responses.push(item.to_string());
                AddOutcome::Appended
            }
            None => {
                let trigger = trigger_pattern(keyword)?;
                self.items.insert(
                    keyword.to_string(),
                    KeywordEntry { responses: vec![item.to_string()], trigger },
                );
                AddOutcome::Created
            }
        };

        let write_error = self.persist(keyword).await.err();
        Ok(Persisted { outcome, write_error })
    }

    /// Removes the item at `id`. The last item takes its slot, so ids of the
    /// other items may change. Removing the only item drops the keyword and
    /// its data file.
    pub async fn remove(&mut self, keyword: &str, id: usize) -> StoreResult<Persisted<RemoveOutcome>> {
        let entry = self
            .items
            .get_mut(keyword)
            .ok_or_else(|| StoreError::UnknownKeyword(keyword.to_string()))?;

        if id >= entry.responses.len() {
            return Err(StoreError::InvalidId(id));
        }

        if entry.responses.len() == 1 {
            self.items.remove(keyword);

            let path = self.file_path(keyword);
            let write_error = match fs::remove_file(&path).await {
                Ok(()) => None,
                Err(source) if source.kind() == io::ErrorKind::NotFound => None,
                Err(source) => {
                    tracing::error!(path = %path.display(), error = %source, "Failed to delete data file");
                    Some(StoreError::FileRemove { path, source })
                }
            };
            return Ok(Persisted { outcome: RemoveOutcome::RemovedKeyword, write_error });
        }

        entry.responses.swap_remove(id);

        let write_error = self.persist(keyword).await.err();
        Ok(Persisted { outcome: RemoveOutcome::RemovedItem, write_error })
    }

    async fn persist(&self, keyword: &str) -> StoreResult<()> {
        let Some(entry) = self.items.get(keyword) else {
            return Ok(());
        };

        let path = self.file_path(keyword);
        if let Err(source) = fs::write(&path, entry.responses.join("\n")).await {
            tracing::error!(path = %path.display(), error = %source, "Failed to write out to data file");
            return Err(StoreError::FileWrite { path, source });
        }
        Ok(())
    }

    fn file_path(&self, keyword: &str) -> PathBuf {
        self.data_dir.join(keyword)
    }
}

/// Keywords added from chat double as a file name and as a whitespace-delimited
/// token. Files placed in the data directory by hand are loaded as named.
fn validate_keyword(keyword: &str) -> StoreResult<()> {
    let invalid = keyword.is_empty()
        || keyword == "."
        || keyword == ".."
        || keyword.chars().any(|c| matches!(c, '/' | '\\' | '\0') || c.is_whitespace());

    if invalid {
        return Err(StoreError::InvalidKeyword(keyword.to_string()));
    }
    Ok(())
}

fn trigger_pattern(keyword: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(^|\s)!{}($|\s)", regex::escape(keyword)))
}

fn parse_lines(content: &str) -> Vec<String> {
    content.lines().filter(|line| !line.is_empty()).map(str::to_string).collect()
}

async fn load_dir(dir: &Path) -> StoreResult<BTreeMap<String, KeywordEntry>> {
    let mut items = BTreeMap::new();
    let dir_error = |source: io::Error| StoreError::DataDir { path: dir.to_path_buf(), source };

    match fs::metadata(dir).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!(path = %dir.display(), "Data directory missing, creating it");
            fs::create_dir_all(dir).await.map_err(dir_error)?;
            return Ok(items);
        }
        Err(e) => return Err(dir_error(e)),
        Ok(meta) if !meta.is_dir() => return Err(StoreError::NotADirectory(dir.to_path_buf())),
        Ok(_) => {}
    }

    let mut entries = fs::read_dir(dir).await.map_err(dir_error)?;
    while let Some(entry) = entries.next_entry().await.map_err(dir_error)? {
        let path = entry.path();

        let Some(keyword) = entry.file_name().to_str().map(str::to_string) else {
            tracing::warn!(path = %path.display(), "Skipping data file with a non UTF-8 name");
            continue;
        };
        if matches!(entry.file_type().await, Ok(ft) if ft.is_dir()) {
            tracing::warn!(path = %path.display(), "Skipping directory inside data directory");
            continue;
        }

        let responses = match fs::read_to_string(&path).await {
            Ok(content) => parse_lines(&content),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to read data file");
                Vec::new()
            }
        };

        let trigger = trigger_pattern(&keyword)?;
        items.insert(keyword, KeywordEntry { responses, trigger });
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn loaded(dir: &TempDir) -> KeywordStore {
        let mut store = KeywordStore::new(dir.path());
        store.reload().await.unwrap();
        store
    }

    #[tokio::test]
    async fn missing_directory_is_created_empty() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");

        let mut store = KeywordStore::new(&data);
        store.reload().await.unwrap();

        assert!(data.is_dir());
        assert!(store.list_keywords().is_empty());
    }

    #[tokio::test]
    async fn file_in_place_of_directory_is_a_configuration_error() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        std::fs::write(&data, "oops").unwrap();

        let mut store = KeywordStore::new(&data);
        store.add("k", "a").await.ok();
        let err = store.reload().await.unwrap_err();

        assert!(matches!(err, StoreError::NotADirectory(_)));
        assert!(store.list_keywords().is_empty());
    }

    #[tokio::test]
    async fn load_splits_lines_and_drops_blanks() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("greet"), "hi\r\nhello\n\n\nyo\n").unwrap();

        let store = loaded(&tmp).await;

        assert_eq!(store.list_responses("greet").unwrap(), ["hi", "hello", "yo"]);
    }

    #[tokio::test]
    async fn unreadable_file_loads_as_empty_list() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("binary"), [0xff, 0xfe, 0x00]).unwrap();
        std::fs::write(tmp.path().join("fine"), "ok").unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();

        let store = loaded(&tmp).await;

        assert_eq!(store.list_keywords(), ["binary", "fine"]);
        assert!(store.list_responses("binary").unwrap().is_empty());
        assert_eq!(store.list_responses("fine").unwrap(), ["ok"]);
    }

    #[tokio::test]
    async fn hand_made_files_load_under_their_own_name() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("good night"), "sleep well").unwrap();
        std::fs::write(tmp.path().join("a\\b"), "slash").unwrap();

        let store = loaded(&tmp).await;

        assert_eq!(store.list_keywords(), ["a\\b", "good night"]);
        let (keyword, responses) = store.find_trigger("well then !good night").unwrap();
        assert_eq!(keyword, "good night");
        assert_eq!(responses, ["sleep well"]);
        assert!(store.find_trigger("!good").is_none());
    }

    #[tokio::test]
    async fn add_round_trips_through_reload() {
        let tmp = TempDir::new().unwrap();
        let mut store = loaded(&tmp).await;

        let res = store.add("k", "a").await.unwrap();
        assert_eq!(res.outcome, AddOutcome::Created);
        assert!(res.write_error.is_none());

        let res = store.add("k", "b c").await.unwrap();
        assert_eq!(res.outcome, AddOutcome::Appended);

        store.reload().await.unwrap();
        assert_eq!(store.list_responses("k").unwrap(), ["a", "b c"]);
        assert_eq!(std::fs::read_to_string(tmp.path().join("k")).unwrap(), "a\nb c");
    }

    #[tokio::test]
    async fn duplicate_add_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut store = loaded(&tmp).await;

        store.add("k", "x").await.unwrap();
        let err = store.add("k", "x").await.unwrap_err();

        assert!(matches!(err, StoreError::Duplicate));
        assert_eq!(store.list_responses("k").unwrap(), ["x"]);
    }

    #[tokio::test]
    async fn invalid_keywords_and_items_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut store = loaded(&tmp).await;

        for keyword in ["", ".", "..", "../escape", "a\\b", "two words"] {
            let err = store.add(keyword, "x").await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidKeyword(_)), "{keyword:?}");
        }
        assert!(matches!(store.add("k", "").await.unwrap_err(), StoreError::InvalidItem));
        assert!(matches!(store.add("k", "a\nb").await.unwrap_err(), StoreError::InvalidItem));
        assert!(store.list_keywords().is_empty());
    }

    #[tokio::test]
    async fn removing_only_item_deletes_keyword_and_file() {
        let tmp = TempDir::new().unwrap();
        let mut store = loaded(&tmp).await;
        store.add("k", "only").await.unwrap();
        assert!(tmp.path().join("k").exists());

        let res = store.remove("k", 0).await.unwrap();

        assert_eq!(res.outcome, RemoveOutcome::RemovedKeyword);
        assert!(res.write_error.is_none());
        assert!(matches!(store.list_responses("k"), Err(StoreError::UnknownKeyword(_))));
        assert!(!tmp.path().join("k").exists());
    }

    #[tokio::test]
    async fn file_already_gone_is_not_a_write_error() {
        let tmp = TempDir::new().unwrap();
        let mut store = loaded(&tmp).await;
        store.add("k", "only").await.unwrap();
        std::fs::remove_file(tmp.path().join("k")).unwrap();

        let res = store.remove("k", 0).await.unwrap();

        assert_eq!(res.outcome, RemoveOutcome::RemovedKeyword);
        assert!(res.write_error.is_none());
    }

    #[tokio::test]
    async fn remove_moves_last_item_into_the_gap() {
        let tmp = TempDir::new().unwrap();
        let mut store = loaded(&tmp).await;
        for item in ["a", "b", "c", "d"] {
            store.add("k", item).await.unwrap();
        }

        let res = store.remove("k", 1).await.unwrap();

        assert_eq!(res.outcome, RemoveOutcome::RemovedItem);
        assert_eq!(store.list_responses("k").unwrap(), ["a", "d", "c"]);
        assert_eq!(std::fs::read_to_string(tmp.path().join("k")).unwrap(), "a\nd\nc");

        store.remove("k", 2).await.unwrap();
        assert_eq!(store.list_responses("k").unwrap(), ["a", "d"]);
    }

    #[tokio::test]
    async fn remove_validates_keyword_and_id() {
        let tmp = TempDir::new().unwrap();
        let mut store = loaded(&tmp).await;
        store.add("k", "a").await.unwrap();

        assert!(matches!(store.remove("nope", 0).await.unwrap_err(), StoreError::UnknownKeyword(_)));
        assert!(matches!(store.remove("k", 1).await.unwrap_err(), StoreError::InvalidId(1)));
        assert_eq!(store.list_responses("k").unwrap(), ["a"]);
    }

    #[tokio::test]
    async fn keywords_are_listed_in_lexicographic_order() {
        let tmp = TempDir::new().unwrap();
        let mut store = loaded(&tmp).await;
        for keyword in ["zeta", "Alpha", "mid", "alpha"] {
            store.add(keyword, "x").await.unwrap();
        }

        assert_eq!(store.list_keywords(), ["Alpha", "alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn write_failure_keeps_the_in_memory_change() {
        let tmp = TempDir::new().unwrap();
        let mut store = KeywordStore::new(tmp.path().join("never-created"));

        let res = store.add("k", "a").await.unwrap();

        assert!(matches!(res.write_error, Some(StoreError::FileWrite { .. })));
        assert_eq!(store.list_responses("k").unwrap(), ["a"]);
    }

    #[tokio::test]
    async fn trigger_must_be_a_standalone_token() {
        let tmp = TempDir::new().unwrap();
        let mut store = loaded(&tmp).await;
        store.add("foo", "bar").await.unwrap();

        assert_eq!(store.find_trigger("hello !foo world").map(|(k, _)| k), Some("foo"));
        assert_eq!(store.find_trigger("!foo").map(|(k, _)| k), Some("foo"));
        assert!(store.find_trigger("hello!foo").is_none());
        assert!(store.find_trigger("!foobar").is_none());
        assert!(store.find_trigger("!Foo").is_none());
    }

    #[tokio::test]
    async fn trigger_escapes_pattern_characters() {
        let tmp = TempDir::new().unwrap();
        let mut store = loaded(&tmp).await;
        store.add("a.b", "dotted").await.unwrap();
        store.add("c++", "plus").await.unwrap();

        assert!(store.find_trigger("!axb").is_none());
        assert_eq!(store.find_trigger("try !a.b now").map(|(k, _)| k), Some("a.b"));
        assert_eq!(store.find_trigger("!c++").map(|(k, _)| k), Some("c++"));
    }

    #[tokio::test]
    async fn first_keyword_in_listing_order_wins() {
        let tmp = TempDir::new().unwrap();
        let mut store = loaded(&tmp).await;
        store.add("zed", "z").await.unwrap();
        store.add("abc", "a").await.unwrap();

        let (keyword, responses) = store.find_trigger("!zed !abc").unwrap();
        assert_eq!(keyword, "abc");
        assert_eq!(responses, ["a"]);
    }

    #[tokio::test]
    async fn keywords_without_responses_never_trigger() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("empty"), "\n\n").unwrap();

        let store = loaded(&tmp).await;

        assert_eq!(store.list_keywords(), ["empty"]);
        assert!(store.find_trigger("!empty").is_none());
    }
}
