use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use furion_types::{RecordBody, RecordId};
use sha2::{Digest, Sha256};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::backend::check_database_name;
use crate::{LogEntry, StorageBackend, StoreError};

/// File-backed backend: one `<database>.jsonl` log per database under `root`.
///
/// Line format: `<sha256 hex of entry json>\t<entry json>\n`. A complete line
/// whose checksum does not match, or that does not parse, makes the whole
/// database unavailable rather than silently dropping history. An unterminated
/// last line is what an interrupted append leaves behind; it was never
/// acknowledged, so it is cut off on the next load.
pub struct FileBackend {
    root: PathBuf,
    max_bytes: Option<u64>,
    /// Serializes every write; also caches per-database identity state.
    tails: Mutex<HashMap<String, LogTail>>,
}

/// Identity state of one log, valid while the file is still `len` bytes long.
#[derive(Default)]
struct LogTail {
    len: Option<u64>,
    last_ids: HashMap<String, u64>,
}

impl LogTail {
    fn record(&mut self, entry: &LogEntry) {
        if let LogEntry::Inserted { table, id, .. } = entry {
            let last = self.last_ids.entry(table.clone()).or_default();
            *last = (*last).max(id.0);
        }
    }
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_bytes: None,
            tails: Mutex::new(HashMap::new()),
        }
    }

    /// Refuse appends that would grow a log past `max` bytes.
    pub fn with_max_bytes(mut self, max: u64) -> Self {
        self.max_bytes = Some(max);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn log_path(&self, database: &str) -> PathBuf {
        self.root.join(format!("{database}.jsonl"))
    }

    /// Parse a log, cutting off a torn last line. Returns the entries and the
    /// length of the log that holds them. Callers hold the write lock.
    async fn read_log(&self, path: &Path) -> Result<(Vec<LogEntry>, u64), StoreError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok((Vec::new(), 0)),
            Err(e) => return Err(io_error(path, e)),
        };

        let end = bytes.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
        if end < bytes.len() {
            warn!(path = %path.display(), dropped = bytes.len() - end, "cutting torn log tail");
            let file = OpenOptions::new()
                .write(true)
                .open(path)
                .await
                .map_err(|e| io_error(path, e))?;
            file.set_len(end as u64).await.map_err(|e| io_error(path, e))?;
            file.sync_data().await.map_err(|e| io_error(path, e))?;
        }

        let text = std::str::from_utf8(&bytes[..end])
            .map_err(|e| StoreError::unavailable(format!("corrupt log {}: {e}", path.display())))?;
        let mut entries = Vec::new();
        for (n, line) in text.lines().enumerate().filter(|(_, l)| !l.is_empty()) {
            let entry = parse_line(line).ok_or_else(|| {
                warn!(path = %path.display(), line = n + 1, "corrupt log line");
                StoreError::unavailable(format!(
                    "corrupt log line {} in {}",
                    n + 1,
                    path.display()
                ))
            })?;
            entries.push(entry);
        }
        debug!(path = %path.display(), entries = entries.len(), "loaded log");
        Ok((entries, end as u64))
    }

    /// Append one encoded line; returns the log length before and after.
    ///
    /// A failed write is rolled back to the old length so no partial line is
    /// left for the next append to land on. Callers hold the write lock.
    async fn write_line(&self, path: &Path, line: &str) -> Result<(u64, u64), StoreError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error(&self.root, e))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| io_error(path, e))?;
        let before = file.metadata().await.map_err(|e| io_error(path, e))?.len();
        let after = before + line.len() as u64;
        if let Some(max) = self.max_bytes {
            if after > max {
                return Err(StoreError::unavailable(format!(
                    "quota exceeded: {} would exceed {max} bytes",
                    path.display()
                )));
            }
        }

        let written = async {
            file.write_all(line.as_bytes()).await?;
            file.sync_data().await
        }
        .await;
        if let Err(e) = written {
            if let Err(undo) = file.set_len(before).await {
                warn!(path = %path.display(), error = %undo, "could not roll back partial append");
            }
            return Err(io_error(path, e));
        }
        Ok((before, after))
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn load(&self, database: &str) -> Result<Vec<LogEntry>, StoreError> {
        check_database_name(database)?;
        let path = self.log_path(database);
        let _tails = self.tails.lock().await;
        let (entries, _) = self.read_log(&path).await?;
        Ok(entries)
    }

    async fn append(&self, database: &str, entry: &LogEntry) -> Result<(), StoreError> {
        check_database_name(database)?;
        let line = encode_line(entry)?;
        let path = self.log_path(database);

        let mut tails = self.tails.lock().await;
        let (before, after) = self.write_line(&path, &line).await?;
        if let Some(tail) = tails.get_mut(database) {
            if tail.len == Some(before) {
                tail.len = Some(after);
                tail.record(entry);
            } else {
                tail.len = None;
            }
        }
        Ok(())
    }

    async fn append_insert(
        &self,
        database: &str,
        table: &str,
        body: &RecordBody,
    ) -> Result<RecordId, StoreError> {
        check_database_name(database)?;
        let path = self.log_path(database);

        let mut tails = self.tails.lock().await;
        let current = match fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => return Err(io_error(&path, e)),
        };
        let tail = tails.entry(database.to_string()).or_default();
        // Someone else wrote to the log since we last looked: rescan it.
        if tail.len != Some(current) {
            let (entries, len) = self.read_log(&path).await?;
            *tail = LogTail {
                len: Some(len),
                last_ids: HashMap::new(),
            };
            entries.iter().for_each(|e| tail.record(e));
        }

        let id = RecordId(tail.last_ids.get(table).copied().unwrap_or(0) + 1);
        let entry = LogEntry::Inserted {
            table: table.to_string(),
            id,
            body: body.clone(),
        };
        let (before, after) = self.write_line(&path, &encode_line(&entry)?).await?;
        tail.len = (tail.len == Some(before)).then_some(after);
        tail.record(&entry);
        Ok(id)
    }

    async fn probe(&self, database: &str) -> Result<(), StoreError> {
        check_database_name(database)?;
        match fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(StoreError::unavailable(format!(
                "{} is not a directory",
                self.root.display()
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&self.root, e)),
        }
    }
}

fn encode_line(entry: &LogEntry) -> Result<String, StoreError> {
    let json =
        serde_json::to_string(entry).map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
    Ok(format!("{}\t{}\n", checksum(&json), json))
}

fn parse_line(line: &str) -> Option<LogEntry> {
    let (sum, json) = line.split_once('\t')?;
    if checksum(json) != sum {
        return None;
    }
    serde_json::from_str(json).ok()
}

fn checksum(json: &str) -> String {
    let mut h = Sha256::new();
    h.update(json.as_bytes());
    format!("{:x}", h.finalize())
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    let reason = match e.kind() {
        ErrorKind::PermissionDenied => format!("permission denied: {}", path.display()),
        _ => format!("io error on {}: {e}", path.display()),
    };
    StoreError::unavailable(reason)
}
