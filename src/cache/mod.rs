//! Persistent cache of golangci-lint's analysis data between pipeline runs.
//! Restore is a pure side effect: nothing it does feeds back into the
//! invocation, a miss just means a slower lint run.

use std::env;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

const SNAPSHOT_ROTATION_DAYS: i64 = 7;

/// Snapshot sidecar metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotMetadata {
    created_at: DateTime<Utc>,
    file_count: u64,
    total_size: u64,
    checksum: String,
}

/// Narrow contract for the persistent store. `restore`/`save` move whole
/// directory snapshots; both are best-effort from the caller's point of
/// view.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Restore the snapshot under `key` into `dest`. `Ok(false)` is a miss.
    async fn restore(&self, key: &str, dest: &Path) -> anyhow::Result<bool>;
    /// Snapshot `src` under `key`, replacing any previous snapshot.
    async fn save(&self, key: &str, src: &Path) -> anyhow::Result<()>;
}

/// Filesystem-backed store rooted below the runner's tool cache.
pub struct FsCacheStore {
    root: PathBuf,
}

impl FsCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn default_root() -> PathBuf {
        if let Some(root) = env::var_os("RUNNER_TOOL_CACHE") {
            return PathBuf::from(root).join("lint-action-cache");
        }
        if let Some(home) = env::var_os("HOME") {
            return PathBuf::from(home).join(".cache").join("lint-action").join("store");
        }
        env::temp_dir().join("lint-action-cache")
    }

    fn entry_dir(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn metadata_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.meta.json", key))
    }
}

#[async_trait]
impl CacheStore for FsCacheStore {
    async fn restore(&self, key: &str, dest: &Path) -> anyhow::Result<bool> {
        let entry = self.entry_dir(key);
        if !entry.is_dir() {
            return Ok(false);
        }

        let metadata: SnapshotMetadata =
            match tokio::fs::read_to_string(self.metadata_path(key)).await {
                Ok(raw) => match serde_json::from_str(&raw) {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        warn!("cache entry {} has unreadable metadata, treating as miss: {}", key, e);
                        return Ok(false);
                    }
                },
                Err(e) => {
                    warn!("cache entry {} has no metadata, treating as miss: {}", key, e);
                    return Ok(false);
                }
            };

        let hash_entry = entry.clone();
        let actual =
            tokio::task::spawn_blocking(move || hash_dir(&hash_entry)).await??;
        if actual != metadata.checksum {
            warn!("cache entry {} failed integrity check, treating as miss", key);
            return Ok(false);
        }

        let copy_src = entry.clone();
        let copy_dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || copy_dir_all(&copy_src, &copy_dest)).await??;
        debug!(
            "restored cache entry {} ({} files, {} bytes, created {})",
            key, metadata.file_count, metadata.total_size, metadata.created_at
        );
        Ok(true)
    }

    async fn save(&self, key: &str, src: &Path) -> anyhow::Result<()> {
        if !src.is_dir() {
            anyhow::bail!("cache source {} is not a directory", src.display());
        }
        tokio::fs::create_dir_all(&self.root).await?;

        let entry = self.entry_dir(key);
        if entry.exists() {
            tokio::fs::remove_dir_all(&entry).await?;
        }

        let copy_src = src.to_path_buf();
        let copy_dest = entry.clone();
        let (file_count, total_size) =
            tokio::task::spawn_blocking(move || copy_dir_all(&copy_src, &copy_dest)).await??;

        let hash_entry = entry.clone();
        let checksum = tokio::task::spawn_blocking(move || hash_dir(&hash_entry)).await??;

        let metadata = SnapshotMetadata {
            created_at: Utc::now(),
            file_count,
            total_size,
            checksum,
        };
        tokio::fs::write(
            self.metadata_path(key),
            serde_json::to_string_pretty(&metadata)?,
        )
        .await?;
        debug!("saved cache entry {} ({} files, {} bytes)", key, file_count, total_size);
        Ok(())
    }
}

/// Cache key: platform + tool version + a rotation bucket so stale analysis
/// data ages out weekly instead of accumulating forever.
pub fn cache_key(version: &str) -> String {
    let bucket = Utc::now().timestamp() / (SNAPSHOT_ROTATION_DAYS * 24 * 60 * 60);
    format!(
        "golangci-lint-{}-{}-{}-{}",
        env::consts::OS,
        env::consts::ARCH,
        version,
        bucket
    )
}

/// golangci-lint 自己的缓存目录
pub fn tool_cache_dir() -> PathBuf {
    if let Some(dir) = env::var_os("GOLANGCI_LINT_CACHE") {
        return PathBuf::from(dir);
    }
    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".cache").join("golangci-lint");
    }
    env::temp_dir().join("golangci-lint-cache")
}

fn copy_dir_all(src: &Path, dest: &Path) -> std::io::Result<(u64, u64)> {
    std::fs::create_dir_all(dest)?;
    let mut file_count = 0;
    let mut total_size = 0;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dest.join(entry.file_name());
        if file_type.is_dir() {
            let (files, size) = copy_dir_all(&entry.path(), &target)?;
            file_count += files;
            total_size += size;
        } else if file_type.is_file() {
            total_size += std::fs::copy(entry.path(), &target)?;
            file_count += 1;
        }
        // 其他类型（socket、符号链接）不属于分析缓存，跳过
    }
    Ok((file_count, total_size))
}

/// Digest over sorted relative paths and file contents.
fn hash_dir(root: &Path) -> std::io::Result<String> {
    let mut files = Vec::new();
    collect_files(root, root, &mut files)?;
    files.sort();

    let mut hasher = Sha256::new();
    for relative in &files {
        hasher.update(relative.as_bytes());
        hasher.update(std::fs::read(root.join(relative))?);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(root, &entry.path(), out)?;
        } else if file_type.is_file() {
            let relative = entry
                .path()
                .strip_prefix(root)
                .expect("entry is below root")
                .to_string_lossy()
                .into_owned();
            out.push(relative);
        }
    }
    Ok(())
}
