use crate::classify::Category;
use crate::error::{Result, ScanError};
use crate::normalize::url_digest;
use crate::transport::Payload;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

/// Durable storage for artifacts.
#[async_trait]
pub trait ByteSink: Send + Sync {
    /// Write `bytes` to `path`, creating parent directories as needed.
    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// Create `path` and its ancestors. Succeeds if it already exists.
    async fn create_dir_all(&self, path: &Path) -> Result<()>;
}

/// Writes straight to the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSink;

#[async_trait]
impl ByteSink for FsSink {
    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let to_write_error = |source| ScanError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(to_write_error)?;
        }
        tokio::fs::write(path, bytes).await.map_err(to_write_error)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|source| ScanError::Write {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// The four category directories under one output root.
///
/// Pages go to the root itself; scripts, stylesheets and images to `js/`,
/// `css/` and `img/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir_for(&self, category: Category) -> Option<PathBuf> {
        match category {
            Category::Html => Some(self.root.clone()),
            Category::Script => Some(self.root.join("js")),
            Category::Stylesheet => Some(self.root.join("css")),
            Category::Image => Some(self.root.join("img")),
            Category::Unknown => None,
        }
    }

    pub fn dirs(&self) -> Vec<PathBuf> {
        [
            Category::Html,
            Category::Script,
            Category::Stylesheet,
            Category::Image,
        ]
        .into_iter()
        .filter_map(|category| self.dir_for(category))
        .collect()
    }
}

/// What to do when two different URLs derive the same file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Last writer wins.
    #[default]
    Overwrite,
    /// Later URLs get a short digest of their URL appended to the stem.
    Suffix,
}

pub struct ArtifactWriter {
    layout: OutputLayout,
    sink: Arc<dyn ByteSink>,
    policy: CollisionPolicy,
    /// Output path -> URL that claimed it.
    claimed: Mutex<HashMap<PathBuf, String>>,
}

impl ArtifactWriter {
    pub fn new(layout: OutputLayout, sink: Arc<dyn ByteSink>) -> Self {
        Self {
            layout,
            sink,
            policy: CollisionPolicy::default(),
            claimed: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_policy(mut self, policy: CollisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Create every category directory ahead of the first write. Safe to
    /// call when they already exist.
    pub async fn prepare(&self) -> Result<()> {
        for dir in self.layout.dirs() {
            self.sink.create_dir_all(&dir).await?;
        }
        Ok(())
    }

    /// Persist one artifact. Returns the written path, or `None` for
    /// categories that are never stored.
    pub async fn persist(
        &self,
        category: Category,
        file_name: &str,
        source: &Url,
        payload: &Payload,
    ) -> Result<Option<PathBuf>> {
        let Some(dir) = self.layout.dir_for(category) else {
            return Ok(None);
        };

        if category == Category::Image && !payload.is_binary() {
            return Err(ScanError::NonBinaryImagePayload(source.to_string()));
        }

        let path = self.claim(dir.join(file_name), source).await;
        self.sink.write(&path, payload.as_bytes()).await?;
        Ok(Some(path))
    }

    async fn claim(&self, path: PathBuf, source: &Url) -> PathBuf {
        let mut claimed = self.claimed.lock().await;
        let owner = claimed.get(&path).cloned();

        match owner {
            Some(owner) if owner != source.as_str() => match self.policy {
                CollisionPolicy::Overwrite => {
                    warn!(
                        "{} overwrites {} previously saved from {}",
                        source,
                        path.display(),
                        owner
                    );
                    claimed.insert(path.clone(), source.to_string());
                    path
                }
                CollisionPolicy::Suffix => {
                    let renamed = suffixed_path(&path, source);
                    debug!("Name collision on {}, using {}", path.display(), renamed.display());
                    claimed.insert(renamed.clone(), source.to_string());
                    renamed
                }
            },
            _ => {
                claimed.insert(path.clone(), source.to_string());
                path
            }
        }
    }
}

/// `dir/logo.png` -> `dir/logo-1a2b3c4d.png`
fn suffixed_path(path: &Path, source: &Url) -> PathBuf {
    let digest = url_digest(source);
    let token = &digest[..8];
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, token, ext.to_string_lossy()),
        None => format!("{}-{}", stem, token),
    };
    path.with_file_name(name)
}
