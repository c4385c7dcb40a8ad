//! Bump strategies: how a component's version is read, bumped and written
//!
//! A strategy never writes to the repository directly. Reads go through the
//! run's [FileActions], which fetches each path at most once, and writes are
//! staged there until the sequencer commits them in one tree.

pub mod cobra;
pub mod script;
pub mod version_file;

pub use cobra::GoCobraStrategy;
pub use script::ScriptStrategy;
pub use version_file::VersionFileStrategy;

use crate::domain::{Version, VersionBump};
use crate::error::{ReleaseError, Result};
use crate::git::RepositoryAccessor;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::debug;

/// Reads a component's version and applies a bump to it
#[async_trait]
pub trait BumpStrategy: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// The version currently recorded for `component`
    async fn current_version(&self, component: &str) -> Result<Version>;

    /// Bump `component` and stage the resulting file changes.
    ///
    /// With [VersionBump::None] this is a pure read that stages nothing.
    async fn apply(&self, component: &str, bump: VersionBump) -> Result<Version>;
}

type CachedFile = Arc<OnceCell<Option<String>>>;

/// Per-run file access: a read-through cache and the staged change set
pub struct FileActions {
    accessor: Arc<dyn RepositoryAccessor>,
    cache: Mutex<HashMap<String, CachedFile>>,
    changes: Mutex<BTreeMap<String, String>>,
}

impl FileActions {
    pub fn new(accessor: Arc<dyn RepositoryAccessor>) -> Self {
        FileActions {
            accessor,
            cache: Mutex::new(HashMap::new()),
            changes: Mutex::new(BTreeMap::new()),
        }
    }

    /// Read a file at the merge commit, fetching it at most once per run
    pub async fn read_file(&self, path: &str) -> Result<Option<String>> {
        let cell = {
            let mut cache = self
                .cache
                .lock()
                .map_err(|_| ReleaseError::remote("File cache lock poisoned"))?;
            cache.entry(path.to_string()).or_default().clone()
        };

        let content = cell
            .get_or_try_init(|| async {
                debug!("Fetching {}", path);
                self.accessor.get_file_content(path).await
            })
            .await?;
        Ok(content.clone())
    }

    pub async fn file_exists(&self, path: &str) -> Result<bool> {
        Ok(self.read_file(path).await?.is_some())
    }

    /// Stage new content for `path`; nothing is written until commit time
    pub fn write_file(&self, path: impl Into<String>, content: impl Into<String>) -> Result<()> {
        let path = path.into();
        debug!("Staging {}", path);
        self.changes
            .lock()
            .map_err(|_| ReleaseError::remote("Change set lock poisoned"))?
            .insert(path, content.into());
        Ok(())
    }

    /// Snapshot of the staged changes, keyed by path
    pub fn changes(&self) -> BTreeMap<String, String> {
        self.changes.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

/// Built-in strategy used when no bump script is configured
pub const DEFAULT_STRATEGY: &str = "versionFile";

/// Resolve a configured bump script name to a strategy.
///
/// An empty name selects [DEFAULT_STRATEGY]; `./`-prefixed names load a
/// script from the target repository.
pub async fn resolve_strategy(name: &str, files: Arc<FileActions>) -> Result<Arc<dyn BumpStrategy>> {
    let name = if name.is_empty() { DEFAULT_STRATEGY } else { name };

    let strategy: Arc<dyn BumpStrategy> = match name {
        "versionFile" => Arc::new(VersionFileStrategy::new(files)),
        "goCobra" => Arc::new(GoCobraStrategy::new(files)),
        script if script.starts_with("./") => Arc::new(ScriptStrategy::load(script, files).await?),
        other => return Err(ReleaseError::UnknownStrategy(other.to_string())),
    };

    debug!("Using bump script: {}", strategy.name());
    Ok(strategy)
}
