//! Bump scripts supplied by the target repository
//!
//! A `./`-prefixed bump script name refers to an executable in the repository
//! being released. It is fetched at the merge commit, written to a local
//! lookup directory and run as an external process:
//!
//! - `<script> files <component>` prints the repository paths it needs to
//!   read, one per line.
//! - `<script> bump <bumpType> <component>` receives
//!   `{"files": {"<path>": "<content>" | null}}` on stdin and prints
//!   `{"version": "X.Y.Z", "writes": {"<path>": "<content>"}}` on stdout.
//!
//! `RELEASE_BUMP_COMPONENT` and `RELEASE_BUMP_TYPE` are set for both calls.

use crate::domain::{Version, VersionBump};
use crate::error::{ReleaseError, Result};
use crate::strategy::{BumpStrategy, FileActions};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, OnceLock};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

#[derive(Serialize)]
struct ScriptInput {
    files: BTreeMap<String, Option<String>>,
}

#[derive(Deserialize)]
struct ScriptOutput {
    version: String,
    #[serde(default)]
    writes: BTreeMap<String, String>,
}

/// Scripts already persisted by this process, by configured name
fn loaded_scripts() -> &'static Mutex<HashMap<String, PathBuf>> {
    static LOADED: OnceLock<Mutex<HashMap<String, PathBuf>>> = OnceLock::new();
    LOADED.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Directory scripts are persisted to before they run
pub fn script_dir() -> PathBuf {
    std::env::temp_dir()
        .join("release-bump")
        .join(std::process::id().to_string())
        .join("scripts")
}

/// A bump strategy implemented by a script in the target repository
pub struct ScriptStrategy {
    name: String,
    script: PathBuf,
    files: Arc<FileActions>,
}

impl ScriptStrategy {
    /// Fetch the script named `name` (`./path/in/repo`) and persist it
    /// locally, reusing an earlier copy loaded by this process.
    pub async fn load(name: &str, files: Arc<FileActions>) -> Result<Self> {
        let cached = loaded_scripts()
            .lock()
            .ok()
            .and_then(|loaded| loaded.get(name).cloned());

        let script = match cached {
            Some(path) => path,
            None => {
                let path = persist(name, &files).await?;
                if let Ok(mut loaded) = loaded_scripts().lock() {
                    loaded.insert(name.to_string(), path.clone());
                }
                path
            }
        };

        Ok(ScriptStrategy {
            name: name.to_string(),
            script,
            files,
        })
    }

    async fn run(
        &self,
        args: &[&str],
        component: &str,
        bump: &str,
        stdin: Option<Vec<u8>>,
    ) -> Result<String> {
        let mut cmd = Command::new(&self.script);
        cmd.args(args)
            .env("RELEASE_BUMP_COMPONENT", component)
            .env("RELEASE_BUMP_TYPE", bump)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            ReleaseError::script(format!("Failed to execute {}: {}", self.name, e))
        })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            // A script may exit without reading its input
            if let Err(e) = pipe.write_all(&input).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(ReleaseError::script(format!(
                "{} failed with exit code {}\nStdout: {}\nStderr: {}",
                self.name,
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| ReleaseError::script(format!("{} printed non UTF-8 output", self.name)))
    }
}

async fn persist(name: &str, files: &FileActions) -> Result<PathBuf> {
    let repo_path = name.trim_start_matches("./");
    let source = files
        .read_file(repo_path)
        .await?
        .ok_or_else(|| ReleaseError::ScriptNotFound(name.to_string()))?;

    let dir = script_dir();
    tokio::fs::create_dir_all(&dir).await?;
    let local = dir.join(repo_path.replace('/', "__"));
    tokio::fs::write(&local, source).await?;
    make_executable(&local).await?;

    debug!("Loaded bump script {} to {}", name, local.display());
    Ok(local)
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[async_trait]
impl BumpStrategy for ScriptStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn current_version(&self, component: &str) -> Result<Version> {
        self.apply(component, VersionBump::None).await
    }

    async fn apply(&self, component: &str, bump: VersionBump) -> Result<Version> {
        let listing = self
            .run(&["files", component], component, bump.as_str(), None)
            .await?;
        let paths: Vec<&str> = listing
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let contents = try_join_all(paths.iter().map(|path| self.files.read_file(path))).await?;
        let input = ScriptInput {
            files: paths
                .iter()
                .map(|path| path.to_string())
                .zip(contents)
                .collect(),
        };

        let stdout = self
            .run(
                &["bump", bump.as_str(), component],
                component,
                bump.as_str(),
                Some(serde_json::to_vec(&input)?),
            )
            .await?;
        let output: ScriptOutput = serde_json::from_str(stdout.trim()).map_err(|e| {
            ReleaseError::script(format!("{} printed invalid output: {}", self.name, e))
        })?;

        let version = Version::parse(&output.version)?;
        if bump != VersionBump::None {
            for (path, content) in output.writes {
                self.files.write_file(path, content)?;
            }
        }
        Ok(version)
    }
}
