//! The merged pull request that triggers a release run

use crate::error::{ReleaseError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repo {
    pub name: String,
    pub owner: Owner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaseRef {
    #[serde(rename = "ref")]
    pub branch: String,
    pub repo: Repo,
}

/// The subset of a `pull_request` webhook payload a release needs
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub merged: bool,
    pub merge_commit_sha: Option<String>,
    #[serde(default)]
    pub changed_files: usize,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub base: BaseRef,
}

#[derive(Deserialize)]
struct EventPayload {
    pull_request: PullRequest,
}

/// Where a release run reads from and writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoArgs {
    pub owner: String,
    pub repo: String,
    /// The merge commit; all reads happen here and the bump commit's parent
    pub git_ref: String,
    /// The branch advanced to the bump commit
    pub branch: String,
}

impl PullRequest {
    /// Load the pull request from a webhook event file (`$GITHUB_EVENT_PATH`)
    pub fn from_event_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let payload: EventPayload = serde_json::from_str(&raw)?;
        Ok(payload.pull_request)
    }

    pub fn label_names(&self) -> Vec<String> {
        self.labels.iter().map(|label| label.name.clone()).collect()
    }

    /// Validate that the pull request was merged into `base_branch` and
    /// return the coordinates of the merge commit.
    pub fn repo_args(&self, base_branch: &str) -> Result<RepoArgs> {
        if !self.merged || self.base.branch != base_branch {
            return Err(ReleaseError::NotMerged(base_branch.to_string()));
        }

        let git_ref = self
            .merge_commit_sha
            .clone()
            .ok_or_else(|| ReleaseError::NotMerged(base_branch.to_string()))?;

        let args = RepoArgs {
            owner: self.base.repo.owner.login.clone(),
            repo: self.base.repo.name.clone(),
            git_ref,
            branch: base_branch.to_string(),
        };

        debug!(
            "Working with {}/{} at {}",
            args.owner, args.repo, args.git_ref
        );
        Ok(args)
    }
}
