//! Repository access abstraction layer
//!
//! This module provides a trait-based abstraction over the remote repository
//! operations a release needs: reading files at the merge commit, listing the
//! files a pull request changed, creating labels, and writing trees, commits
//! and refs.
//!
//! # Overview
//!
//! The primary abstraction is the [RepositoryAccessor] trait. The concrete
//! implementations include:
//!
//! - [github::GithubRepository]: the GitHub REST API, used inside Actions
//! - [local::LocalRepository]: a local repository through `git2`
//! - [mock::MockRepository]: an in-memory implementation for testing
//!
//! Object ids (trees, commits) are passed around as hex SHA strings so that
//! every backend shares one signature.

pub mod github;
pub mod local;
pub mod mock;

pub use github::GithubRepository;
pub use local::LocalRepository;
pub use mock::MockRepository;

use crate::domain::LabelSpec;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How a pull request touched a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Removed,
    Modified,
    Renamed,
    Copied,
    Changed,
    Unchanged,
    #[serde(other)]
    Other,
}

impl FileStatus {
    /// Whether the file appears at a path it did not occupy before
    pub fn is_new(&self) -> bool {
        matches!(self, FileStatus::Added | FileStatus::Renamed)
    }
}

/// A file changed by the pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    #[serde(rename = "filename")]
    pub path: String,
    pub status: FileStatus,
}

impl ChangedFile {
    pub fn new(path: impl Into<String>, status: FileStatus) -> Self {
        ChangedFile {
            path: path.into(),
            status,
        }
    }
}

/// A file to write into the release tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub content: String,
}

/// Remote repository operations used by a release run
///
/// All implementors must be `Send + Sync` so that a run can fan out
/// concurrent requests against one shared accessor.
///
/// None of the operations are retried; an error aborts the run.
#[async_trait]
pub trait RepositoryAccessor: Send + Sync {
    /// Read a file at the merge commit.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    async fn get_file_content(&self, path: &str) -> Result<Option<String>>;

    /// Create a label on the repository
    async fn create_label(&self, label: &LabelSpec) -> Result<()>;

    /// List one page of the pull request's changed files.
    ///
    /// `page` is 0-based.
    async fn list_changed_files(&self, page: usize, per_page: usize) -> Result<Vec<ChangedFile>>;

    /// Create a tree on top of the tree of `base_ref` and return its id.
    ///
    /// Every entry is written as a regular, non-executable blob.
    async fn create_tree(&self, base_ref: &str, entries: &[TreeEntry]) -> Result<String>;

    /// Create a commit and return its id
    async fn create_commit(&self, message: &str, tree: &str, parents: &[String]) -> Result<String>;

    /// Create `refs/tags/<name>` pointing at `commit`
    async fn create_tag_ref(&self, name: &str, commit: &str) -> Result<()>;

    /// Move `refs/heads/<branch>` to `commit`
    async fn update_branch_ref(&self, branch: &str, commit: &str) -> Result<()>;
}
