use crate::domain::LabelSpec;
use crate::error::{ReleaseError, Result};
use crate::git::{ChangedFile, RepositoryAccessor, TreeEntry};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// A mutating call received by [MockRepository]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    CreateLabel(LabelSpec),
    CreateTree {
        base_ref: String,
        entries: Vec<TreeEntry>,
    },
    CreateCommit {
        message: String,
        tree: String,
        parents: Vec<String>,
    },
    CreateTagRef {
        name: String,
        commit: String,
    },
    UpdateBranchRef {
        branch: String,
        commit: String,
    },
}

/// Mock repository for testing without a hosting platform
#[derive(Default)]
pub struct MockRepository {
    files: HashMap<String, String>,
    changed_files: Vec<ChangedFile>,
    failing_tags: HashSet<String>,
    failing_labels: HashSet<String>,
    calls: Mutex<Vec<MockCall>>,
    reads: Mutex<HashMap<String, usize>>,
}

impl MockRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file readable at the merge commit
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Add a file to the pull request's changed files
    pub fn with_changed_file(mut self, file: ChangedFile) -> Self {
        self.changed_files.push(file);
        self
    }

    /// Make creation of the named tag fail
    pub fn failing_tag(mut self, name: impl Into<String>) -> Self {
        self.failing_tags.insert(name.into());
        self
    }

    /// Make creation of the named label fail
    pub fn failing_label(mut self, name: impl Into<String>) -> Self {
        self.failing_labels.insert(name.into());
        self
    }

    /// Number of changed files, as the pull request payload reports it
    pub fn changed_file_count(&self) -> usize {
        self.changed_files.len()
    }

    /// Every mutating call so far, in the order received
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// How often a path was fetched
    pub fn read_count(&self, path: &str) -> usize {
        self.reads
            .lock()
            .map(|r| r.get(path).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn record(&self, call: MockCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl RepositoryAccessor for MockRepository {
    async fn get_file_content(&self, path: &str) -> Result<Option<String>> {
        if let Ok(mut reads) = self.reads.lock() {
            *reads.entry(path.to_string()).or_insert(0) += 1;
        }
        tokio::task::yield_now().await;
        Ok(self.files.get(path).cloned())
    }

    async fn create_label(&self, label: &LabelSpec) -> Result<()> {
        tokio::task::yield_now().await;
        if self.failing_labels.contains(&label.name) {
            return Err(ReleaseError::remote(format!(
                "Label already exists: {}",
                label.name
            )));
        }
        self.record(MockCall::CreateLabel(label.clone()));
        Ok(())
    }

    async fn list_changed_files(&self, page: usize, per_page: usize) -> Result<Vec<ChangedFile>> {
        Ok(self
            .changed_files
            .iter()
            .skip(page * per_page)
            .take(per_page)
            .cloned()
            .collect())
    }

    async fn create_tree(&self, base_ref: &str, entries: &[TreeEntry]) -> Result<String> {
        self.record(MockCall::CreateTree {
            base_ref: base_ref.to_string(),
            entries: entries.to_vec(),
        });
        Ok("tree-1".to_string())
    }

    async fn create_commit(&self, message: &str, tree: &str, parents: &[String]) -> Result<String> {
        self.record(MockCall::CreateCommit {
            message: message.to_string(),
            tree: tree.to_string(),
            parents: parents.to_vec(),
        });
        Ok("commit-1".to_string())
    }

    async fn create_tag_ref(&self, name: &str, commit: &str) -> Result<()> {
        tokio::task::yield_now().await;
        if self.failing_tags.contains(name) {
            return Err(ReleaseError::remote(format!(
                "Reference already exists: refs/tags/{}",
                name
            )));
        }
        self.record(MockCall::CreateTagRef {
            name: name.to_string(),
            commit: commit.to_string(),
        });
        Ok(())
    }

    async fn update_branch_ref(&self, branch: &str, commit: &str) -> Result<()> {
        self.record(MockCall::UpdateBranchRef {
            branch: branch.to_string(),
            commit: commit.to_string(),
        });
        Ok(())
    }
}
