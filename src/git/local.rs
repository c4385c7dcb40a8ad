use crate::domain::LabelSpec;
use crate::error::{ReleaseError, Result};
use crate::git::{ChangedFile, FileStatus, RepositoryAccessor, TreeEntry};
use async_trait::async_trait;
use git2::build::TreeUpdateBuilder;
use git2::{Delta, DiffFindOptions, FileMode, Oid, Repository as Git2Repo, Signature};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// A local repository accessed through libgit2.
///
/// The merge commit is resolved once when the repository is opened; the
/// files it changed are those in the diff against its first parent. Git has
/// no labels, so label creation is logged and skipped.
pub struct LocalRepository {
    repo: Mutex<Git2Repo>,
    merge_commit: Oid,
    changed_files: Vec<ChangedFile>,
}

impl LocalRepository {
    /// Open or discover a git repository and resolve `merge_ref` (e.g. `HEAD`)
    pub fn open<P: AsRef<Path>>(path: P, merge_ref: &str) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;
        let commit = repo.revparse_single(merge_ref)?.peel_to_commit()?;
        let merge_commit = commit.id();
        let changed_files = diff_against_first_parent(&repo, &commit)?;
        drop(commit);

        debug!(
            "Opened {} at {} ({} changed files)",
            repo.path().display(),
            merge_commit,
            changed_files.len()
        );

        Ok(LocalRepository {
            repo: Mutex::new(repo),
            merge_commit,
            changed_files,
        })
    }

    /// The resolved merge commit id
    pub fn merge_commit(&self) -> String {
        self.merge_commit.to_string()
    }

    /// Number of files the merge commit changed
    pub fn changed_file_count(&self) -> usize {
        self.changed_files.len()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Git2Repo>> {
        self.repo
            .lock()
            .map_err(|_| ReleaseError::remote("Local repository lock poisoned"))
    }

    fn read_file(&self, path: &str) -> Result<Option<String>> {
        let repo = self.lock()?;
        let tree = repo.find_commit(self.merge_commit)?.tree()?;

        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                debug!("File not retrievable: {} ({})", path, e.message());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let blob = entry.to_object(&repo)?.peel_to_blob()?;
        let content = String::from_utf8(blob.content().to_vec())
            .map_err(|_| ReleaseError::remote(format!("{} is not UTF-8 text", path)))?;
        Ok(Some(content))
    }

    fn write_tree(&self, base_ref: &str, entries: &[TreeEntry]) -> Result<String> {
        let repo = self.lock()?;
        let base = repo.revparse_single(base_ref)?.peel_to_tree()?;

        let mut builder = TreeUpdateBuilder::new();
        for entry in entries {
            let blob = repo.blob(entry.content.as_bytes())?;
            builder.upsert(&entry.path, blob, FileMode::Blob);
        }

        Ok(builder.create_updated(&repo, &base)?.to_string())
    }

    fn write_commit(&self, message: &str, tree: &str, parents: &[String]) -> Result<String> {
        let repo = self.lock()?;
        let tree = repo.find_tree(Oid::from_str(tree)?)?;
        let parents = parents
            .iter()
            .map(|p| repo.revparse_single(p)?.peel_to_commit())
            .collect::<std::result::Result<Vec<_>, git2::Error>>()?;
        let parent_refs: Vec<_> = parents.iter().collect();

        let signature = repo
            .signature()
            .or_else(|_| Signature::now("release-bump", "release-bump@localhost"))?;

        let oid = repo.commit(None, &signature, &signature, message, &tree, &parent_refs)?;
        Ok(oid.to_string())
    }

    fn write_ref(&self, name: &str, commit: &str, force: bool, log: &str) -> Result<()> {
        let repo = self.lock()?;
        repo.reference(name, Oid::from_str(commit)?, force, log)?;
        Ok(())
    }
}

fn diff_against_first_parent(repo: &Git2Repo, commit: &git2::Commit<'_>) -> Result<Vec<ChangedFile>> {
    let new_tree = commit.tree()?;
    let old_tree = match commit.parent(0) {
        Ok(parent) => Some(parent.tree()?),
        Err(_) => None,
    };

    let mut diff = repo.diff_tree_to_tree(old_tree.as_ref(), Some(&new_tree), None)?;
    diff.find_similar(Some(DiffFindOptions::new().renames(true)))?;

    let files = diff
        .deltas()
        .filter_map(|delta| {
            let path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())?
                .to_string_lossy()
                .replace('\\', "/");

            let status = match delta.status() {
                Delta::Added => FileStatus::Added,
                Delta::Deleted => FileStatus::Removed,
                Delta::Modified => FileStatus::Modified,
                Delta::Renamed => FileStatus::Renamed,
                Delta::Copied => FileStatus::Copied,
                Delta::Unmodified => FileStatus::Unchanged,
                _ => FileStatus::Changed,
            };
            Some(ChangedFile::new(path, status))
        })
        .collect();

    Ok(files)
}

#[async_trait]
impl RepositoryAccessor for LocalRepository {
    async fn get_file_content(&self, path: &str) -> Result<Option<String>> {
        self.read_file(path)
    }

    async fn create_label(&self, label: &LabelSpec) -> Result<()> {
        info!("Skipping label {} (local repositories have no labels)", label.name);
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
        self.write_tree(base_ref, entries)
    }

    async fn create_commit(&self, message: &str, tree: &str, parents: &[String]) -> Result<String> {
        self.write_commit(message, tree, parents)
    }

    async fn create_tag_ref(&self, name: &str, commit: &str) -> Result<()> {
        self.write_ref(
            &format!("refs/tags/{}", name),
            commit,
            false,
            "release-bump: tag release",
        )
    }

    async fn update_branch_ref(&self, branch: &str, commit: &str) -> Result<()> {
        self.write_ref(
            &format!("refs/heads/{}", branch),
            commit,
            true,
            "release-bump: bump versions",
        )
    }
}
