//! Commit/tag sequencing for a release
//!
//! All staged files go into one tree and one commit on top of the merge
//! commit. Tags are created next, and the branch only moves once every tag
//! exists, so a branch never points at an untagged release commit.
//!
//! Nothing is compensated on failure: a commit or tags created before a
//! later step fails stay in place.

use crate::bump::VersionMap;
use crate::domain::{Tag, TagFormat};
use crate::error::Result;
use crate::event::RepoArgs;
use crate::git::{RepositoryAccessor, TreeEntry};
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::{debug, info};

/// What a successful release wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCommit {
    pub commit: String,
    pub tags: Vec<Tag>,
}

/// Render one tag per released component
pub fn tags_from_versions(format: &TagFormat, versions: &VersionMap) -> Result<Vec<Tag>> {
    let tags = versions
        .iter()
        .map(|(component, version)| format.render(component, version))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "Will be tagged with: {}",
        tags.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", ")
    );
    Ok(tags)
}

/// Commit message listing every component's new version
pub fn commit_message(pull_number: u64, versions: &VersionMap) -> String {
    let mut message = format!(
        "Bumping versions from #{}\n\nThese are the new version numbers:\n",
        pull_number
    );
    for (component, version) in versions {
        let name = if component.is_empty() {
            "(whole repository)"
        } else {
            component.as_str()
        };
        let _ = writeln!(message, "- {}: {}", name, version);
    }
    message
}

/// Write staged changes as one commit atop the merge commit, tag it, then
/// advance the branch.
pub async fn commit_with_tags(
    accessor: &dyn RepositoryAccessor,
    args: &RepoArgs,
    pull_number: u64,
    changes: &BTreeMap<String, String>,
    versions: &VersionMap,
    tags: &[Tag],
) -> Result<ReleaseCommit> {
    let entries: Vec<TreeEntry> = changes
        .iter()
        .map(|(path, content)| TreeEntry {
            path: path.clone(),
            content: content.clone(),
        })
        .collect();

    let tree = accessor.create_tree(&args.git_ref, &entries).await?;

    debug!(
        "Creating commit of tree ({}) atop {} ({})",
        tree, args.branch, args.git_ref
    );
    let message = commit_message(pull_number, versions);
    let commit = accessor
        .create_commit(&message, &tree, &[args.git_ref.clone()])
        .await?;
    info!("New commit with version bumps: {}", commit);

    try_join_all(tags.iter().map(|tag| {
        let commit = commit.as_str();
        async move {
            debug!("Adding tag: {}", tag.name);
            accessor.create_tag_ref(&tag.name, commit).await
        }
    }))
    .await?;

    debug!("Tags added to commit, updating {} ref", args.branch);
    accessor.update_branch_ref(&args.branch, &commit).await?;
    info!("Moved {} to {}", args.branch, commit);

    Ok(ReleaseCommit {
        commit,
        tags: tags.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Version;
    use crate::git::mock::{MockCall, MockRepository};

    fn args() -> RepoArgs {
        RepoArgs {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            git_ref: "merge-sha".to_string(),
            branch: "master".to_string(),
        }
    }

    fn versions() -> VersionMap {
        VersionMap::from([
            (String::new(), Version::new(1, 0, 0)),
            ("api".to_string(), Version::new(0, 3, 0)),
        ])
    }

    #[test]
    fn test_commit_message_names_whole_repository() {
        let message = commit_message(7, &versions());
        assert_eq!(
            message,
            "Bumping versions from #7\n\nThese are the new version numbers:\n\
             - (whole repository): 1.0.0\n\
             - api: 0.3.0\n"
        );
    }

    #[test]
    fn test_tags_from_versions() {
        let format = TagFormat::parse("${component}v${version}").unwrap();
        let tags = tags_from_versions(&format, &versions()).unwrap();
        let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["v1.0.0", "apiv0.3.0"]);
    }

    #[tokio::test]
    async fn test_commit_then_tags_then_branch() {
        let repo = MockRepository::new();
        let format = TagFormat::parse("${component}v${version}").unwrap();
        let tags = tags_from_versions(&format, &versions()).unwrap();
        let changes = BTreeMap::from([("VERSION".to_string(), "1.0.0".to_string())]);

        let release = commit_with_tags(&repo, &args(), 7, &changes, &versions(), &tags)
            .await
            .unwrap();
        assert_eq!(release.commit, "commit-1");

        let calls = repo.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(
            calls[0],
            MockCall::CreateTree {
                base_ref: "merge-sha".to_string(),
                entries: vec![TreeEntry {
                    path: "VERSION".to_string(),
                    content: "1.0.0".to_string(),
                }],
            }
        );
        assert!(matches!(&calls[1], MockCall::CreateCommit { parents, tree, .. }
            if parents == &vec!["merge-sha".to_string()] && tree == "tree-1"));
        assert!(matches!(&calls[2], MockCall::CreateTagRef { commit, .. } if commit == "commit-1"));
        assert!(matches!(&calls[3], MockCall::CreateTagRef { commit, .. } if commit == "commit-1"));
        assert_eq!(
            calls[4],
            MockCall::UpdateBranchRef {
                branch: "master".to_string(),
                commit: "commit-1".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_failed_tag_never_moves_branch() {
        let repo = MockRepository::new().failing_tag("apiv0.3.0");
        let format = TagFormat::parse("${component}v${version}").unwrap();
        let tags = tags_from_versions(&format, &versions()).unwrap();

        let result =
            commit_with_tags(&repo, &args(), 7, &BTreeMap::new(), &versions(), &tags).await;
        assert!(result.is_err());
        assert!(!repo
            .calls()
            .iter()
            .any(|call| matches!(call, MockCall::UpdateBranchRef { .. })));
    }
}
