//! Main release workflow orchestration
//!
//! Ties the bump orchestrator and the commit/tag sequencer together for one
//! merged pull request. Argument parsing and backend selection stay in
//! main.rs, so the workflow can be driven programmatically against any
//! [RepositoryAccessor].

use std::sync::Arc;

use tracing::{debug, info};

use crate::bump::{
    create_component_labels, merge_versions, new_components_from_pr, perform_bumps, VersionMap,
};
use crate::config::{Config, ReleaseSettings};
use crate::domain::find_bumps;
use crate::error::{ReleaseError, Result};
use crate::event::{PullRequest, RepoArgs};
use crate::git::RepositoryAccessor;
use crate::sequencer::{commit_with_tags, tags_from_versions, ReleaseCommit};
use crate::strategy::{resolve_strategy, FileActions};

/// The trigger of a release run
///
/// Mirrors the fields of the merged pull request the workflow needs, so
/// local runs can build one without a webhook payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    pub pull_number: u64,
    pub labels: Vec<String>,
    /// Number of files the pull request changed, used to page through them
    pub changed_files: usize,
    pub repo_args: RepoArgs,
}

impl ReleaseRequest {
    /// Build a request from a pull request event, rejecting unmerged ones
    pub fn from_pull_request(pr: &PullRequest, base_branch: &str) -> Result<Self> {
        Ok(ReleaseRequest {
            pull_number: pr.number,
            labels: pr.label_names(),
            changed_files: pr.changed_files,
            repo_args: pr.repo_args(base_branch)?,
        })
    }
}

/// Result of a release run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOutcome {
    /// New version per component; empty when nothing was released
    pub versions: VersionMap,

    /// The commit and tags written, if any version changed
    pub release: Option<ReleaseCommit>,
}

/// Main release workflow
///
/// 1. Resolve the bump strategy
/// 2. Detect new components when globs are set and the new-component label is present
/// 3. Create labels for new components, concurrently with everything below
/// 4. Apply the bumps requested by labels and merge them over detected versions
/// 5. Commit staged changes, tag the commit, then advance the branch
///
/// Label creation never interrupts the release: both run to completion and
/// the release error, if any, is reported ahead of a label error. A failure
/// inside the release aborts its remaining steps. Remote writes made before
/// the failure stay.
pub async fn run_release(
    config: &Config,
    settings: &ReleaseSettings,
    request: &ReleaseRequest,
    accessor: Arc<dyn RepositoryAccessor>,
) -> Result<ReleaseOutcome> {
    debug!(
        "Working with {}/{} at {} ({})",
        request.repo_args.owner,
        request.repo_args.repo,
        request.repo_args.branch,
        request.repo_args.git_ref
    );

    let files = Arc::new(FileActions::new(accessor.clone()));
    let strategy = resolve_strategy(&config.bump_script, files.clone()).await?;

    let new_components = match &settings.component_globs {
        Some(globs) if wants_new_components(config, &request.labels) => {
            new_components_from_pr(
                accessor.as_ref(),
                request.changed_files,
                strategy.as_ref(),
                globs,
            )
            .await?
        }
        _ => VersionMap::new(),
    };
    let new_names: Vec<String> = new_components.keys().cloned().collect();

    let labels_job = async {
        if new_names.is_empty() {
            return Ok(());
        }
        create_component_labels(
            accessor.as_ref(),
            &new_names,
            &settings.bump_label_format,
            &settings.label_palette,
        )
        .await
    };

    let release_job = async {
        let bumps = find_bumps(&request.labels, &settings.bump_label_format);
        let bumped = perform_bumps(strategy.as_ref(), &bumps).await?;
        let versions = merge_versions(new_components, bumped);

        if versions.is_empty() {
            info!("No version changes requested");
            return Ok((versions, None));
        }

        let tags = tags_from_versions(&settings.tag_format, &versions)?;
        let release = commit_with_tags(
            accessor.as_ref(),
            &request.repo_args,
            request.pull_number,
            &files.changes(),
            &versions,
            &tags,
        )
        .await?;
        Ok::<_, ReleaseError>((versions, Some(release)))
    };

    let (released, labelled) = futures::join!(release_job, labels_job);
    let (versions, release) = released?;
    labelled?;
    Ok(ReleaseOutcome { versions, release })
}

fn wants_new_components(config: &Config, labels: &[String]) -> bool {
    !config.new_component_label.is_empty()
        && labels.iter().any(|label| label == &config.new_component_label)
}
