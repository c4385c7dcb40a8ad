//! Bump orchestration: which components change and to what version
//!
//! Work fans out concurrently and fans back in; the first failure aborts the
//! whole group. Versions already staged by finished bumps are not rolled
//! back, the run simply never commits them.

use crate::domain::{BumpLabelFormat, ComponentGlobs, LabelPalette, LabelSpec, Version, VersionBump};
use crate::error::{ReleaseError, Result};
use crate::git::RepositoryAccessor;
use crate::strategy::BumpStrategy;
use futures::future::try_join_all;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Component name to version; `""` is the whole repository
pub type VersionMap = BTreeMap<String, Version>;

/// Page size used when listing a pull request's changed files
pub const CHANGED_FILES_PAGE_SIZE: usize = 100;

/// Find components the pull request added and report their current versions.
///
/// Every page of changed files is fetched concurrently. A file counts when
/// it was added or renamed and its path matches one of the component globs.
pub async fn new_components_from_pr(
    accessor: &dyn RepositoryAccessor,
    changed_files: usize,
    strategy: &dyn BumpStrategy,
    globs: &ComponentGlobs,
) -> Result<VersionMap> {
    let pages = changed_files.div_ceil(CHANGED_FILES_PAGE_SIZE);

    let found = try_join_all((0..pages).map(|page| async move {
        let files = accessor
            .list_changed_files(page, CHANGED_FILES_PAGE_SIZE)
            .await?;

        let components = files
            .into_iter()
            .filter(|file| file.status.is_new())
            .filter_map(|file| globs.component_of(&file.path));

        try_join_all(components.map(|component| async move {
            let version = strategy.apply(&component, VersionBump::None).await?;
            Ok::<_, ReleaseError>((component, version))
        }))
        .await
    }))
    .await?;

    let components: VersionMap = found.into_iter().flatten().collect();
    if !components.is_empty() {
        info!(
            "New components: {}",
            components.keys().cloned().collect::<Vec<_>>().join(", ")
        );
    }
    Ok(components)
}

/// Apply every requested bump concurrently
pub async fn perform_bumps(
    strategy: &dyn BumpStrategy,
    bumps: &BTreeMap<String, VersionBump>,
) -> Result<VersionMap> {
    let bumped = try_join_all(bumps.iter().map(|(component, &bump)| async move {
        let version = strategy.apply(component, bump).await?;
        debug!("Bumped {:?} ({}) to {}", component, bump, version);
        Ok::<_, ReleaseError>((component.clone(), version))
    }))
    .await?;

    Ok(bumped.into_iter().collect())
}

/// Merge detected and bumped versions; an explicit bump wins over the
/// initial version of a newly detected component.
pub fn merge_versions(new_components: VersionMap, bumped: VersionMap) -> VersionMap {
    let mut versions = new_components;
    versions.extend(bumped);
    versions
}

/// Create the major, minor and patch labels for each new component
pub async fn create_component_labels(
    accessor: &dyn RepositoryAccessor,
    components: &[String],
    format: &BumpLabelFormat,
    palette: &LabelPalette,
) -> Result<()> {
    let mut labels = Vec::new();
    for component in components {
        labels.extend(LabelSpec::for_component(component, format, palette)?);
    }

    try_join_all(labels.iter().map(|label| async move {
        debug!("Creating label {}", label.name);
        accessor.create_label(label).await
    }))
    .await?;
    Ok(())
}
