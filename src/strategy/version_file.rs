use crate::domain::{Version, VersionBump};
use crate::error::{ReleaseError, Result};
use crate::strategy::{BumpStrategy, FileActions};
use async_trait::async_trait;
use std::sync::Arc;

/// File holding the whole repository's version
pub const VERSION_FILE: &str = "VERSION";

/// One version for the whole repository, stored as a bare `X.Y.Z` in
/// `/VERSION`. A missing file counts as `0.0.0`.
///
/// Only bump labels without a component name are supported.
pub struct VersionFileStrategy {
    files: Arc<FileActions>,
}

impl VersionFileStrategy {
    pub fn new(files: Arc<FileActions>) -> Self {
        VersionFileStrategy { files }
    }
}

#[async_trait]
impl BumpStrategy for VersionFileStrategy {
    fn name(&self) -> &str {
        "versionFile"
    }

    async fn current_version(&self, component: &str) -> Result<Version> {
        if !component.is_empty() {
            return Err(ReleaseError::ComponentNotSupported {
                strategy: self.name().to_string(),
                component: component.to_string(),
            });
        }

        match self.files.read_file(VERSION_FILE).await? {
            Some(content) => Version::parse(&content),
            None => Ok(Version::default()),
        }
    }

    async fn apply(&self, component: &str, bump: VersionBump) -> Result<Version> {
        let current = self.current_version(component).await?;
        if bump == VersionBump::None {
            return Ok(current);
        }

        let next = current.bump(bump)?;
        self.files.write_file(VERSION_FILE, next.to_string())?;
        Ok(next)
    }
}
