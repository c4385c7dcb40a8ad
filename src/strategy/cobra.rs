use crate::domain::{Version, VersionBump};
use crate::error::{ReleaseError, Result};
use crate::strategy::{BumpStrategy, FileActions};
use async_trait::async_trait;
use regex::{Captures, Regex};
use std::sync::{Arc, OnceLock};

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\bVersion:\s*"(?P<major>\d+)\.(?P<minor>\d+)\.(?P<patch>\d+)","#)
            .expect("cobra version regex is valid")
    })
}

/// Per-component versions embedded in cobra root commands.
///
/// Each component `<name>` keeps its version on the `Version: "x.y.z",`
/// line of `cmd/<name>/cmd/root.go`. A bump rewrites only the version
/// digits; every other byte of the file is preserved.
pub struct GoCobraStrategy {
    files: Arc<FileActions>,
}

impl GoCobraStrategy {
    pub fn new(files: Arc<FileActions>) -> Self {
        GoCobraStrategy { files }
    }

    /// Path of the root command holding a component's version
    pub fn root_cmd_path(component: &str) -> String {
        format!("cmd/{}/cmd/root.go", component)
    }

    async fn load(&self, component: &str) -> Result<(String, String)> {
        if component.is_empty() {
            return Err(ReleaseError::ComponentNotSupported {
                strategy: self.name().to_string(),
                component: String::new(),
            });
        }

        let path = Self::root_cmd_path(component);
        let content = self
            .files
            .read_file(&path)
            .await?
            .ok_or_else(|| ReleaseError::ComponentNotFound(component.to_string()))?;
        Ok((path, content))
    }
}

fn parse_captures(caps: &Captures<'_>) -> Result<Version> {
    let field = |name: &str| {
        caps[name]
            .parse::<u64>()
            .map_err(|_| ReleaseError::InvalidVersionFormat(caps[0].to_string()))
    };
    Ok(Version::new(field("major")?, field("minor")?, field("patch")?))
}

#[async_trait]
impl BumpStrategy for GoCobraStrategy {
    fn name(&self) -> &str {
        "goCobra"
    }

    async fn current_version(&self, component: &str) -> Result<Version> {
        let (path, content) = self.load(component).await?;
        let caps = version_re()
            .captures(&content)
            .ok_or(ReleaseError::VersionMissing(path))?;
        parse_captures(&caps)
    }

    async fn apply(&self, component: &str, bump: VersionBump) -> Result<Version> {
        let (path, content) = self.load(component).await?;
        let caps = version_re()
            .captures(&content)
            .ok_or_else(|| ReleaseError::VersionMissing(path.clone()))?;
        let current = parse_captures(&caps)?;

        if bump == VersionBump::None {
            return Ok(current);
        }

        let next = current.bump(bump)?;
        // Span of the dotted triple inside the quotes
        let (start, end) = match (caps.name("major"), caps.name("patch")) {
            (Some(major), Some(patch)) => (major.start(), patch.end()),
            _ => return Err(ReleaseError::VersionMissing(path)),
        };

        let mut updated = String::with_capacity(content.len() + 2);
        updated.push_str(&content[..start]);
        updated.push_str(&next.to_string());
        updated.push_str(&content[end..]);

        self.files.write_file(path, updated)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;

    const ROOT_GO: &str = r#"package cmd

var rootCmd = &cobra.Command{
	Use:     "api",
	Version: "1.2.3",
	Short:   "Serve the API",
}
"#;

    fn strategy(repo: MockRepository) -> (GoCobraStrategy, Arc<FileActions>) {
        let files = Arc::new(FileActions::new(Arc::new(repo)));
        (GoCobraStrategy::new(files.clone()), files)
    }

    #[tokio::test]
    async fn test_major_bump_rewrites_only_version() {
        let (strategy, files) =
            strategy(MockRepository::new().with_file("cmd/api/cmd/root.go", ROOT_GO));

        let version = strategy.apply("api", VersionBump::Major).await.unwrap();
        assert_eq!(version, Version::new(2, 0, 0));

        let changes = files.changes();
        let updated = changes.get("cmd/api/cmd/root.go").unwrap();
        assert_eq!(updated, &ROOT_GO.replace("\"1.2.3\"", "\"2.0.0\""));
        assert!(updated.contains(r#"Version: "2.0.0","#));
    }

    #[tokio::test]
    async fn test_current_version_and_none() {
        let (strategy, files) =
            strategy(MockRepository::new().with_file("cmd/api/cmd/root.go", ROOT_GO));

        assert_eq!(
            strategy.current_version("api").await.unwrap(),
            Version::new(1, 2, 3)
        );
        assert_eq!(
            strategy.apply("api", VersionBump::None).await.unwrap(),
            Version::new(1, 2, 3)
        );
        assert!(files.changes().is_empty());
    }

    #[tokio::test]
    async fn test_missing_component() {
        let (strategy, _) = strategy(MockRepository::new());
        let err = strategy.apply("web", VersionBump::Patch).await.unwrap_err();
        assert!(matches!(err, ReleaseError::ComponentNotFound(name) if name == "web"));
    }

    #[tokio::test]
    async fn test_missing_version_marker() {
        let (strategy, _) = strategy(
            MockRepository::new().with_file("cmd/api/cmd/root.go", "package cmd\n"),
        );
        let err = strategy.apply("api", VersionBump::Patch).await.unwrap_err();
        assert!(matches!(err, ReleaseError::VersionMissing(path) if path == "cmd/api/cmd/root.go"));
    }

    #[tokio::test]
    async fn test_whole_repository_not_supported() {
        let (strategy, _) = strategy(MockRepository::new());
        let err = strategy.apply("", VersionBump::Minor).await.unwrap_err();
        assert!(matches!(err, ReleaseError::ComponentNotSupported { .. }));
    }
}
