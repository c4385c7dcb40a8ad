use crate::domain::LabelSpec;
use crate::error::{ReleaseError, Result};
use crate::event::RepoArgs;
use crate::git::{ChangedFile, RepositoryAccessor, TreeEntry};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Regular, non-executable file. Executable bits are not carried over.
const BLOB_MODE: &str = "100644";

#[derive(Deserialize)]
struct ShaResponse {
    sha: String,
}

/// GitHub REST API access for one pull request's repository
pub struct GithubRepository {
    client: reqwest::Client,
    api_url: Url,
    token: String,
    args: RepoArgs,
    pull_number: u64,
}

impl GithubRepository {
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        args: RepoArgs,
        pull_number: u64,
    ) -> Result<Self> {
        let api_url = api_url.into();
        let parsed = Url::parse(&api_url)
            .map_err(|e| ReleaseError::config(format!("Invalid api-url '{}': {}", api_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(ReleaseError::config(format!(
                "Invalid api-url '{}': not a base URL",
                api_url
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("release-bump/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(GithubRepository {
            client,
            api_url: parsed,
            token: token.into(),
            args,
            pull_number,
        })
    }

    /// URL of a repository endpoint; every segment is percent-encoded.
    ///
    /// Slashes inside a segment split it, so repository paths and branch
    /// names keep their hierarchy.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| ReleaseError::config(format!("Invalid api-url '{}'", self.api_url)))?
            .pop_if_empty()
            .extend(["repos", self.args.owner.as_str(), self.args.repo.as_str()])
            .extend(segments.iter().copied().flat_map(|segment| segment.split('/')));
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        self.request_as(method, segments, "application/vnd.github+json")
    }

    fn request_as(
        &self,
        method: Method,
        segments: &[&str],
        accept: &str,
    ) -> Result<RequestBuilder> {
        let builder = self
            .client
            .request(method, self.endpoint(segments)?)
            .header("Accept", accept)
            .header("X-GitHub-Api-Version", "2022-11-28");

        if self.token.is_empty() {
            Ok(builder)
        } else {
            Ok(builder.bearer_auth(&self.token))
        }
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ReleaseError::remote(format!(
            "{} returned {}: {}",
            what, status, body
        )))
    }
}

#[async_trait]
impl RepositoryAccessor for GithubRepository {
    async fn get_file_content(&self, path: &str) -> Result<Option<String>> {
        let response = self
            .request_as(Method::GET, &["contents", path], "application/vnd.github.raw")?
            .query(&[("ref", self.args.git_ref.as_str())])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("File not retrievable: {} (404)", path);
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ReleaseError::remote(format!(
                "Reading {} returned {}: {}",
                path, status, body
            )));
        }

        Ok(Some(response.text().await?))
    }

    async fn create_label(&self, label: &LabelSpec) -> Result<()> {
        let builder = self.request(Method::POST, &["labels"])?.json(&json!({
            "name": label.name,
            "color": label.color,
            "description": label.description,
        }));
        self.send(builder, &format!("Creating label {}", label.name))
            .await?;
        Ok(())
    }

    async fn list_changed_files(&self, page: usize, per_page: usize) -> Result<Vec<ChangedFile>> {
        // GitHub pages are 1-based
        let page = (page + 1).to_string();
        let per_page = per_page.to_string();
        let pull_number = self.pull_number.to_string();
        let builder = self
            .request(Method::GET, &["pulls", pull_number.as_str(), "files"])?
            .query(&[("page", page.as_str()), ("per_page", per_page.as_str())]);

        let response = self.send(builder, "Listing changed files").await?;
        Ok(response.json().await?)
    }

    async fn create_tree(&self, base_ref: &str, entries: &[TreeEntry]) -> Result<String> {
        let tree: Vec<_> = entries
            .iter()
            .map(|entry| {
                json!({
                    "path": entry.path,
                    "mode": BLOB_MODE,
                    "type": "blob",
                    "content": entry.content,
                })
            })
            .collect();

        let builder = self
            .request(Method::POST, &["git", "trees"])?
            .json(&json!({ "base_tree": base_ref, "tree": tree }));
        let response = self.send(builder, "Creating tree").await?;
        Ok(response.json::<ShaResponse>().await?.sha)
    }

    async fn create_commit(&self, message: &str, tree: &str, parents: &[String]) -> Result<String> {
        let builder = self.request(Method::POST, &["git", "commits"])?.json(&json!({
            "message": message,
            "tree": tree,
            "parents": parents,
        }));
        let response = self.send(builder, "Creating commit").await?;
        Ok(response.json::<ShaResponse>().await?.sha)
    }

    async fn create_tag_ref(&self, name: &str, commit: &str) -> Result<()> {
        let builder = self.request(Method::POST, &["git", "refs"])?.json(&json!({
            "ref": format!("refs/tags/{}", name),
            "sha": commit,
        }));
        self.send(builder, &format!("Creating tag {}", name)).await?;
        Ok(())
    }

    async fn update_branch_ref(&self, branch: &str, commit: &str) -> Result<()> {
        let builder = self
            .request(Method::PATCH, &["git", "refs", "heads", branch])?
            .json(&json!({ "sha": commit, "force": false }));
        self.send(builder, &format!("Updating branch {}", branch))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::FileStatus;
    use mockito::Matcher;

    fn repo(server: &mockito::Server) -> GithubRepository {
        let args = RepoArgs {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            git_ref: "abc123".to_string(),
            branch: "master".to_string(),
        };
        GithubRepository::new(server.url(), "secret", args, 42).unwrap()
    }

    #[tokio::test]
    async fn test_get_file_content_reads_at_merge_commit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/acme/widgets/contents/VERSION")
            .match_query(Matcher::UrlEncoded("ref".into(), "abc123".into()))
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_body("1.4.0")
            .create_async()
            .await;

        let content = repo(&server).get_file_content("VERSION").await.unwrap();
        assert_eq!(content, Some("1.4.0".to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_file_content_missing_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/acme/widgets/contents/VERSION")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;

        assert_eq!(repo(&server).get_file_content("VERSION").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_changed_files_uses_one_based_pages() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/acme/widgets/pulls/42/files")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("per_page".into(), "100".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"filename": "cmd/api/main.go", "status": "added"}]"#)
            .create_async()
            .await;

        let files = repo(&server).list_changed_files(0, 100).await.unwrap();
        assert_eq!(files, vec![ChangedFile::new("cmd/api/main.go", FileStatus::Added)]);
    }

    #[tokio::test]
    async fn test_create_tag_ref() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/repos/acme/widgets/git/refs")
            .match_body(Matcher::Json(json!({
                "ref": "refs/tags/api-v1.0.0",
                "sha": "def456",
            })))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;

        repo(&server)
            .create_tag_ref("api-v1.0.0", "def456")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_commit_returns_sha() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/repos/acme/widgets/git/commits")
            .match_body(Matcher::PartialJson(json!({
                "tree": "tree789",
                "parents": ["abc123"],
            })))
            .with_status(201)
            .with_body(r#"{"sha": "def456"}"#)
            .create_async()
            .await;

        let sha = repo(&server)
            .create_commit("Bumping versions", "tree789", &["abc123".to_string()])
            .await
            .unwrap();
        assert_eq!(sha, "def456");
    }

    #[tokio::test]
    async fn test_failed_status_is_remote_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/repos/acme/widgets/git/refs/heads/master")
            .with_status(422)
            .with_body(r#"{"message": "Update is not a fast forward"}"#)
            .create_async()
            .await;

        let err = repo(&server)
            .update_branch_ref("master", "def456")
            .await
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Remote(_)));
        assert!(err.to_string().contains("422"));
    }

    #[tokio::test]
    async fn test_get_file_content_encodes_path_segments() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/acme/widgets/contents/docs/100%25/a%23b%3F.md")
            .match_query(Matcher::UrlEncoded("ref".into(), "abc123".into()))
            .with_status(200)
            .with_body("notes")
            .create_async()
            .await;

        let content = repo(&server)
            .get_file_content("docs/100%/a#b?.md")
            .await
            .unwrap();
        assert_eq!(content, Some("notes".to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_url_path_prefix_is_kept() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v3/repos/acme/widgets/contents/VERSION")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("2.0.0")
            .create_async()
            .await;

        let args = RepoArgs {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            git_ref: "abc123".to_string(),
            branch: "master".to_string(),
        };
        let enterprise =
            GithubRepository::new(format!("{}/api/v3/", server.url()), "", args, 42).unwrap();

        assert_eq!(
            enterprise.get_file_content("VERSION").await.unwrap(),
            Some("2.0.0".to_string())
        );
        mock.assert_async().await;
    }

    #[test]
    fn test_invalid_api_url_is_configuration_error() {
        let args = RepoArgs {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            git_ref: "abc123".to_string(),
            branch: "master".to_string(),
        };
        let err = GithubRepository::new("not a url", "secret", args, 42)
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_create_label_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/repos/acme/widgets/labels")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::Json(json!({
                "name": "api/major",
                "color": "00a396",
                "description": "major SemVer bump to `api`",
            })))
            .with_status(201)
            .with_body(r#"{"id": 1, "name": "api/major"}"#)
            .create_async()
            .await;

        let label = LabelSpec {
            name: "api/major".to_string(),
            color: "00a396".to_string(),
            description: "major SemVer bump to `api`".to_string(),
        };
        repo(&server).create_label(&label).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_tree_writes_regular_blobs_on_merge_tree() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/repos/acme/widgets/git/trees")
            .match_body(Matcher::Json(json!({
                "base_tree": "abc123",
                "tree": [
                    {
                        "path": "VERSION",
                        "mode": "100644",
                        "type": "blob",
                        "content": "1.5.0",
                    },
                    {
                        "path": "cmd/api/cmd/root.go",
                        "mode": "100644",
                        "type": "blob",
                        "content": "Version: \"0.2.0\"",
                    },
                ],
            })))
            .with_status(201)
            .with_body(r#"{"sha": "tree789", "tree": []}"#)
            .create_async()
            .await;

        let entries = vec![
            TreeEntry {
                path: "VERSION".to_string(),
                content: "1.5.0".to_string(),
            },
            TreeEntry {
                path: "cmd/api/cmd/root.go".to_string(),
                content: "Version: \"0.2.0\"".to_string(),
            },
        ];
        let sha = repo(&server).create_tree("abc123", &entries).await.unwrap();
        assert_eq!(sha, "tree789");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_branch_ref_is_not_forced() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/repos/acme/widgets/git/refs/heads/release/1.x")
            .match_body(Matcher::Json(json!({ "sha": "def456", "force": false })))
            .with_status(200)
            .with_body(r#"{"ref": "refs/heads/release/1.x"}"#)
            .create_async()
            .await;

        repo(&server)
            .update_branch_ref("release/1.x", "def456")
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
