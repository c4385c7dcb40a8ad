use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::debug;

use release_bump::cli::{run_release, ReleaseRequest};
use release_bump::config::{self, Config};
use release_bump::event::{PullRequest, RepoArgs};
use release_bump::git::{GithubRepository, LocalRepository, RepositoryAccessor};
use release_bump::{output, telemetry};

#[derive(clap::Parser)]
#[command(
    name = "release-bump",
    version,
    about = "Bump component versions from the labels of a merged pull request"
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(
        long,
        env = "GITHUB_EVENT_PATH",
        value_name = "PATH",
        help = "Pull request webhook event payload"
    )]
    event: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Release a local git repository instead of a GitHub one"
    )]
    local: Option<PathBuf>,

    #[arg(long = "label", value_name = "NAME", help = "Pull request label (local mode, repeatable)")]
    labels: Vec<String>,

    #[arg(long, default_value = "HEAD", help = "Merge commit to release (local mode)")]
    merge_ref: String,

    #[arg(long, default_value_t = 0, help = "Pull request number for the commit message (local mode)")]
    pull_number: u64,

    #[arg(long, help = "Label that asks for new component detection")]
    new_component_label: Option<String>,

    #[arg(long, help = "Comma-separated component globs")]
    component_globs: Option<String>,

    #[arg(long, help = "Built-in bump script name or ./path to a script in the repository")]
    bump_script: Option<String>,

    #[arg(long, help = "Bump label template")]
    bump_label_format: Option<String>,

    #[arg(long, help = "Tag name template")]
    tag_format: Option<String>,

    #[arg(long, help = "Branch pull requests merge into")]
    base_branch: Option<String>,

    #[arg(long, help = "GitHub REST API base URL")]
    api_url: Option<String>,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    verbose: u8,

    #[arg(long, help = "Emit logs as JSON lines")]
    log_json: bool,
}

impl Args {
    /// Command line flags take precedence over files and action inputs
    fn apply_overrides(&self, config: &mut Config) -> Result<()> {
        let overrides = [
            ("new-component-label", &self.new_component_label),
            ("component-globs", &self.component_globs),
            ("bump-script", &self.bump_script),
            ("bump-label-format", &self.bump_label_format),
            ("tag-format", &self.tag_format),
            ("base-branch", &self.base_branch),
            ("api-url", &self.api_url),
        ];

        for (name, value) in overrides {
            if let Some(value) = value {
                config.set(name, value.clone())?;
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init_tracing(args.log_json, telemetry::level_for(args.verbose));

    if let Err(e) = run(args).await {
        output::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let mut config = config::load_config(args.config.as_deref())?;
    config.apply_env()?;
    args.apply_overrides(&mut config)?;
    if config.repo_token.is_empty() {
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            config.repo_token = token;
        }
    }
    let settings = config.validate()?;

    let (request, accessor) = match &args.local {
        Some(path) => local_backend(&args, &config, path)?,
        None => github_backend(&args, &config)?,
    };

    let outcome = run_release(&config, &settings, &request, accessor).await?;

    let tags = outcome
        .release
        .as_ref()
        .map(|release| release.tags.as_slice())
        .unwrap_or_default();
    output::display_summary(&outcome.versions, tags);
    output::publish(&outcome.versions)?;
    Ok(())
}

fn local_backend(
    args: &Args,
    config: &Config,
    path: &Path,
) -> Result<(ReleaseRequest, Arc<dyn RepositoryAccessor>)> {
    let repo = LocalRepository::open(path, &args.merge_ref)
        .with_context(|| format!("Failed to open repository at {}", path.display()))?;
    debug!("Releasing local repository {} at {}", path.display(), repo.merge_commit());

    let request = ReleaseRequest {
        pull_number: args.pull_number,
        labels: args.labels.clone(),
        changed_files: repo.changed_file_count(),
        repo_args: RepoArgs {
            owner: "local".to_string(),
            repo: path.display().to_string(),
            git_ref: repo.merge_commit(),
            branch: config.base_branch.clone(),
        },
    };
    Ok((request, Arc::new(repo)))
}

fn github_backend(
    args: &Args,
    config: &Config,
) -> Result<(ReleaseRequest, Arc<dyn RepositoryAccessor>)> {
    let Some(event) = args.event.as_ref() else {
        bail!("No pull request event given; set GITHUB_EVENT_PATH or pass --event");
    };
    let pr = PullRequest::from_event_file(event)
        .with_context(|| format!("Failed to read event {}", event.display()))?;
    let request = ReleaseRequest::from_pull_request(&pr, &config.base_branch)?;

    if config.repo_token.is_empty() {
        bail!("No repo-token given");
    }

    let repo = GithubRepository::new(
        &config.api_url,
        &config.repo_token,
        request.repo_args.clone(),
        request.pull_number,
    )?;
    Ok((request, Arc::new(repo)))
}
