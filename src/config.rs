use crate::domain::{BumpLabelFormat, ComponentGlobs, LabelPalette, TagFormat};
use crate::error::{ReleaseError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Name of the configuration file looked up in the working directory and
/// the user config directory
pub const CONFIG_FILE: &str = "release-bump.toml";

/// Action inputs, in the names the action declares them
pub const INPUT_NAMES: [&str; 9] = [
    "repo-token",
    "new-component-label",
    "component-globs",
    "bump-script",
    "bump-label-format",
    "tag-format",
    "base-branch",
    "label-colors",
    "api-url",
];

/// Represents the complete configuration for a release run.
///
/// Every field can come from a TOML file, from GitHub Actions inputs
/// (`INPUT_<NAME>` environment variables) or from command line flags.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    #[serde(skip_serializing)]
    pub repo_token: String,

    /// Label that asks for new components to be detected
    pub new_component_label: String,

    /// Comma-separated component globs; empty disables detection
    pub component_globs: String,

    /// Built-in strategy name or `./path` to a script in the repository
    pub bump_script: String,

    pub bump_label_format: String,

    pub tag_format: String,

    /// Branch pull requests must merge into; it is advanced to the release commit
    pub base_branch: String,

    /// Colours of the major, minor and patch labels
    pub label_colors: Vec<String>,

    pub api_url: String,
}

impl Default for Config {
    fn default() -> Self {
        let palette = LabelPalette::default();
        Config {
            repo_token: String::new(),
            new_component_label: "new-component".to_string(),
            component_globs: String::new(),
            bump_script: String::new(),
            bump_label_format: "${component}/${bumpType}".to_string(),
            tag_format: "${component}-v${version}".to_string(),
            base_branch: "master".to_string(),
            label_colors: vec![palette.major, palette.minor, palette.patch],
            api_url: "https://api.github.com".to_string(),
        }
    }
}

/// Templates, globs and colours compiled once before a run starts
#[derive(Debug, Clone)]
pub struct ReleaseSettings {
    pub bump_label_format: BumpLabelFormat,
    pub tag_format: TagFormat,
    pub component_globs: Option<ComponentGlobs>,
    pub label_palette: LabelPalette,
}

impl Config {
    /// Override fields with the action inputs `lookup` knows about.
    ///
    /// `lookup` receives environment variable names such as
    /// `INPUT_COMPONENT-GLOBS`; inputs that are present but empty still
    /// override, so an empty `component-globs` disables detection.
    pub fn apply_action_inputs<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for name in INPUT_NAMES {
            let Some(value) = lookup(&format!("INPUT_{}", name.to_uppercase())) else {
                continue;
            };
            self.set(name, value)?;
        }
        Ok(())
    }

    /// Override fields from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_action_inputs(|key| std::env::var(key).ok())
    }

    /// Set one field by its input name
    pub fn set(&mut self, name: &str, value: String) -> Result<()> {
        match name {
            "repo-token" => self.repo_token = value,
            "new-component-label" => self.new_component_label = value,
            "component-globs" => self.component_globs = value,
            "bump-script" => self.bump_script = value,
            "bump-label-format" => self.bump_label_format = value,
            "tag-format" => self.tag_format = value,
            "base-branch" => self.base_branch = value,
            "label-colors" => {
                self.label_colors = value
                    .split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect()
            }
            "api-url" => self.api_url = value,
            other => {
                return Err(ReleaseError::config(format!("Unknown input '{}'", other)));
            }
        }
        Ok(())
    }

    /// Compile templates, globs and colours, failing before any remote call
    pub fn validate(&self) -> Result<ReleaseSettings> {
        if self.base_branch.is_empty() {
            return Err(ReleaseError::config("base-branch must not be empty"));
        }

        Ok(ReleaseSettings {
            bump_label_format: BumpLabelFormat::parse(&self.bump_label_format)?,
            tag_format: TagFormat::parse(&self.tag_format)?,
            component_globs: ComponentGlobs::parse(&self.component_globs)?,
            label_palette: LabelPalette::from_colors(&self.label_colors)?,
        })
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `release-bump.toml` in current directory
/// 3. `release-bump.toml` in the user config directory
/// 4. Default configuration if no file found
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)?
    } else if Path::new(CONFIG_FILE).exists() {
        fs::read_to_string(CONFIG_FILE)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    toml::from_str(&config_str)
        .map_err(|e| ReleaseError::config(format!("Invalid {}: {}", CONFIG_FILE, e)))
}
