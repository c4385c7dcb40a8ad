use thiserror::Error;

/// Unified error type for release-bump operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown bump type \"{0}\"")]
    InvalidBumpKind(String),

    #[error("No value for {{{0}}} given in arguments")]
    MissingField(String),

    #[error("No bump script named {0}")]
    UnknownStrategy(String),

    #[error("This PR was not merged into {0}")]
    NotMerged(String),

    #[error("There is no component named '{0}'")]
    ComponentNotFound(String),

    #[error("The {strategy} bump script does not work with component names (got '{component}')")]
    ComponentNotSupported { strategy: String, component: String },

    #[error("Version information is missing from {0}")]
    VersionMissing(String),

    #[error("Invalid version format: '{0}' - expected X.Y.Z")]
    InvalidVersionFormat(String),

    #[error("Version {version} cannot take a {bump} bump")]
    VersionOverflow { version: String, bump: String },

    #[error("Bump script not found in repository: {0}")]
    ScriptNotFound(String),

    #[error("Bump script failed: {0}")]
    Script(String),

    #[error("Remote operation failed: {0}")]
    Remote(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in release-bump
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a script error with context
    pub fn script(msg: impl Into<String>) -> Self {
        ReleaseError::Script(msg.into())
    }

    /// Create a remote error with context
    pub fn remote(msg: impl Into<String>) -> Self {
        ReleaseError::Remote(msg.into())
    }

    /// Whether this error stems from bad configuration rather than repository state
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ReleaseError::Config(_)
                | ReleaseError::InvalidBumpKind(_)
                | ReleaseError::MissingField(_)
                | ReleaseError::UnknownStrategy(_)
        )
    }
}
