use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitWiseError {
    #[error("Not a git repository. Please run this command inside a git repository.")]
    NotAGitRepo,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No staged files found. Stage your changes using 'git add' first.")]
    NoStagedChanges,

    #[error("No tokenizer available for model '{0}'")]
    UnsupportedModel(String),

    #[error("Commit message generation failed: {0}")]
    Generation(String),

    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Git commit failed: {0}")]
    CommitFailed(String),

    #[error("Input error: {0}")]
    Prompt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<dialoguer::Error> for GitWiseError {
    fn from(err: dialoguer::Error) -> Self {
        GitWiseError::Prompt(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GitWiseError>;
