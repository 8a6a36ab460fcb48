use std::io;

#[derive(Debug, thiserror::Error)]
pub enum SupportError {
    #[error("cannot authenticate to Slack: {0}")]
    Authentication(#[source] Box<SupportError>),

    #[error("unable to locate output_base: {0}")]
    OutputBase(#[source] Box<SupportError>),

    #[error("cannot post to Slack: {0}")]
    PostMessage(#[source] Box<SupportError>),

    #[error("failed to upload command.log: {0}")]
    UploadLog(#[source] Box<SupportError>),

    #[error("Not inside a Bazel workspace (no MODULE.bazel, REPO.bazel or WORKSPACE found above {0})")]
    NotInWorkspace(String),

    #[error("{binary} not found in PATH. Install Bazel or Bazelisk first.")]
    BuildToolMissing { binary: String },

    #[error("{command} failed: {stderr}")]
    BuildTool { command: String, stderr: String },

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("access token is empty")]
    EmptyToken,

    #[error("slack {method} failed: {error}")]
    SlackApi { method: String, error: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("interrupted")]
    Interrupted,

    #[error("{0}")]
    Other(String),
}

impl SupportError {
    pub fn authentication(err: SupportError) -> Self {
        SupportError::Authentication(Box::new(err))
    }

    pub fn output_base(err: SupportError) -> Self {
        SupportError::OutputBase(Box::new(err))
    }

    pub fn post_message(err: SupportError) -> Self {
        SupportError::PostMessage(Box::new(err))
    }

    pub fn upload_log(err: SupportError) -> Self {
        SupportError::UploadLog(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, SupportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_errors_name_the_failed_step() {
        let err = SupportError::post_message(SupportError::SlackApi {
            method: "chat.postMessage".to_string(),
            error: "channel_not_found".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "cannot post to Slack: slack chat.postMessage failed: channel_not_found"
        );

        let err = SupportError::output_base(SupportError::BuildTool {
            command: "bazel info output_base".to_string(),
            stderr: "ERROR: no workspace".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "unable to locate output_base: bazel info output_base failed: ERROR: no workspace"
        );
    }

    #[test]
    fn step_errors_expose_their_cause() {
        use std::error::Error;

        let err = SupportError::upload_log(SupportError::EmptyToken);
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "access token is empty");
    }

    #[test]
    fn json_errors_convert() {
        let err: SupportError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, SupportError::Json(_)));
        assert!(err.to_string().starts_with("JSON error: "));
    }
}
