/// Failure taxonomy for client operations. Transport and decoding problems
/// get their own variants so callers can always tell "no data" apart from
/// "the call failed".
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("document store rejected the operation: {0}")]
    Persistence(String),

    #[error("blob store operation failed: {0}")]
    Storage(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("{workflow} aborted at step '{step}': {source}")]
    Workflow {
        workflow: &'static str,
        step: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a step failure so callers see which workflow and which step
    /// aborted, with the underlying cause attached.
    pub(crate) fn workflow(workflow: &'static str, step: &'static str, source: Error) -> Self {
        Error::Workflow {
            workflow,
            step,
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
