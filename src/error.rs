#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("remote service unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: u64 },

    #[error("malformed callback token: {0:?}")]
    MalformedToken(String),

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("storage error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BotError::Parse(err.to_string())
        } else {
            BotError::RemoteUnavailable(err.to_string())
        }
    }
}
