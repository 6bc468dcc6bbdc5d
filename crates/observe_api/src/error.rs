use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to get queries: {status}:{reason} {body}")]
    Fetch {
        status: u16,
        reason: String,
        body: String,
    },
    #[error("failed to post data: {status} {body}")]
    Publish { status: u16, body: String },
    #[error("http error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;
