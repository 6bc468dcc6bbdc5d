#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("time parse error: {0}")]
    TimeParse(#[from] chrono::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("statement failed: {status} {body}")]
    Statement { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("lookup task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("statement {handle} did not finish in time")]
    StatementTimeout { handle: String },
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, WarehouseError>;
