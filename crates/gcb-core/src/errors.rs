/// Core error type for the code notifier.
///
/// Adapter crates map their specific errors into this type so the pipeline can
/// tell apart "skip this cycle" (fetch/store) from "retry this entry next tick"
/// (delivery).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("feed fetch failed: {0}")]
    Fetch(String),

    #[error("ledger store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::StoreUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
