use thiserror::Error;

/// Ways a chat exchange can fail.
///
/// Every variant is recovered inside the conversation manager; callers only
/// see the fallback reply and a notice.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Network-level failure (unreachable host, timeout, broken body)
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-2xx status
    #[error("backend returned status {0}")]
    Status(reqwest::StatusCode),

    /// Body was not the expected JSON shape
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Backend answered `success: false`
    #[error("backend rejected the message: {}", .error.as_deref().unwrap_or("no reason given"))]
    Rejected { error: Option<String> },

    /// Backend reported success without reply text
    #[error("backend returned an empty reply")]
    EmptyReply,

    /// The exchange task ended before reporting an outcome
    #[error("exchange ended without an outcome")]
    Aborted,
}
