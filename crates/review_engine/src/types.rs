use std::fmt;

/// Where a page currently is in its fetch-extract cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Requesting,
    Retrying,
    Extracting,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageProgress {
    pub page: u32,
    pub stage: Stage,
    pub attempt: u32,
    pub records: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestEvent {
    Progress(PageProgress),
    Finished {
        reviews: usize,
        pages: u32,
        complete: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub redirect_count: usize,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    /// Zero-length, undecodable or structurally unrecognizable body.
    Empty,
    Network,
}

impl FailureKind {
    /// Whether another attempt at the same page could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FailureKind::HttpStatus(code) => *code != 404,
            FailureKind::Timeout | FailureKind::Empty | FailureKind::Network => true,
            FailureKind::InvalidUrl | FailureKind::TooLarge { .. } => false,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Empty => write!(f, "empty or unparseable body"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
