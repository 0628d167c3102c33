use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("invalid service account credentials: {0}")]
    Credentials(String),

    #[error("permission denied fetching {0}")]
    PermissionDenied(String),

    #[error("file {0} not found in remote store")]
    NotFound(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("failed to parse dataset: {0}")]
    Parse(String),

    /// Neither the requested month nor the one before it has any records.
    #[error("no records for {year}-{month:02} or the month before it")]
    NoDataForPeriod { year: i32, month: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        DashboardError::Fetch(err.to_string())
    }
}
