#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
}
