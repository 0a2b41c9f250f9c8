#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
    #[error("canonical model {0} not found")]
    ModelNotFound(i64),
    #[error("alias {0:?} not found")]
    AliasNotFound(String),
}
