use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database operation failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Stored row is unreadable: {0}")]
    CorruptRow(String),
}
