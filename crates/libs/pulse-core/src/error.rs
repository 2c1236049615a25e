use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io: {0}")]
    Io(String),
    #[error("store encode: {0}")]
    Encode(String),
}
