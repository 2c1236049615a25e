use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("channel io: {0}")]
    Io(String),
    #[error("channel encode: {0}")]
    Encode(String),
    #[error("invalid channel state: {0}")]
    InvalidState(&'static str),
}
