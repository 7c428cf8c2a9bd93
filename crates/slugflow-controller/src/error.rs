use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("controller request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("controller rejected the request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("controller response missing field: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, ControllerError>;
