use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Malformed catalog document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },
}

pub type Result<T> = std::result::Result<T, LibraryError>;
