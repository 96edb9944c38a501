use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed PO entry at line {line}: {reason}")]
    MalformedEntry { line: usize, reason: String },
}
