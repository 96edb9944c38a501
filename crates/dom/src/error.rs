use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomError {
    #[error("XML parsing error: {0}")]
    Parse(#[from] roxmltree::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid UTF-8 in serialized output: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("node {0} is not an element and cannot hold children or attributes")]
    NotAnElement(usize),

    #[error("node id {0} does not exist in this document")]
    UnknownNode(usize),
}
