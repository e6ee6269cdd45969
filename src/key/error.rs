use thiserror::Error;

/// Errors produced when an object key does not follow the upload layout
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Object key {0:?} does not match the upload layout")]
    Malformed(String),

    #[error("Identifier {1} in object key {0:?} is out of range")]
    OutOfRange(String, String),
}
