//! Error types for the bridge

use thiserror::Error;

/// Result type alias using our BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Main error type for bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Opening the gateway transport failed
    #[error("Gateway connection error: {0}")]
    Connection(String),

    /// Sending a request over the transport failed
    #[error("Gateway communication error: {0}")]
    Transport(String),

    /// The operation needs a live connection
    #[error("Not connected to the gateway")]
    NotConnected,

    /// An inbound message could not be decoded into callbacks
    #[error("Message decode error: {0}")]
    Decode(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// I/O errors (pump thread spawn, replay files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<std::num::ParseIntError> for BridgeError {
    fn from(err: std::num::ParseIntError) -> Self {
        BridgeError::Decode(err.to_string())
    }
}

impl From<std::num::ParseFloatError> for BridgeError {
    fn from(err: std::num::ParseFloatError) -> Self {
        BridgeError::Decode(err.to_string())
    }
}

impl From<rust_decimal::Error> for BridgeError {
    fn from(err: rust_decimal::Error) -> Self {
        BridgeError::Decode(err.to_string())
    }
}
