use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid configuration for {key}: {message}")]
    Config { key: String, message: String },

    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),
}
