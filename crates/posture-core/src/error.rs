//! Error types for the posture coaching system.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No calibration data collected")]
    EmptyCalibration,

    #[error("Insufficient landmarks: missing {role}")]
    InsufficientLandmarks { role: &'static str },

    #[error("No active session")]
    NoActiveSession,

    #[error("Invalid calibration profile: {0}")]
    InvalidProfile(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
