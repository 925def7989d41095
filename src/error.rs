//! Error types and handling for the air quality service

use thiserror::Error;

/// Main error type for the air quality service
#[derive(Error, Debug)]
pub enum AirQualityError {
    /// Input validation errors (bad coordinates, bad query parameters)
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Upstream provider errors: non-success status, transport failure, malformed payload
    #[error("Provider error: {message}")]
    Provider { message: String },

    /// Observation store errors
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl AirQualityError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new provider error
    pub fn provider<S: Into<String>>(message: S) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Create a new persistence error
    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            AirQualityError::Validation { message } => format!("Invalid input: {message}"),
            AirQualityError::Provider { .. } => {
                "Unable to retrieve data from the air quality provider. Check your API key and connection."
                    .to_string()
            }
            AirQualityError::Persistence { .. } => {
                "Observation store operation failed. Check the database path and permissions."
                    .to_string()
            }
            AirQualityError::Config { .. } => {
                "Configuration error. Please check your config file and environment.".to_string()
            }
            AirQualityError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<rusqlite::Error> for AirQualityError {
    fn from(err: rusqlite::Error) -> Self {
        AirQualityError::persistence(err.to_string())
    }
}

impl From<reqwest::Error> for AirQualityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AirQualityError::provider(format!("request timed out: {err}"))
        } else {
            AirQualityError::provider(format!("transport failure: {err}"))
        }
    }
}
