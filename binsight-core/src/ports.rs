//! Traits describing adapter capabilities and the shared error type.

use async_trait::async_trait;
use reqwest::Error as ReqwestError;

use crate::model::{Category, ImageSubmission, Item, JobStatus, JobToken, NewItem};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to adapters.
pub enum PortError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Upstream service answered successfully but with a body we could not use.
    #[error("Upstream error: {0}")]
    Upstream(String),
    /// Recognition job ended in a terminal failure state.
    #[error("Recognition failed with status {status:?}")]
    RecognitionFailed {
        /// Raw status string reported by the service.
        status: String,
        /// Optional explanation supplied by the service.
        reason: Option<String>,
    },
    /// Recognition job was still pending after the last allowed poll.
    #[error("Recognition still pending after {attempts} status checks")]
    PollExhausted {
        /// Number of status checks issued.
        attempts: u32,
    },
    /// Classifier could not produce a label.
    #[error("Classifier error: {0}")]
    Classifier(String),
    /// A label outside the fixed category set was encountered.
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
    /// Persistence layer failed.
    #[error("Storage error: {0}")]
    Storage(String),
    /// Client supplied unusable input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PortError {
    /// Short machine-readable code for the error kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "network_error",
            Self::Upstream(_) => "upstream_error",
            Self::RecognitionFailed { .. } => "recognition_failed",
            Self::PollExhausted { .. } => "recognition_timeout",
            Self::Classifier(_) => "classifier_error",
            Self::UnknownCategory(_) => "unknown_category",
            Self::Storage(_) => "storage_error",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

#[async_trait]
/// Image recognition backend working with submit/poll tokens.
pub trait RecognitionPort: Send + Sync {
    /// Submit an image for recognition and return the job token.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails or no token is returned.
    async fn submit(&self, submission: &ImageSubmission) -> Result<JobToken, PortError>;

    /// Check the status of a previously submitted job once.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails or the body is malformed.
    async fn status(&self, token: &JobToken) -> Result<JobStatus, PortError>;
}

/// Text classifier mapping a description to a waste category.
pub trait ClassifierPort: Send + Sync {
    /// Classify a free-text description.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the classifier cannot produce a label.
    fn classify(&self, text: &str) -> Result<Category, PortError>;
}

#[async_trait]
/// Storage for classified items.
pub trait ItemStore: Send + Sync {
    /// Create the storage schema if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Storage`] when the schema cannot be created.
    async fn ensure_schema(&self) -> Result<(), PortError>;

    /// Insert one item and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Storage`] when the insert fails.
    async fn insert(&self, item: NewItem) -> Result<Item, PortError>;
}
