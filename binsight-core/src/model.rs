//! Domain data structures for submissions, recognition jobs, and stored items.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ports::PortError;

/// Waste categories an item can be sorted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Residual waste.
    Trash,
    /// Organic waste.
    Compost,
    /// Paper, glass, metal and plastics.
    Recycling,
}

impl Category {
    /// Every category, in tie-break order.
    pub const ALL: [Self; 3] = [Self::Trash, Self::Compost, Self::Recycling];

    /// Label used on the wire and in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trash => "Trash",
            Self::Compost => "Compost",
            Self::Recycling => "Recycling",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = PortError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| PortError::UnknownCategory(raw.to_owned()))
    }
}

/// Image submitted by a client for classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSubmission {
    /// Locale hint forwarded to the recognition service, e.g. `en-US`.
    pub locale: String,
    /// Publicly reachable URL of the image.
    #[serde(rename = "imgurl")]
    pub image_url: String,
}

impl ImageSubmission {
    /// Construct a new submission.
    #[must_use]
    pub fn new<L: Into<String>, U: Into<String>>(locale: L, image_url: U) -> Self {
        Self {
            locale: locale.into(),
            image_url: image_url.into(),
        }
    }
}

/// Opaque identifier of an asynchronous recognition job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobToken(pub String);

impl fmt::Display for JobToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Description produced by the recognition service for a finished job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    /// Short textual description of the pictured item.
    pub name: String,
    /// Full status body as returned by the service.
    pub body: Value,
}

/// State of a recognition job as reported by one status check.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// The job is still running.
    Pending,
    /// The job finished with a description.
    Completed(Recognition),
    /// The job reached a terminal state without a description.
    Failed {
        /// Raw status string reported by the service.
        status: String,
        /// Optional explanation supplied by the service.
        reason: Option<String>,
    },
}

/// Values needed to persist a classified item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    /// Category assigned by the classifier.
    pub category: Category,
    /// Description the category was derived from.
    pub description: String,
    /// URL of the classified image.
    pub url: String,
}

/// Persisted classification record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Storage identifier.
    pub id: i64,
    /// Category assigned at creation.
    pub category: Category,
    /// Description the category was derived from.
    pub description: String,
    /// URL of the classified image.
    pub url: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Response returned to the client after a successful classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Category of the pictured item.
    pub classification: Category,
    /// Recognition body the category was derived from.
    pub description: Value,
}
