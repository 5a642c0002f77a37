//! High-level service facade combining recognition, classification and storage.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::model::{Classification, ImageSubmission, NewItem};
use crate::poll::{PollPolicy, await_recognition};
use crate::ports::{ClassifierPort, ItemStore, PortError, RecognitionPort};

/// Public entry point for classifying submitted images.
pub struct ClassifyService {
    recognition: Arc<dyn RecognitionPort>,
    classifier: Arc<dyn ClassifierPort>,
    store: Arc<dyn ItemStore>,
    poll_policy: PollPolicy,
}

impl ClassifyService {
    /// Create a new service bound to the provided adapters.
    #[must_use]
    pub fn new(
        recognition: Arc<dyn RecognitionPort>,
        classifier: Arc<dyn ClassifierPort>,
        store: Arc<dyn ItemStore>,
        poll_policy: PollPolicy,
    ) -> Self {
        Self {
            recognition,
            classifier,
            store,
            poll_policy,
        }
    }

    /// Make sure the storage schema exists before serving requests.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store cannot create its schema.
    pub async fn prepare(&self) -> Result<(), PortError> {
        self.store.ensure_schema().await
    }

    /// Recognize, classify and store the pictured item.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidInput`] for an empty image URL, otherwise whatever the
    /// recognition, classification or storage step reports.
    #[instrument(skip_all, fields(url = %submission.image_url, locale = %submission.locale))]
    pub async fn classify_image(
        &self,
        submission: ImageSubmission,
    ) -> Result<Classification, PortError> {
        if submission.image_url.trim().is_empty() {
            return Err(PortError::InvalidInput("imgurl must not be empty".into()));
        }

        let token = self.recognition.submit(&submission).await?;
        debug!(%token, "recognition job submitted");

        let recognition =
            await_recognition(self.recognition.as_ref(), &token, &self.poll_policy).await?;

        let category = self.classifier.classify(&recognition.name)?;
        debug!(name = %recognition.name, %category, "description classified");

        let stored = self
            .store
            .insert(NewItem {
                category,
                description: recognition.name,
                url: submission.image_url,
            })
            .await?;
        info!(id = stored.id, category = %stored.category, "item stored");

        Ok(Classification {
            classification: stored.category,
            description: recognition.body,
        })
    }
}
