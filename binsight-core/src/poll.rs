//! Bounded polling of recognition jobs.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::model::{JobStatus, JobToken, Recognition};
use crate::ports::{PortError, RecognitionPort};

/// Limits and backoff applied while waiting for a recognition job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    /// Maximum number of status checks, including the first one.
    pub max_attempts: u32,
    /// Delay before the second status check.
    pub initial_delay: Duration,
    /// Upper bound for the delay between two checks.
    pub max_delay: Duration,
    /// Growth factor applied to the delay after each pending answer.
    pub multiplier: f64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
            multiplier: 2.0,
        }
    }
}

impl PollPolicy {
    /// Delay to wait after the given number of pending answers (starting at 1).
    #[must_use]
    pub fn delay_after(&self, pending_answers: u32) -> Duration {
        let exponent = i32::try_from(pending_answers.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.multiplier.max(1.0).powi(exponent);
        let scaled = self.initial_delay.as_secs_f64() * factor;

        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(scaled)
        }
    }
}

/// Poll `port` until the job behind `token` completes.
///
/// Every pending answer is followed by a backoff sleep and a new status check, until
/// `policy.max_attempts` checks have been issued.
///
/// # Errors
///
/// Returns [`PortError::RecognitionFailed`] when the job reaches a terminal failure state,
/// [`PortError::PollExhausted`] when it is still pending after the last allowed check, and
/// propagates any error from [`RecognitionPort::status`].
pub async fn await_recognition<P>(
    port: &P,
    token: &JobToken,
    policy: &PollPolicy,
) -> Result<Recognition, PortError>
where
    P: RecognitionPort + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match port.status(token).await? {
            JobStatus::Completed(recognition) => {
                debug!(%token, attempt, name = %recognition.name, "recognition completed");
                return Ok(recognition);
            }
            JobStatus::Failed { status, reason } => {
                warn!(%token, attempt, %status, ?reason, "recognition failed");
                return Err(PortError::RecognitionFailed { status, reason });
            }
            JobStatus::Pending if attempt >= max_attempts => {
                warn!(%token, attempts = attempt, "recognition still pending, giving up");
                return Err(PortError::PollExhausted { attempts: attempt });
            }
            JobStatus::Pending => {
                let delay = policy.delay_after(attempt);
                debug!(%token, attempt, ?delay, "recognition pending");
                sleep(delay).await;
            }
        }
    }
}
