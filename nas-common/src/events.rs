//! Notification events
//!
//! Submissions and corrections are announced on an [`EventBus`] so that
//! notification sinks (email, audit log) can react without the core
//! knowing about them.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::assessment::{Correction, Submission};
use crate::correction::CorrectionDiff;
use crate::form::Form;

/// Events emitted by the assessment service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotificationEvent {
    /// A new submission was persisted
    SubmissionCreated {
        submission_id: String,
        /// URI of the submission
        submission_uri: String,
        submission: Submission,
        form: Form,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A correction was accepted
    CorrectionCreated {
        correction_id: String,
        correction: Correction,
        form: Form,
        /// URI of the corrected submission
        submission_uri: String,
        submission: Submission,
        author: String,
        /// Difference between the resolved response before and after
        diff: CorrectionDiff,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl NotificationEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            NotificationEvent::SubmissionCreated { .. } => "SubmissionCreated",
            NotificationEvent::CorrectionCreated { .. } => "CorrectionCreated",
        }
    }
}

/// Broadcast channel for notification events
///
/// Backed by `tokio::sync::broadcast`: publishing never blocks, slow
/// subscribers observe `Lagged` and dropped receivers clean up on their own.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<NotificationEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: NotificationEvent,
    ) -> Result<usize, broadcast::error::SendError<NotificationEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: NotificationEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
