//! Feedback submission
//!
//! One remote insert per record. There is no local state and no retry: any
//! remote failure reaches the caller exactly as the backend reported it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::models::FeedbackRecord;
use crate::errors::ClientResult;

/// Remote destination for feedback records
#[async_trait]
pub trait FeedbackSink: Send + Sync {
    async fn insert(&self, record: &FeedbackRecord) -> ClientResult<()>;
}

pub struct FeedbackClient {
    sink: Arc<dyn FeedbackSink>,
    user_id: Option<String>,
}

impl FeedbackClient {
    pub fn new(sink: Arc<dyn FeedbackSink>, user_id: Option<String>) -> Self {
        Self { sink, user_id }
    }

    /// Submit a record, attaching the current identity when the record has none
    ///
    /// # Errors
    ///
    /// Returns the sink's `ClientError` unchanged
    pub async fn submit(&self, mut record: FeedbackRecord) -> ClientResult<()> {
        if record.user_id.is_none() {
            record.user_id = self.user_id.clone();
        }

        self.sink.insert(&record).await?;
        info!(
            "Submitted {} feedback for {}",
            record.feedback_type, record.scientific_name
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{FeedbackStatus, FeedbackType};
    use crate::errors::ClientError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        calls: AtomicU32,
        records: Mutex<Vec<FeedbackRecord>>,
        fail_with: Option<(u16, String)>,
    }

    #[async_trait]
    impl FeedbackSink for RecordingSink {
        async fn insert(&self, record: &FeedbackRecord) -> ClientResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some((status, message)) = &self.fail_with {
                return Err(ClientError::classify(*status, message.clone()));
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_submit_attaches_identity() {
        let sink = Arc::new(RecordingSink::default());
        let client = FeedbackClient::new(sink.clone(), Some("user-9".to_string()));

        client
            .submit(FeedbackRecord::new("Turdus merula", FeedbackType::Like))
            .await
            .unwrap();

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id.as_deref(), Some("user-9"));
        assert_eq!(records[0].status, FeedbackStatus::New);
    }

    #[tokio::test]
    async fn test_failure_propagates_without_retry() {
        let sink = Arc::new(RecordingSink {
            fail_with: Some((500, "insert violates row-level security".to_string())),
            ..Default::default()
        });
        let client = FeedbackClient::new(sink.clone(), None);

        let err = client
            .submit(FeedbackRecord::new("Turdus merula", FeedbackType::IncorrectId))
            .await
            .unwrap_err();

        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.to_string(), "insert violates row-level security");
        assert_eq!(err.status(), Some(500));
    }
}
