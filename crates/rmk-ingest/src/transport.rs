//! Durable pub/sub transport contract and an in-process stand-in.
//!
//! Production subject routing is modeled as a trait (`DurableTransport`) any
//! real broker client could implement; [`InProcessTransport`] backs it with
//! bounded `tokio::sync::mpsc` channels keyed by subject, which is enough to
//! drive the retry/dead-letter logic below in tests and in single-process
//! deployments.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rmk_core::{RmkError, RmkResult, TranscriptEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, warn};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const RETRY_BASE: Duration = Duration::from_secs(1);
pub const RETRY_CAP: Duration = Duration::from_secs(30);

pub fn transcripts_subject(user_id: &str) -> String {
    format!("transcripts.{user_id}")
}

pub fn dead_letter_subject(original_subject: &str) -> String {
    format!("transcripts_dead.{original_subject}")
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub subject: String,
    pub event: TranscriptEvent,
    pub retry_count: u32,
}

#[derive(Debug, Clone)]
pub struct DeadLetterEnvelope {
    pub original_subject: String,
    pub event: TranscriptEvent,
    pub error: String,
    pub retry_count: u32,
    pub failed_at: chrono::DateTime<Utc>,
}

#[async_trait]
pub trait DurableTransport: Send + Sync {
    async fn publish(&self, subject: &str, event: TranscriptEvent) -> RmkResult<()>;
    async fn publish_dead_letter(&self, dead: DeadLetterEnvelope) -> RmkResult<()>;
    /// Receives the next message for `subject`, blocking until one arrives
    /// or the channel closes.
    async fn receive(&self, subject: &str) -> Option<Envelope>;
    /// Re-delivers `envelope` with its retry count incremented, used when a
    /// handler fails and the cap hasn't been hit yet.
    async fn requeue(&self, envelope: Envelope) -> RmkResult<()>;
}

pub struct InProcessTransport {
    channels: DashMap<String, (mpsc::Sender<Envelope>, Arc<tokio::sync::Mutex<mpsc::Receiver<Envelope>>>)>,
    dead_letters: DashMap<String, Vec<DeadLetterEnvelope>>,
    capacity: usize,
}

impl InProcessTransport {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            dead_letters: DashMap::new(),
            capacity,
        }
    }

    fn channel_for(&self, subject: &str) -> (mpsc::Sender<Envelope>, Arc<tokio::sync::Mutex<mpsc::Receiver<Envelope>>>) {
        self.channels
            .entry(subject.to_string())
            .or_insert_with(|| {
                let (tx, rx) = mpsc::channel(self.capacity.max(1));
                (tx, Arc::new(tokio::sync::Mutex::new(rx)))
            })
            .clone()
    }

    #[must_use]
    pub fn dead_letters_for(&self, subject: &str) -> Vec<DeadLetterEnvelope> {
        self.dead_letters
            .get(&dead_letter_subject(subject))
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DurableTransport for InProcessTransport {
    async fn publish(&self, subject: &str, event: TranscriptEvent) -> RmkResult<()> {
        let (tx, _) = self.channel_for(subject);
        tx.send(Envelope {
            subject: subject.to_string(),
            event,
            retry_count: 0,
        })
        .await
        .map_err(|_| RmkError::Permanent("transport channel closed".to_string()))
    }

    async fn publish_dead_letter(&self, dead: DeadLetterEnvelope) -> RmkResult<()> {
        let key = dead_letter_subject(&dead.original_subject);
        self.dead_letters.entry(key).or_default().push(dead);
        Ok(())
    }

    async fn receive(&self, subject: &str) -> Option<Envelope> {
        let (_, rx) = self.channel_for(subject);
        rx.lock().await.recv().await
    }

    async fn requeue(&self, mut envelope: Envelope) -> RmkResult<()> {
        envelope.retry_count += 1;
        let (tx, _) = self.channel_for(&envelope.subject.clone());
        tx.send(envelope)
            .await
            .map_err(|_| RmkError::Permanent("transport channel closed".to_string()))
    }
}

fn backoff_for(retry_count: u32) -> Duration {
    let millis = RETRY_BASE.as_millis() as u64 * 2u64.saturating_pow(retry_count);
    Duration::from_millis(millis).min(RETRY_CAP)
}

/// Drives one subject's durable consumption loop: receive, hand off to
/// `handler`, ack on success, retry with exponential backoff on failure,
/// and dead-letter once `max_retries` is exceeded.
pub async fn consume_with_retry<F, Fut>(
    transport: &dyn DurableTransport,
    subject: &str,
    max_retries: u32,
    mut handler: F,
) where
    F: FnMut(TranscriptEvent) -> Fut,
    Fut: std::future::Future<Output = RmkResult<()>>,
{
    while let Some(envelope) = transport.receive(subject).await {
        match handler(envelope.event.clone()).await {
            Ok(()) => {
                // Manual ack: nothing further to do, message is consumed.
            }
            Err(err) if envelope.retry_count < max_retries => {
                warn!(
                    subject = %envelope.subject,
                    retry_count = envelope.retry_count,
                    %err,
                    "ingestion handler failed, retrying with backoff"
                );
                tokio::time::sleep(backoff_for(envelope.retry_count)).await;
                if let Err(requeue_err) = transport.requeue(envelope).await {
                    error!(%requeue_err, "failed to requeue message after handler error");
                }
            }
            Err(err) => {
                error!(
                    subject = %envelope.subject,
                    retry_count = envelope.retry_count,
                    %err,
                    "ingestion handler exhausted retries, routing to dead letter"
                );
                let dead = DeadLetterEnvelope {
                    original_subject: envelope.subject.clone(),
                    event: envelope.event,
                    error: err.to_string(),
                    retry_count: envelope.retry_count,
                    failed_at: Utc::now(),
                };
                if let Err(publish_err) = transport.publish_dead_letter(dead).await {
                    error!(%publish_err, "failed to publish to dead-letter subject");
                }
                // Original is acked either way: dropping the envelope here
                // is the ack, since InProcessTransport has no redelivery
                // queue to explicitly acknowledge against.
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmk_core::Namespace;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn event() -> TranscriptEvent {
        TranscriptEvent::new("c1", "alice", Namespace::for_user("alice").unwrap(), "hi", "hello")
    }

    #[tokio::test]
    async fn succeeds_without_retry() {
        let transport = Arc::new(InProcessTransport::new(10));
        let subject = transcripts_subject("alice");
        transport.publish(&subject, event()).await.unwrap();

        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);
        let transport2 = Arc::clone(&transport);
        let subject2 = subject.clone();
        let handle = tokio::spawn(async move {
            consume_with_retry(transport2.as_ref(), &subject2, DEFAULT_MAX_RETRIES, |_event| {
                let calls = Arc::clone(&calls2);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_retries_then_dead_letters() {
        let transport = Arc::new(InProcessTransport::new(10));
        let subject = transcripts_subject("bob");
        transport.publish(&subject, event()).await.unwrap();

        let transport2 = Arc::clone(&transport);
        let subject2 = subject.clone();
        let handle = tokio::spawn(async move {
            consume_with_retry(transport2.as_ref(), &subject2, 1, |_event| async move {
                Err(RmkError::Permanent("boom".to_string()))
            })
            .await;
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        handle.abort();

        let dead = transport.dead_letters_for(&subject);
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].retry_count, 1);
    }
}
