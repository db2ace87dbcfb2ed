//! Best-effort fan-out to client handles
//!
//! Every recipient is attempted independently and concurrently, bounded by
//! a per-call timeout. Failures are logged and collected into a
//! `DeliveryReport`; they never abort the remaining deliveries and never
//! surface as an `Err`. No retries.

use crate::handle::ClientHandle;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

/// The callback to invoke on each recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// `ClientHandle::notify`
    Notice(String),
    /// `ClientHandle::deliver`
    Message(String),
    /// `ClientHandle::session_closed`
    SessionClosed,
}

impl Delivery {
    fn kind(&self) -> &'static str {
        match self {
            Self::Notice(_) => "notice",
            Self::Message(_) => "message",
            Self::SessionClosed => "session_closed",
        }
    }
}

/// One recipient that could not be reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Handle id of the recipient
    pub recipient: String,
    /// Error or timeout description
    pub reason: String,
}

/// Aggregate outcome of a fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Number of delivery attempts made
    pub recipients: usize,
    /// Attempts that failed or timed out
    pub failures: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    /// Attempts that succeeded
    pub fn delivered(&self) -> usize {
        self.recipients - self.failures.len()
    }

    /// True when nothing failed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: DeliveryReport) {
        self.recipients += other.recipients;
        self.failures.extend(other.failures);
    }
}

/// Deliver `delivery` to every handle
///
/// Must be called with no core lock held.
pub async fn fan_out(
    recipients: &[Arc<dyn ClientHandle>],
    delivery: &Delivery,
    timeout: Duration,
) -> DeliveryReport {
    let attempts = recipients
        .iter()
        .map(|handle| deliver_one(handle.as_ref(), delivery, timeout));
    let failures: Vec<DeliveryFailure> = join_all(attempts).await.into_iter().flatten().collect();

    DeliveryReport {
        recipients: recipients.len(),
        failures,
    }
}

async fn deliver_one(
    handle: &dyn ClientHandle,
    delivery: &Delivery,
    timeout: Duration,
) -> Option<DeliveryFailure> {
    let call = async {
        match delivery {
            Delivery::Notice(text) => handle.notify(text).await,
            Delivery::Message(text) => handle.deliver(text).await,
            Delivery::SessionClosed => handle.session_closed().await,
        }
    };

    let reason = match tokio::time::timeout(timeout, call).await {
        Ok(Ok(())) => return None,
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("timed out after {}ms", timeout.as_millis()),
    };

    tracing::warn!(
        recipient = %handle.id(),
        kind = delivery.kind(),
        reason = %reason,
        "Delivery failed"
    );

    Some(DeliveryFailure {
        recipient: handle.id().to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ChatError, Result};
    use crate::handle::{ChannelHandle, ClientEvent};
    use async_trait::async_trait;

    struct FailingHandle;

    #[async_trait]
    impl ClientHandle for FailingHandle {
        fn id(&self) -> &str {
            "broken"
        }
        async fn notify(&self, _text: &str) -> Result<()> {
            Err(ChatError::Communication("unreachable".into()))
        }
        async fn deliver(&self, _text: &str) -> Result<()> {
            Err(ChatError::Communication("unreachable".into()))
        }
        async fn session_closed(&self) -> Result<()> {
            Err(ChatError::Communication("unreachable".into()))
        }
    }

    struct StuckHandle;

    #[async_trait]
    impl ClientHandle for StuckHandle {
        fn id(&self) -> &str {
            "stuck"
        }
        async fn notify(&self, _text: &str) -> Result<()> {
            futures::future::pending().await
        }
        async fn deliver(&self, _text: &str) -> Result<()> {
            futures::future::pending().await
        }
        async fn session_closed(&self) -> Result<()> {
            futures::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_fan_out_skips_failures() {
        let (a, mut rx_a) = ChannelHandle::with_id("a");
        let (b, mut rx_b) = ChannelHandle::with_id("b");
        let recipients: Vec<Arc<dyn ClientHandle>> =
            vec![Arc::new(a), Arc::new(FailingHandle), Arc::new(b)];

        let report = fan_out(
            &recipients,
            &Delivery::Message("hello".into()),
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(report.recipients, 3);
        assert_eq!(report.delivered(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].recipient, "broken");
        assert_eq!(rx_a.try_recv().unwrap(), ClientEvent::Deliver { text: "hello".into() });
        assert_eq!(rx_b.try_recv().unwrap(), ClientEvent::Deliver { text: "hello".into() });
    }

    #[tokio::test]
    async fn test_fan_out_times_out_stuck_handle() {
        let (a, mut rx_a) = ChannelHandle::with_id("a");
        let recipients: Vec<Arc<dyn ClientHandle>> = vec![Arc::new(StuckHandle), Arc::new(a)];

        let timeout = Duration::from_millis(20);
        let report = fan_out(&recipients, &Delivery::SessionClosed, timeout).await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].recipient, "stuck");
        assert!(report.failures[0].reason.contains("timed out"));
        assert_eq!(rx_a.try_recv().unwrap(), ClientEvent::SessionClosed);
    }

    #[tokio::test]
    async fn test_fan_out_empty() {
        let report = fan_out(&[], &Delivery::Notice("x".into()), Duration::from_secs(1)).await;
        assert_eq!(report, DeliveryReport::default());
        assert!(report.is_complete());
    }

    #[test]
    fn test_report_merge() {
        let mut report = DeliveryReport {
            recipients: 2,
            failures: vec![],
        };
        report.merge(DeliveryReport {
            recipients: 1,
            failures: vec![DeliveryFailure {
                recipient: "x".into(),
                reason: "gone".into(),
            }],
        });
        assert_eq!(report.recipients, 3);
        assert_eq!(report.delivered(), 2);
        assert!(!report.is_complete());
    }
}
