//! # LogWriter: simple event logger
//!
//! A minimal subscriber that reports incoming [`Event`]s through `tracing`.
//! Useful for demos and for seeing traffic on a category while debugging.
//!
//! ## Example output (with `tracing_subscriber::fmt`)
//! ```text
//! INFO eventvisor::subscribers::log: event received subscriber="log" category=user.login seq=4 payload=true
//! ```

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::HandlerError;
use crate::events::Event;
use crate::subscribers::Subscribe;

/// Event logging subscriber.
#[derive(Debug, Clone)]
pub struct LogWriter {
    id: String,
}

impl LogWriter {
    /// Construct a new [`LogWriter`] with the given subscriber id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Default for LogWriter {
    fn default() -> Self {
        Self::new("log")
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn handle(&self, _ctx: CancellationToken, e: &Event) -> Result<(), HandlerError> {
        let age = e.at.elapsed().unwrap_or_default();
        tracing::info!(
            subscriber = %self.id,
            category = %e.category,
            seq = e.seq,
            payload = e.has_payload(),
            age_ms = age.as_millis() as u64,
            "event received"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_writer_always_succeeds() {
        let w = LogWriter::default();
        assert_eq!(w.id(), "log");
        let res = w
            .handle(CancellationToken::new(), &Event::new("user.logout"))
            .await;
        assert!(res.is_ok());
    }
}
