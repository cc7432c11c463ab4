use async_trait::async_trait;

use crate::{error::NotifyError, models::OwnerId};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, owner: OwnerId, text: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the log. Used when no bot token is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, owner: OwnerId, text: &str) -> Result<(), NotifyError> {
        tracing::info!(owner, text, "notification (log only)");
        Ok(())
    }
}
