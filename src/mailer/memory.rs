use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use super::{MailError, Mailer, OutgoingEmail};

/// Keeps outgoing mail in memory instead of delivering it. Used when no SMTP relay
/// is configured, and by tests to read issued codes back.
#[derive(Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn last_to(&self, to: &str) -> Option<OutgoingEmail> {
        self.sent().into_iter().rev().find(|e| e.to == to)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "email captured (no smtp relay configured)");
        self.sent
            .lock()
            .map_err(|_| MailError::Transport("mail outbox poisoned".into()))?
            .push(email);
        Ok(())
    }
}
