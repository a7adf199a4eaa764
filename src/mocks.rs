//! In-process mail relay for tests and local runs.
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::authentication::Credentials;
use crate::email_client::{MailSession, MailTransport, TransportError};
use crate::email_request::{BulkEmail, OutgoingEmail};

#[derive(Debug, Default, Clone)]
struct Script {
    reject_login: bool,
    refuse_connection: bool,
    fail_bulk: bool,
    failing_recipients: HashSet<String>,
}

#[derive(Debug, Default)]
struct Recorded {
    logins: Vec<String>,
    sent: Vec<OutgoingEmail>,
    bulk: Vec<BulkEmail>,
    closed_sessions: usize,
}

/// A [`MailTransport`] that never leaves the process.
///
/// Failures are scripted up front; every login, message and session close is
/// recorded. Clones share both the script and the recordings, so a test can
/// keep a handle while the application owns another.
#[derive(Debug, Default, Clone)]
pub struct MockMailTransport {
    script: Arc<Mutex<Script>>,
    recorded: Arc<Mutex<Recorded>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every login attempt is refused by the relay.
    pub fn reject_login(&self) {
        lock(&self.script).reject_login = true;
    }

    /// The relay cannot be reached at all.
    pub fn refuse_connection(&self) {
        lock(&self.script).refuse_connection = true;
    }

    /// Messages addressed to `address` are rejected.
    pub fn fail_for(&self, address: &str) {
        lock(&self.script)
            .failing_recipients
            .insert(address.to_owned());
    }

    pub fn fail_bulk(&self) {
        lock(&self.script).fail_bulk = true;
    }

    /// Identities used to log in, in order.
    pub fn logins(&self) -> Vec<String> {
        lock(&self.recorded).logins.clone()
    }

    /// Personal messages accepted by the relay, in order.
    pub fn sent_emails(&self) -> Vec<OutgoingEmail> {
        lock(&self.recorded).sent.clone()
    }

    pub fn bulk_emails(&self) -> Vec<BulkEmail> {
        lock(&self.recorded).bulk.clone()
    }

    pub fn closed_sessions(&self) -> usize {
        lock(&self.recorded).closed_sessions
    }
}

#[async_trait]
impl MailTransport for MockMailTransport {
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn MailSession>, TransportError> {
        let script = lock(&self.script).clone();
        if script.refuse_connection {
            return Err(TransportError::Transport(anyhow::anyhow!(
                "Connection refused by mock relay"
            )));
        }

        lock(&self.recorded)
            .logins
            .push(credentials.identity.as_ref().to_owned());
        if script.reject_login {
            return Err(TransportError::Auth(anyhow::anyhow!(
                "535 5.7.3 Authentication unsuccessful"
            )));
        }

        Ok(Box::new(MockSession {
            script,
            recorded: Arc::clone(&self.recorded),
        }))
    }
}

struct MockSession {
    script: Script,
    recorded: Arc<Mutex<Recorded>>,
}

#[async_trait]
impl MailSession for MockSession {
    async fn send(&mut self, email: &OutgoingEmail) -> Result<(), TransportError> {
        if self.script.failing_recipients.contains(email.to.as_ref()) {
            return Err(TransportError::Transport(anyhow::anyhow!(
                "550 5.1.1 Mailbox unavailable: {}",
                email.to
            )));
        }
        lock(&self.recorded).sent.push(email.clone());
        Ok(())
    }

    async fn send_bulk(&mut self, email: &BulkEmail) -> Result<(), TransportError> {
        if self.script.fail_bulk {
            return Err(TransportError::Transport(anyhow::anyhow!(
                "452 4.5.3 Too many recipients"
            )));
        }
        lock(&self.recorded).bulk.push(email.clone());
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), TransportError> {
        lock(&self.recorded).closed_sessions += 1;
        Ok(())
    }
}
