use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use lettre::address::Envelope;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials as RelayCredentials;
use lettre::transport::smtp::PoolConfig;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;

use crate::authentication::Credentials;
use crate::configuration::SmtpSettings;
use crate::email_request::{BulkEmail, OutgoingEmail};

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("Authentication with the mail relay failed.")]
    Auth(#[source] anyhow::Error),
    #[error("The mail relay could not deliver the message.")]
    Transport(#[source] anyhow::Error),
}

impl TransportError {
    fn transport<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TransportError::Transport(anyhow::Error::new(e))
    }

    /// The error and all of its causes on a single line.
    pub fn detail(&self) -> String {
        let mut detail = self.to_string();
        let mut current = self.source();
        while let Some(cause) = current {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            current = cause.source();
        }
        detail
    }
}

/// Something able to open an authenticated session with a mail relay.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Connects and logs in. A rejected login is reported as
    /// [`TransportError::Auth`].
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn MailSession>, TransportError>;
}

/// A logged-in relay session, held for the duration of one run.
#[async_trait]
pub trait MailSession: Send {
    async fn send(&mut self, email: &OutgoingEmail) -> Result<(), TransportError>;

    async fn send_bulk(&mut self, email: &BulkEmail) -> Result<(), TransportError>;

    async fn close(self: Box<Self>) -> Result<(), TransportError>;
}

/// SMTP relay reached through STARTTLS.
pub struct SmtpMailTransport {
    host: String,
    port: u16,
    timeout: Duration,
}

impl SmtpMailTransport {
    pub fn new(host: String, port: u16, timeout: Duration) -> Self {
        Self {
            host,
            port,
            timeout,
        }
    }

    pub fn from_settings(settings: &SmtpSettings) -> Self {
        Self::new(settings.host.clone(), settings.port, settings.timeout())
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    #[tracing::instrument(
        name = "Connect to the mail relay",
        skip(self, credentials),
        fields(relay = %self.host, port = self.port)
    )]
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn MailSession>, TransportError> {
        let relay_credentials = RelayCredentials::new(
            credentials.identity.as_ref().to_owned(),
            credentials.secret.expose_secret().to_owned(),
        );

        // A single pooled connection is reused for every send of the run
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
            .map_err(TransportError::transport)?
            .port(self.port)
            .timeout(Some(self.timeout))
            .credentials(relay_credentials)
            .pool_config(PoolConfig::new().max_size(1))
            .build();

        match transport.test_connection().await {
            Ok(true) => {
                // The tested connection goes back to the pool from a spawned task,
                // let it land before the first send asks for one
                tokio::task::yield_now().await;
                Ok(Box::new(SmtpSession { transport }))
            }
            Ok(false) => Err(TransportError::Transport(anyhow::anyhow!(
                "The mail relay did not answer the connection test"
            ))),
            // 5xx replies while greeting or logging in are login rejections
            Err(e) if e.is_permanent() => Err(TransportError::Auth(e.into())),
            Err(e) => Err(TransportError::transport(e)),
        }
    }
}

struct SmtpSession {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

#[async_trait]
impl MailSession for SmtpSession {
    #[tracing::instrument(name = "Send an email", skip(self, email), fields(recipient = %email.to))]
    async fn send(&mut self, email: &OutgoingEmail) -> Result<(), TransportError> {
        let message = build_message(email)?;
        self.transport
            .send(message)
            .await
            .map_err(TransportError::transport)?;
        Ok(())
    }

    #[tracing::instrument(
        name = "Send a blind-copied email",
        skip(self, email),
        fields(recipients = email.bcc.len())
    )]
    async fn send_bulk(&mut self, email: &BulkEmail) -> Result<(), TransportError> {
        let (envelope, message) = build_bulk_message(email)?;
        self.transport
            .send_raw(&envelope, &message.formatted())
            .await
            .map_err(TransportError::transport)?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), TransportError> {
        // Dropping the pool sends QUIT on its idle connection
        drop(self.transport);
        Ok(())
    }
}

fn mailbox(address: &str) -> Result<Mailbox, TransportError> {
    address.parse::<Mailbox>().map_err(TransportError::transport)
}

fn address(address: &str) -> Result<Address, TransportError> {
    address.parse::<Address>().map_err(TransportError::transport)
}

fn build_message(email: &OutgoingEmail) -> Result<Message, TransportError> {
    Message::builder()
        .from(mailbox(email.from.as_ref())?)
        .to(mailbox(email.to.as_ref())?)
        .subject(email.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(email.text.clone())
        .map_err(TransportError::transport)
}

fn build_bulk_message(email: &BulkEmail) -> Result<(Envelope, Message), TransportError> {
    let message = Message::builder()
        .from(mailbox(email.from.as_ref())?)
        .to(mailbox(email.from.as_ref())?)
        .subject(email.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(email.text.clone())
        .map_err(TransportError::transport)?;

    let recipients = email
        .bcc
        .iter()
        .map(|r| address(r.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    let envelope = Envelope::new(Some(address(email.from.as_ref())?), recipients)
        .map_err(TransportError::transport)?;

    Ok((envelope, message))
}
