use std::sync::Arc;

use anyhow::Context;

use crate::authentication::Credentials;
use crate::domain::{
    success_rate, Campaign, CampaignStatus, CampaignSubject, DeliveryMode, RecipientEmail,
    SendLogEntry, SenderEmail,
};
use crate::email_client::{MailSession, MailTransport, TransportError};
use crate::email_request::{BulkEmail, OutgoingEmail};
use crate::rate_limit::RateLimiter;
use crate::recipients::{
    validate_recipients, Dataset, MissingColumnError, ValidRecipient, ValidationReport,
};
use crate::store::CampaignStore;
use crate::template::{extract_placeholders, merge, ValueSource};

/// A request that can be turned down before anything is sent or stored.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error(transparent)]
    MissingEmailColumn(#[from] MissingColumnError),
    #[error("There are no valid recipients to send to.")]
    NoSendableRecipients,
    #[error("Bulk emails cannot be personalized, remove these placeholders: {}", .0.join(", "))]
    PlaceholdersInBulkMode(Vec<String>),
    #[error("Only draft campaigns can be sent, this one is `{0}`.")]
    NotDraft(CampaignStatus),
}

#[derive(thiserror::Error, Debug)]
pub enum CampaignError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("The mail relay refused the login.")]
    Auth(#[source] TransportError),
    #[error("The mail relay could not be reached.")]
    Transport(#[source] TransportError),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<TransportError> for CampaignError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Auth(_) => CampaignError::Auth(e),
            TransportError::Transport(_) => CampaignError::Transport(e),
        }
    }
}

/// Placeholder names a template requires in the given mode.
pub fn required_placeholders(
    template: &str,
    mode: DeliveryMode,
) -> Result<Vec<String>, InputError> {
    let placeholders = extract_placeholders(template);
    if mode == DeliveryMode::Bulk && !placeholders.is_empty() {
        return Err(InputError::PlaceholdersInBulkMode(placeholders.unique));
    }
    Ok(placeholders.unique)
}

/// A draft campaign together with the recipients it will be sent to.
#[derive(Debug)]
pub struct PreparedCampaign {
    pub campaign: Campaign,
    pub report: ValidationReport,
}

/// Runs every upfront check and builds the draft.
///
/// Nothing is persisted: an error here means no campaign exists.
#[tracing::instrument(name = "Prepare campaign", skip(subject, template, mode, dataset), fields(mode = mode.as_str()))]
pub fn prepare_campaign(
    subject: CampaignSubject,
    template: String,
    mode: DeliveryMode,
    dataset: &Dataset,
) -> Result<PreparedCampaign, InputError> {
    let placeholders = required_placeholders(&template, mode)?;
    let report = validate_recipients(dataset, &placeholders)?;
    if !report.is_sendable() {
        return Err(InputError::NoSendableRecipients);
    }

    Ok(PreparedCampaign {
        campaign: Campaign::new(subject, template, mode, placeholders),
        report,
    })
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DispatchSummary {
    pub total: u32,
    pub sent: u32,
    pub failed: u32,
}

impl DispatchSummary {
    pub fn success_rate(&self) -> f64 {
        success_rate(self.sent, self.total)
    }
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Campaign completed. Sent: {}, Failed: {}",
            self.sent, self.failed
        )
    }
}

/// Result of a relay round trip (test send or credentials check),
/// reported to the caller rather than raised.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RelayOutcome {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Default)]
struct Progress {
    sent: u32,
    failed: u32,
}

impl Progress {
    fn processed(&self) -> u32 {
        self.sent + self.failed
    }
}

pub struct Dispatcher {
    transport: Arc<dyn MailTransport>,
    store: Arc<dyn CampaignStore>,
    rate_limiter: Arc<dyn RateLimiter>,
    persist_every: u32,
}

impl Dispatcher {
    /// `persist_every` is the number of rows between two counter writes,
    /// zero is treated as one.
    pub fn new(
        transport: Arc<dyn MailTransport>,
        store: Arc<dyn CampaignStore>,
        rate_limiter: Arc<dyn RateLimiter>,
        persist_every: usize,
    ) -> Self {
        let persist_every = u32::try_from(persist_every).unwrap_or(u32::MAX).max(1);
        Self {
            transport,
            store,
            rate_limiter,
            persist_every,
        }
    }

    /// Sends `campaign` to every recipient and drives it to a terminal state.
    ///
    /// The campaign must already be stored as a draft. Individual delivery
    /// failures are logged and counted, the run still completes. A relay
    /// that cannot be logged into, or a store that stops accepting writes,
    /// marks the campaign `failed` and is returned as an error.
    #[tracing::instrument(
        name = "Run campaign",
        skip(self, campaign, recipients, credentials),
        fields(
            campaign_id = %campaign.id(),
            mode = campaign.mode().as_str(),
            recipients = recipients.len()
        )
    )]
    pub async fn run_campaign(
        &self,
        campaign: &mut Campaign,
        recipients: &[ValidRecipient],
        credentials: &Credentials,
    ) -> Result<DispatchSummary, CampaignError> {
        ensure_runnable(campaign, recipients)?;
        let total = u32::try_from(recipients.len())
            .context("Too many recipients for a single campaign")?;

        campaign.start(total).context("Failed to start the campaign")?;
        if let Err(e) = self.store.update(campaign).await {
            self.abort(campaign).await;
            return Err(e.into());
        }

        let mut session = match self.transport.connect(credentials).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error.cause_chain = ?e, "Failed to open a mail relay session");
                self.abort(campaign).await;
                return Err(e.into());
            }
        };

        let sender = &credentials.identity;
        let outcome = match campaign.mode() {
            DeliveryMode::Personalized => {
                self.send_personalized(campaign, &mut *session, recipients, sender)
                    .await
            }
            DeliveryMode::Bulk => {
                self.send_bulk(campaign, &mut *session, recipients, sender)
                    .await
            }
        };

        if let Err(e) = session.close().await {
            tracing::warn!(error.cause_chain = ?e, "Failed to close the mail relay session");
        }

        let progress = match outcome {
            Ok(progress) => progress,
            Err(e) => {
                self.abort(campaign).await;
                return Err(e.into());
            }
        };

        campaign
            .complete(progress.sent, progress.failed)
            .context("Failed to complete the campaign")?;
        self.store
            .update(campaign)
            .await
            .context("Failed to persist the completed campaign")?;

        let summary = DispatchSummary {
            total,
            sent: progress.sent,
            failed: progress.failed,
        };
        tracing::info!(sent = summary.sent, failed = summary.failed, "Campaign completed");
        Ok(summary)
    }

    async fn send_personalized(
        &self,
        campaign: &mut Campaign,
        session: &mut dyn MailSession,
        recipients: &[ValidRecipient],
        sender: &SenderEmail,
    ) -> Result<Progress, anyhow::Error> {
        let mut progress = Progress::default();

        for recipient in recipients {
            let email = OutgoingEmail {
                from: sender.clone(),
                to: recipient.email.clone(),
                subject: campaign.subject().as_ref().to_owned(),
                text: merge(campaign.template(), campaign.placeholders(), &recipient.row),
            };

            let entry = match session.send(&email).await {
                Ok(()) => {
                    progress.sent += 1;
                    SendLogEntry::sent(campaign.id(), &recipient.email)
                }
                Err(e) => {
                    tracing::warn!(
                        recipient = %recipient.email,
                        error.cause_chain = ?e,
                        "Failed to deliver a campaign email, moving on"
                    );
                    progress.failed += 1;
                    SendLogEntry::failed(campaign.id(), &recipient.email, e.detail())
                }
            };
            self.store
                .append(&entry)
                .await
                .context("Failed to append a send log entry")?;

            if progress.processed() % self.persist_every == 0 {
                campaign.record_progress(progress.sent, progress.failed)?;
                self.store
                    .update(campaign)
                    .await
                    .context("Failed to persist campaign progress")?;
            }

            self.rate_limiter.wait().await;
        }

        Ok(progress)
    }

    async fn send_bulk(
        &self,
        campaign: &mut Campaign,
        session: &mut dyn MailSession,
        recipients: &[ValidRecipient],
        sender: &SenderEmail,
    ) -> Result<Progress, anyhow::Error> {
        let email = BulkEmail {
            from: sender.clone(),
            bcc: recipients.iter().map(|r| r.email.clone()).collect(),
            subject: campaign.subject().as_ref().to_owned(),
            text: campaign.template().to_owned(),
        };
        let count = u32::try_from(email.bcc.len()).context("Too many bulk recipients")?;

        let failure = match session.send_bulk(&email).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(error.cause_chain = ?e, "Failed to deliver the bulk email");
                Some(e.detail())
            }
        };

        for recipient in &email.bcc {
            let entry = match &failure {
                None => SendLogEntry::sent(campaign.id(), recipient),
                Some(detail) => SendLogEntry::failed(campaign.id(), recipient, detail.clone()),
            };
            self.store
                .append(&entry)
                .await
                .context("Failed to append a send log entry")?;
        }

        Ok(match failure {
            None => Progress {
                sent: count,
                failed: 0,
            },
            Some(_) => Progress {
                sent: 0,
                failed: count,
            },
        })
    }

    /// Marks a running campaign as failed. Best effort: the error that got
    /// us here is what the caller needs to see.
    async fn abort(&self, campaign: &mut Campaign) {
        if let Err(e) = campaign.fail() {
            tracing::error!(error = %e, "Failed to mark the campaign as failed");
            return;
        }
        if let Err(e) = self.store.update(campaign).await {
            tracing::error!(error.cause_chain = ?e, "Failed to persist the failed campaign");
        }
    }

    /// Sends a single preview of the message to `destination`.
    ///
    /// The subject gets a test marker. No campaign or log entry is touched.
    #[tracing::instrument(
        name = "Send test email",
        skip(self, template, names, sample, subject, destination, credentials),
        fields(destination = %destination)
    )]
    pub async fn send_test<V>(
        &self,
        template: &str,
        names: &[String],
        sample: &V,
        subject: &CampaignSubject,
        destination: &RecipientEmail,
        credentials: &Credentials,
    ) -> RelayOutcome
    where
        V: ValueSource + Sync + ?Sized,
    {
        let email = OutgoingEmail {
            from: credentials.identity.clone(),
            to: destination.clone(),
            subject: subject.as_test(),
            text: merge(template, names, sample),
        };

        let result = match self.transport.connect(credentials).await {
            Ok(mut session) => {
                let sent = session.send(&email).await;
                if let Err(e) = session.close().await {
                    tracing::warn!(error.cause_chain = ?e, "Failed to close the mail relay session");
                }
                sent
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => RelayOutcome {
                success: true,
                message: format!("Test email sent to {}", destination),
            },
            Err(e) => {
                tracing::warn!(error.cause_chain = ?e, "Failed to send the test email");
                RelayOutcome {
                    success: false,
                    message: format!("Failed to send test email: {}", e.detail()),
                }
            }
        }
    }

    /// Logs in to the relay with `credentials` and hangs up, without sending anything.
    #[tracing::instrument(
        name = "Verify relay credentials",
        skip(self, credentials),
        fields(sender = %credentials.identity)
    )]
    pub async fn verify_credentials(&self, credentials: &Credentials) -> RelayOutcome {
        match self.transport.connect(credentials).await {
            Ok(session) => {
                if let Err(e) = session.close().await {
                    tracing::warn!(error.cause_chain = ?e, "Failed to close the mail relay session");
                }
                RelayOutcome {
                    success: true,
                    message: format!("Credentials verified for {}", credentials.identity),
                }
            }
            Err(e @ TransportError::Auth(_)) => {
                tracing::warn!(error.cause_chain = ?e, "The mail relay rejected the login");
                RelayOutcome {
                    success: false,
                    message: "Authentication failed. Check the sender address and app password."
                        .into(),
                }
            }
            Err(e @ TransportError::Transport(_)) => {
                tracing::warn!(error.cause_chain = ?e, "Failed to reach the mail relay");
                RelayOutcome {
                    success: false,
                    message: format!("Could not reach the mail relay: {}", e.detail()),
                }
            }
        }
    }
}

fn ensure_runnable(campaign: &Campaign, recipients: &[ValidRecipient]) -> Result<(), InputError> {
    if campaign.status() != CampaignStatus::Draft {
        return Err(InputError::NotDraft(campaign.status()));
    }
    if recipients.is_empty() {
        return Err(InputError::NoSendableRecipients);
    }
    if campaign.mode() == DeliveryMode::Bulk && !campaign.placeholders().is_empty() {
        return Err(InputError::PlaceholdersInBulkMode(
            campaign.placeholders().to_vec(),
        ));
    }
    Ok(())
}
