use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{CampaignSubject, RecipientEmail};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// One message per recipient, placeholders merged per row.
    Personalized,
    /// One message, every recipient blind-copied; placeholders are not allowed.
    Bulk,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Personalized => "personalized",
            DeliveryMode::Bulk => "bulk",
        }
    }
}

impl TryFrom<String> for DeliveryMode {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "personalized" => Ok(Self::Personalized),
            "bulk" => Ok(Self::Bulk),
            other => Err(format!(
                "{} is not a supported delivery mode. Use either `personalized` or `bulk`.",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Sending,
    Completed,
    Failed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Sending => "sending",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Completed | CampaignStatus::Failed)
    }

    fn can_become(&self, next: CampaignStatus) -> bool {
        matches!(
            (self, next),
            (CampaignStatus::Draft, CampaignStatus::Sending)
                | (CampaignStatus::Sending, CampaignStatus::Sending)
                | (CampaignStatus::Sending, CampaignStatus::Completed)
                | (CampaignStatus::Sending, CampaignStatus::Failed)
        )
    }
}

impl TryFrom<String> for CampaignStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "draft" => Ok(Self::Draft),
            "sending" => Ok(Self::Sending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("{} is not a known campaign status.", other)),
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("A campaign cannot move from `{from}` to `{to}`.")]
pub struct InvalidTransition {
    pub from: CampaignStatus,
    pub to: CampaignStatus,
}

/// A single send operation: what is sent, how, and how far it got.
///
/// Status and counters can only be changed through the transition methods,
/// which are reserved to the dispatch pipeline.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Campaign {
    id: Uuid,
    subject: CampaignSubject,
    template: String,
    mode: DeliveryMode,
    placeholders: Vec<String>,
    total_emails: u32,
    sent_emails: u32,
    failed_emails: u32,
    status: CampaignStatus,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Creates a campaign in `draft`.
    pub fn new(
        subject: CampaignSubject,
        template: String,
        mode: DeliveryMode,
        placeholders: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject,
            template,
            mode,
            placeholders,
            total_emails: 0,
            sent_emails: 0,
            failed_emails: 0,
            status: CampaignStatus::Draft,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Rebuilds a campaign from its persisted fields.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: Uuid,
        subject: CampaignSubject,
        template: String,
        mode: DeliveryMode,
        placeholders: Vec<String>,
        counters: (u32, u32, u32),
        status: CampaignStatus,
        created_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        let (total_emails, sent_emails, failed_emails) = counters;
        Self {
            id,
            subject,
            template,
            mode,
            placeholders,
            total_emails,
            sent_emails,
            failed_emails,
            status,
            created_at,
            completed_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn subject(&self) -> &CampaignSubject {
        &self.subject
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    pub fn total_emails(&self) -> u32 {
        self.total_emails
    }

    pub fn sent_emails(&self) -> u32 {
        self.sent_emails
    }

    pub fn failed_emails(&self) -> u32 {
        self.failed_emails
    }

    pub fn status(&self) -> CampaignStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    fn transition(&mut self, next: CampaignStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_become(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub(crate) fn start(&mut self, total_emails: u32) -> Result<(), InvalidTransition> {
        if self.status != CampaignStatus::Draft {
            return Err(InvalidTransition {
                from: self.status,
                to: CampaignStatus::Sending,
            });
        }
        self.transition(CampaignStatus::Sending)?;
        self.total_emails = total_emails;
        Ok(())
    }

    pub(crate) fn record_progress(
        &mut self,
        sent_emails: u32,
        failed_emails: u32,
    ) -> Result<(), InvalidTransition> {
        self.transition(CampaignStatus::Sending)?;
        self.sent_emails = sent_emails;
        self.failed_emails = failed_emails;
        Ok(())
    }

    pub(crate) fn complete(
        &mut self,
        sent_emails: u32,
        failed_emails: u32,
    ) -> Result<(), InvalidTransition> {
        self.transition(CampaignStatus::Completed)?;
        self.sent_emails = sent_emails;
        self.failed_emails = failed_emails;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub(crate) fn fail(&mut self) -> Result<(), InvalidTransition> {
        self.transition(CampaignStatus::Failed)
    }

    pub fn summary(&self) -> CampaignSummary {
        CampaignSummary {
            campaign_id: self.id,
            subject: self.subject.as_ref().to_owned(),
            date: self.completed_at.unwrap_or(self.created_at),
            total_recipients: self.total_emails,
            sent_successfully: self.sent_emails,
            failed_to_send: self.failed_emails,
            success_rate: success_rate(self.sent_emails, self.total_emails),
        }
    }
}

/// `sent / total * 100`, zero for an empty campaign.
pub fn success_rate(sent: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(sent) / f64::from(total) * 100.0
    }
}

/// History record of a finished run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CampaignSummary {
    pub campaign_id: Uuid,
    pub subject: String,
    pub date: DateTime<Utc>,
    pub total_recipients: u32,
    pub sent_successfully: u32,
    pub failed_to_send: u32,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOutcome {
    Sent,
    Failed,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Sent => "sent",
            DeliveryOutcome::Failed => "failed",
        }
    }
}

impl TryFrom<String> for DeliveryOutcome {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(format!("{} is not a known delivery outcome.", other)),
        }
    }
}

/// Outcome of one recipient in one campaign run. Never mutated once written.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SendLogEntry {
    pub campaign_id: Uuid,
    pub recipient_email: String,
    pub outcome: DeliveryOutcome,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl SendLogEntry {
    pub fn sent(campaign_id: Uuid, recipient: &RecipientEmail) -> Self {
        Self {
            campaign_id,
            recipient_email: recipient.as_ref().to_owned(),
            outcome: DeliveryOutcome::Sent,
            error_message: None,
            sent_at: Utc::now(),
        }
    }

    pub fn failed(campaign_id: Uuid, recipient: &RecipientEmail, detail: String) -> Self {
        Self {
            campaign_id,
            recipient_email: recipient.as_ref().to_owned(),
            outcome: DeliveryOutcome::Failed,
            error_message: Some(detail),
            sent_at: Utc::now(),
        }
    }
}
