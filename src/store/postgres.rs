use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::{
    Campaign, CampaignStatus, CampaignSubject, DeliveryMode, DeliveryOutcome, SendLogEntry,
};
use crate::store::CampaignStore;

/// Campaigns and logs kept in Postgres, see `migrations/`.
pub struct PgCampaignStore {
    pool: PgPool,
}

impl PgCampaignStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn campaign_from_row(row: PgRow) -> Result<Campaign, anyhow::Error> {
    let subject = CampaignSubject::parse(row.try_get("subject")?).map_err(anyhow::Error::msg)?;
    let mode = DeliveryMode::try_from(row.try_get::<String, _>("mode")?)
        .map_err(anyhow::Error::msg)?;
    let status = CampaignStatus::try_from(row.try_get::<String, _>("status")?)
        .map_err(anyhow::Error::msg)?;
    let counter = |column: &str| -> Result<u32, anyhow::Error> {
        let value: i64 = row.try_get(column)?;
        u32::try_from(value).with_context(|| format!("`{}` is out of range", column))
    };
    let counters = (
        counter("total_emails")?,
        counter("sent_emails")?,
        counter("failed_emails")?,
    );

    Ok(Campaign::restore(
        row.try_get("id")?,
        subject,
        row.try_get("template")?,
        mode,
        row.try_get("placeholders")?,
        counters,
        status,
        row.try_get::<DateTime<Utc>, _>("created_at")?,
        row.try_get::<Option<DateTime<Utc>>, _>("completed_at")?,
    ))
}

fn log_entry_from_row(row: PgRow) -> Result<SendLogEntry, anyhow::Error> {
    let outcome = DeliveryOutcome::try_from(row.try_get::<String, _>("status")?)
        .map_err(anyhow::Error::msg)?;

    Ok(SendLogEntry {
        campaign_id: row.try_get("campaign_id")?,
        recipient_email: row.try_get("recipient_email")?,
        outcome,
        error_message: row.try_get("error_message")?,
        sent_at: row.try_get("sent_at")?,
    })
}

const CAMPAIGN_COLUMNS: &str = r#"
    id, subject, template, mode, placeholders, total_emails, sent_emails,
    failed_emails, status, created_at, completed_at
"#;

#[async_trait]
impl CampaignStore for PgCampaignStore {
    #[tracing::instrument(name = "Saving new campaign in the database", skip(self, campaign), fields(campaign_id = %campaign.id()))]
    async fn create(&self, campaign: &Campaign) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
            INSERT INTO email_campaigns (
                id, subject, template, mode, placeholders, total_emails,
                sent_emails, failed_emails, status, created_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
            .bind(campaign.id())
            .bind(campaign.subject().as_ref())
            .bind(campaign.template())
            .bind(campaign.mode().as_str())
            .bind(campaign.placeholders().to_vec())
            .bind(i64::from(campaign.total_emails()))
            .bind(i64::from(campaign.sent_emails()))
            .bind(i64::from(campaign.failed_emails()))
            .bind(campaign.status().as_str())
            .bind(campaign.created_at())
            .bind(campaign.completed_at())
            .execute(&self.pool)
            .await
            .context("Failed to insert the campaign")?;
        Ok(())
    }

    #[tracing::instrument(
        name = "Updating campaign progress in the database",
        skip(self, campaign),
        fields(campaign_id = %campaign.id(), status = %campaign.status())
    )]
    async fn update(&self, campaign: &Campaign) -> Result<(), anyhow::Error> {
        let result = sqlx::query(
            r#"
            UPDATE email_campaigns
            SET total_emails = $2, sent_emails = $3, failed_emails = $4,
                status = $5, completed_at = $6
            WHERE id = $1
            "#,
        )
            .bind(campaign.id())
            .bind(i64::from(campaign.total_emails()))
            .bind(i64::from(campaign.sent_emails()))
            .bind(i64::from(campaign.failed_emails()))
            .bind(campaign.status().as_str())
            .bind(campaign.completed_at())
            .execute(&self.pool)
            .await
            .context("Failed to update the campaign")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Campaign {} does not exist", campaign.id());
        }
        Ok(())
    }

    #[tracing::instrument(
        name = "Appending a send log entry",
        skip(self, entry),
        fields(campaign_id = %entry.campaign_id, outcome = entry.outcome.as_str())
    )]
    async fn append(&self, entry: &SendLogEntry) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
            INSERT INTO email_logs (campaign_id, recipient_email, status, error_message, sent_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
            .bind(entry.campaign_id)
            .bind(&entry.recipient_email)
            .bind(entry.outcome.as_str())
            .bind(&entry.error_message)
            .bind(entry.sent_at)
            .execute(&self.pool)
            .await
            .context("Failed to append the send log entry")?;
        Ok(())
    }

    #[tracing::instrument(name = "Get campaign", skip(self))]
    async fn get(&self, campaign_id: Uuid) -> Result<Option<Campaign>, anyhow::Error> {
        let query = format!("SELECT {} FROM email_campaigns WHERE id = $1", CAMPAIGN_COLUMNS);
        sqlx::query(&query)
            .bind(campaign_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch the campaign")?
            .map(campaign_from_row)
            .transpose()
    }

    #[tracing::instrument(name = "Get campaign send logs", skip(self))]
    async fn logs(&self, campaign_id: Uuid) -> Result<Vec<SendLogEntry>, anyhow::Error> {
        sqlx::query(
            r#"
            SELECT campaign_id, recipient_email, status, error_message, sent_at
            FROM email_logs
            WHERE campaign_id = $1
            ORDER BY id
            "#,
        )
            .bind(campaign_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch the send logs")?
            .into_iter()
            .map(log_entry_from_row)
            .collect()
    }

    #[tracing::instrument(name = "Get campaign history", skip(self))]
    async fn history(&self, limit: usize) -> Result<Vec<Campaign>, anyhow::Error> {
        let query = format!(
            "SELECT {} FROM email_campaigns WHERE status = 'completed' \
             ORDER BY completed_at DESC LIMIT $1",
            CAMPAIGN_COLUMNS
        );
        sqlx::query(&query)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch the campaign history")?
            .into_iter()
            .map(campaign_from_row)
            .collect()
    }
}
