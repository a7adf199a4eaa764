use actix_web::{web, HttpResponse};
use anyhow::Context;
use uuid::Uuid;

use super::CampaignApiError;
use crate::dispatch::DispatchSummary;
use crate::domain::{Campaign, SendLogEntry};
use crate::store::CampaignStore;

#[derive(serde::Serialize)]
struct CampaignReport {
    campaign: Campaign,
    logs: Vec<SendLogEntry>,
    summary: DispatchSummary,
}

#[tracing::instrument(name = "Get a campaign report", skip(store))]
pub async fn campaign_report(
    campaign_id: web::Path<Uuid>,
    store: web::Data<dyn CampaignStore>,
) -> Result<HttpResponse, CampaignApiError> {
    let campaign_id = campaign_id.into_inner();
    let campaign = store
        .get(campaign_id)
        .await
        .context("Failed to load the campaign.")?
        .ok_or(CampaignApiError::NotFound)?;
    let logs = store
        .logs(campaign_id)
        .await
        .context("Failed to load the campaign send logs.")?;

    let summary = DispatchSummary {
        total: campaign.total_emails(),
        sent: campaign.sent_emails(),
        failed: campaign.failed_emails(),
    };

    Ok(HttpResponse::Ok().json(CampaignReport {
        campaign,
        logs,
        summary,
    }))
}
