use actix_web::{web, HttpResponse};
use anyhow::Context;

use super::CampaignApiError;
use crate::domain::CampaignSummary;
use crate::startup::HistoryLimit;
use crate::store::CampaignStore;

#[tracing::instrument(name = "List campaign history", skip(store, limit))]
pub async fn campaign_history(
    store: web::Data<dyn CampaignStore>,
    limit: web::Data<HistoryLimit>,
) -> Result<HttpResponse, CampaignApiError> {
    let history: Vec<CampaignSummary> = store
        .history(limit.0)
        .await
        .context("Failed to load the campaign history.")?
        .iter()
        .map(|campaign| campaign.summary())
        .collect();

    Ok(HttpResponse::Ok().json(history))
}
