use actix_web::{web, HttpRequest, HttpResponse};
use anyhow::Context;
use uuid::Uuid;

use super::{CampaignApiError, CampaignRequest};
use crate::authentication::basic_authentication;
use crate::dispatch::{prepare_campaign, Dispatcher};
use crate::domain::CampaignStatus;
use crate::store::CampaignStore;

#[derive(serde::Serialize)]
struct SendResponse {
    campaign_id: Uuid,
    status: CampaignStatus,
    total: u32,
    sent: u32,
    failed: u32,
    success_rate: f64,
    message: String,
}

/// Creates a campaign and sends it, answering once the run is over.
#[tracing::instrument(
    name = "Send a campaign",
    skip(body, store, dispatcher, request),
    fields(sender = tracing::field::Empty, campaign_id = tracing::field::Empty)
)]
pub async fn send_campaign(
    body: web::Json<CampaignRequest>,
    store: web::Data<dyn CampaignStore>,
    dispatcher: web::Data<Dispatcher>,
    request: HttpRequest,
) -> Result<HttpResponse, CampaignApiError> {
    let credentials = basic_authentication(request.headers())
        .map_err(|e| CampaignApiError::AuthError(e.into()))?;
    tracing::Span::current().record("sender", &tracing::field::display(&credentials.identity));

    let parsed = body.into_inner().parse().await?;
    let prepared = prepare_campaign(
        parsed.subject,
        parsed.template,
        parsed.mode,
        &parsed.dataset,
    )?;
    let mut campaign = prepared.campaign;
    tracing::Span::current().record("campaign_id", &tracing::field::display(campaign.id()));

    store
        .create(&campaign)
        .await
        .context("Failed to store the new campaign.")?;
    let summary = dispatcher
        .run_campaign(&mut campaign, &prepared.report.valid, &credentials)
        .await?;

    Ok(HttpResponse::Ok().json(SendResponse {
        campaign_id: campaign.id(),
        status: campaign.status(),
        total: summary.total,
        sent: summary.sent,
        failed: summary.failed,
        success_rate: summary.success_rate(),
        message: summary.to_string(),
    }))
}
