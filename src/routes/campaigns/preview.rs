use actix_web::{web, HttpResponse};

use super::{CampaignApiError, CampaignRequest};
use crate::dispatch::{required_placeholders, InputError};
use crate::recipients::{validate_recipients, InvalidRecipient};
use crate::template::merge;

#[derive(serde::Serialize)]
struct PreviewResponse {
    subject: String,
    mode: &'static str,
    placeholders: Vec<String>,
    valid_recipients: usize,
    invalid_recipients: usize,
    invalid_rows: Vec<InvalidRecipient>,
    /// Body merged with the first valid row, if any.
    preview: Option<String>,
}

/// Checks a campaign without sending or storing anything.
#[tracing::instrument(name = "Preview a campaign", skip(body))]
pub async fn preview_campaign(
    body: web::Json<CampaignRequest>,
) -> Result<HttpResponse, CampaignApiError> {
    let campaign = body.into_inner().parse().await?;
    let placeholders = required_placeholders(&campaign.template, campaign.mode)?;
    let report =
        validate_recipients(&campaign.dataset, &placeholders).map_err(InputError::from)?;

    let preview = report
        .valid
        .first()
        .map(|recipient| merge(&campaign.template, &placeholders, &recipient.row));

    Ok(HttpResponse::Ok().json(PreviewResponse {
        subject: campaign.subject.to_string(),
        mode: campaign.mode.as_str(),
        placeholders,
        valid_recipients: report.valid.len(),
        invalid_recipients: report.invalid.len(),
        invalid_rows: report.invalid,
        preview,
    }))
}
