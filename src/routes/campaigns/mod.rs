use std::fmt::{Debug, Formatter};

use actix_web::http::header::{self, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use anyhow::Context;

use crate::dispatch::{CampaignError, InputError};
use crate::domain::{CampaignSubject, DeliveryMode};
use crate::recipients::{Dataset, FormatError};
use crate::routes::error_chain_fmt;
use crate::telemetry::spawn_blocking_with_tracing;

mod history;
mod preview;
mod report;
mod send;
mod test_send;

pub use history::campaign_history;
pub use preview::preview_campaign;
pub use report::campaign_report;
pub use send::send_campaign;
pub use test_send::send_test_email;

#[derive(thiserror::Error)]
pub enum CampaignApiError {
    #[error("{0}")]
    ValidationError(String),
    #[error(transparent)]
    InputError(#[from] InputError),
    #[error(transparent)]
    FormatError(#[from] FormatError),
    #[error("Authentication failed.")]
    AuthError(#[source] anyhow::Error),
    #[error("The mail relay could not be reached.")]
    RelayError(#[source] anyhow::Error),
    #[error("Campaign not found.")]
    NotFound,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for CampaignApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<CampaignError> for CampaignApiError {
    fn from(e: CampaignError) -> Self {
        match e {
            CampaignError::Input(e) => CampaignApiError::InputError(e),
            CampaignError::Auth(_) => CampaignApiError::AuthError(e.into()),
            CampaignError::Transport(_) => CampaignApiError::RelayError(e.into()),
            CampaignError::Unexpected(e) => CampaignApiError::UnexpectedError(e),
        }
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for CampaignApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            CampaignApiError::ValidationError(_)
            | CampaignApiError::InputError(_)
            | CampaignApiError::FormatError(_) => StatusCode::BAD_REQUEST,
            CampaignApiError::AuthError(_) => StatusCode::UNAUTHORIZED,
            CampaignApiError::RelayError(_) => StatusCode::BAD_GATEWAY,
            CampaignApiError::NotFound => StatusCode::NOT_FOUND,
            CampaignApiError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Internals stay in the logs
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            return HttpResponse::new(status);
        }

        let mut response = HttpResponse::build(status);
        if let CampaignApiError::AuthError(_) = self {
            response.insert_header((
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(r#"Basic realm="campaigns""#),
            ));
        }
        response.json(ErrorBody {
            error: self.to_string(),
        })
    }
}

/// Campaign definition shared by the preview and send endpoints.
#[derive(serde::Deserialize)]
pub struct CampaignRequest {
    subject: String,
    template: String,
    mode: String,
    recipients_csv: String,
}

struct ParsedCampaign {
    subject: CampaignSubject,
    template: String,
    mode: DeliveryMode,
    dataset: Dataset,
}

impl CampaignRequest {
    async fn parse(self) -> Result<ParsedCampaign, CampaignApiError> {
        let subject =
            CampaignSubject::parse(self.subject).map_err(CampaignApiError::ValidationError)?;
        let mode = DeliveryMode::try_from(self.mode).map_err(CampaignApiError::ValidationError)?;
        if self.template.trim().is_empty() {
            return Err(CampaignApiError::ValidationError(
                "The email template cannot be empty.".into(),
            ));
        }

        // Large uploads would otherwise stall the worker
        let csv = self.recipients_csv;
        let dataset = spawn_blocking_with_tracing(move || Dataset::from_csv(csv.as_bytes()))
            .await
            .context("Failed to spawn blocking task.")??;

        Ok(ParsedCampaign {
            subject,
            template: self.template,
            mode,
            dataset,
        })
    }
}
