use std::collections::HashMap;

use actix_web::{web, HttpRequest, HttpResponse};

use super::CampaignApiError;
use crate::authentication::basic_authentication;
use crate::dispatch::Dispatcher;
use crate::domain::{CampaignSubject, RecipientEmail};
use crate::template::extract_placeholders;

#[derive(serde::Deserialize)]
pub struct TestSendRequest {
    subject: String,
    template: String,
    test_email: String,
    /// Values used for the template placeholders.
    #[serde(default)]
    sample: HashMap<String, String>,
}

#[tracing::instrument(
    name = "Send a test email",
    skip(body, dispatcher, request),
    fields(sender = tracing::field::Empty)
)]
pub async fn send_test_email(
    body: web::Json<TestSendRequest>,
    dispatcher: web::Data<Dispatcher>,
    request: HttpRequest,
) -> Result<HttpResponse, CampaignApiError> {
    let credentials = basic_authentication(request.headers())
        .map_err(|e| CampaignApiError::AuthError(e.into()))?;
    tracing::Span::current().record("sender", &tracing::field::display(&credentials.identity));

    let body = body.into_inner();
    let subject = CampaignSubject::parse(body.subject).map_err(CampaignApiError::ValidationError)?;
    if body.template.trim().is_empty() {
        return Err(CampaignApiError::ValidationError(
            "The email template cannot be empty.".into(),
        ));
    }
    let destination =
        RecipientEmail::parse(body.test_email).map_err(CampaignApiError::ValidationError)?;
    let placeholders = extract_placeholders(&body.template);

    let outcome = dispatcher
        .send_test(
            &body.template,
            &placeholders.unique,
            &body.sample,
            &subject,
            &destination,
            &credentials,
        )
        .await;

    Ok(HttpResponse::Ok().json(outcome))
}
