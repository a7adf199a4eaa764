use actix_web::{web, HttpRequest, HttpResponse};

use crate::authentication::basic_authentication;
use crate::dispatch::Dispatcher;
use crate::routes::CampaignApiError;

/// Checks the Basic credentials against the mail relay. The outcome of the
/// login goes in the body, only a missing or malformed header is a 401.
#[tracing::instrument(name = "Verify sender credentials", skip(dispatcher, request))]
pub async fn verify_credentials(
    dispatcher: web::Data<Dispatcher>,
    request: HttpRequest,
) -> Result<HttpResponse, CampaignApiError> {
    let credentials = basic_authentication(request.headers())
        .map_err(|e| CampaignApiError::AuthError(e.into()))?;

    let outcome = dispatcher.verify_credentials(&credentials).await;
    Ok(HttpResponse::Ok().json(outcome))
}
