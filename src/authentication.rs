use actix_web::http::header::HeaderMap;
use anyhow::Context;
use secrecy::Secret;

use crate::domain::SenderEmail;

/// Relay login for one send operation.
///
/// The identity is also the `From` mailbox of every message. Callers own the
/// lifetime of this value; nothing in the crate stores it beyond a single
/// pipeline run and it is never recorded in logs or spans.
#[derive(Debug)]
pub struct Credentials {
    pub identity: SenderEmail,
    pub secret: Secret<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum CredentialsError {
    #[error("Relay credentials are required.")]
    Missing(#[source] anyhow::Error),
    #[error("The relay identity must be an email address.")]
    InvalidIdentity(#[source] anyhow::Error),
}

/// Reads relay credentials from an HTTP `Basic` authorization header.
pub fn basic_authentication(headers: &HeaderMap) -> Result<Credentials, CredentialsError> {
    let (username, password) = decode_basic_header(headers).map_err(CredentialsError::Missing)?;
    let identity = SenderEmail::parse(username)
        .map_err(|e| CredentialsError::InvalidIdentity(anyhow::anyhow!(e)))?;

    Ok(Credentials {
        identity,
        secret: Secret::new(password),
    })
}

fn decode_basic_header(headers: &HeaderMap) -> Result<(String, String), anyhow::Error> {
    let header_value = headers
        .get("Authorization")
        .context("The 'Authorization' header was not found")?
        .to_str()
        .context("The 'Authorization' header was not a valid UTF8 string")?;

    let base64_encoded_segment = header_value
        .strip_prefix("Basic ")
        .context("The authorization scheme was not 'Basic'")?;
    let decoded_bytes = base64::decode_config(base64_encoded_segment, base64::STANDARD)
        .context("Failed to decode base64 'Basic' credentials")?;
    let decoded_credentials = String::from_utf8(decoded_bytes)
        .context("The decoded credential string is not valid UTF8")?;

    // Split the decoded credentials into two segments
    let mut credentials = decoded_credentials.splitn(2, ':');
    let username = credentials
        .next()
        .ok_or_else(|| anyhow::anyhow!("A username must be provided in 'Basic' auth."))?
        .to_string();
    let password = credentials
        .next()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| anyhow::anyhow!("A password must be provided in 'Basic' auth."))?
        .to_string();

    Ok((username, password))
}
