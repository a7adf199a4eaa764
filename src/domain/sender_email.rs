use validator::validate_email;

/// Mailbox the campaign is sent from; it doubles as the relay login identity.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SenderEmail(String);

impl SenderEmail {
    pub fn parse(s: String) -> Result<Self, String> {
        let s = s.trim().to_owned();
        if validate_email(&s) {
            Ok(Self(s))
        } else {
            Err(format!("{} is not a valid sender address.", s))
        }
    }
}

impl AsRef<str> for SenderEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SenderEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
