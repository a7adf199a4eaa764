use crate::domain::{RecipientEmail, SenderEmail};

/// A message addressed to a single recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub from: SenderEmail,
    pub to: RecipientEmail,
    pub subject: String,
    pub text: String,
}

/// One message blind-copied to every recipient.
///
/// The visible `To` is the sender itself; recipients only appear in the
/// envelope, so none of them learns about the others.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkEmail {
    pub from: SenderEmail,
    pub bcc: Vec<RecipientEmail>,
    pub subject: String,
    pub text: String,
}
