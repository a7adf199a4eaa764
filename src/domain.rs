use unicode_segmentation::UnicodeSegmentation;

pub mod campaign;
pub mod recipient_email;
pub mod sender_email;

pub use campaign::{
    success_rate, Campaign, CampaignStatus, CampaignSummary, DeliveryMode, DeliveryOutcome,
    SendLogEntry,
};
pub use recipient_email::RecipientEmail;
pub use sender_email::SenderEmail;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CampaignSubject(String);

impl CampaignSubject {
    pub fn parse(subject: String) -> Result<Self, String> {
        let subject = subject.trim().to_owned();
        let is_empty_or_whitespace = subject.is_empty();

        // A grapheme is a "user-perceived" character: `å` is a single grapheme,
        // but it is composed of two characters (`a` and `̊`).
        let is_too_long = subject.graphemes(true).count() > 256;

        // A line break inside a header value would let the caller smuggle
        // extra headers into every message of the campaign
        let contains_line_break = subject.chars().any(|c| c == '\r' || c == '\n');

        if is_empty_or_whitespace {
            Err("A subject is required.".to_string())
        } else if is_too_long {
            Err(format!("{} is too long to be used as a subject.", subject))
        } else if contains_line_break {
            Err("A subject must fit on a single line.".to_string())
        } else {
            Ok(Self(subject))
        }
    }

    /// Subject line used by the test-send path.
    pub fn as_test(&self) -> String {
        format!("[TEST] {}", self.0)
    }
}

impl AsRef<str> for CampaignSubject {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CampaignSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
