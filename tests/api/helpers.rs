use std::sync::Arc;

use campaign_mailer::configuration::{get_configuration, RateLimitStrategy};
use campaign_mailer::mocks::MockMailTransport;
use campaign_mailer::startup::Application;
use campaign_mailer::store::InMemoryCampaignStore;
use campaign_mailer::telemetry::{get_subscriber, init_subscriber};
use once_cell::sync::Lazy;

// Ensure that the `tracing` stack is only initialized once rather than for each test case
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    // The sink is part of the type returned by `get_subscriber`, hence the two branches
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub const SENDER: &str = "sender@example.com";
pub const APP_PASSWORD: &str = "app-password";

pub struct TestApp {
    pub address: String,
    pub transport: MockMailTransport,
    pub store: Arc<InMemoryCampaignStore>,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn post_preview(&self, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/campaigns/preview", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_test_email(&self, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/campaigns/test", &self.address))
            .basic_auth(SENDER, Some(APP_PASSWORD))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_campaign(&self, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/campaigns", &self.address))
            .basic_auth(SENDER, Some(APP_PASSWORD))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Sends a campaign and returns the parsed response body.
    pub async fn send_campaign(&self, body: &serde_json::Value) -> serde_json::Value {
        let response = self.post_campaign(body).await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response body.")
    }

    pub async fn post_verify_credentials(&self) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/credentials/verify", &self.address))
            .basic_auth(SENDER, Some(APP_PASSWORD))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_history(&self) -> reqwest::Response {
        self.api_client
            .get(&format!("{}/campaigns", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_report(&self, campaign_id: &str) -> reqwest::Response {
        self.api_client
            .get(&format!("{}/campaigns/{}", &self.address, campaign_id))
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

/// Spins up the application in the background on a random port, with an
/// in-memory store and a mock mail relay.
pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        // Bind to a random port provided by the OS
        c.application.port = 0;
        // No pause between sends
        c.dispatch.rate_limit.strategy = RateLimitStrategy::FixedDelay;
        c.dispatch.rate_limit.delay_milliseconds = 0;
        c
    };

    let transport = MockMailTransport::new();
    let store = Arc::new(InMemoryCampaignStore::new());
    let application =
        Application::build_with(configuration, store.clone(), Arc::new(transport.clone()))
            .await
            .expect("Failed to build application.");

    let address = format!("http://127.0.0.1:{}", application.port());
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address,
        transport,
        store,
        api_client: reqwest::Client::new(),
    }
}

pub fn personalized_campaign(csv: &str) -> serde_json::Value {
    serde_json::json!({
        "subject": "Your results",
        "template": "Hi <Name>, your score is <Score>",
        "mode": "personalized",
        "recipients_csv": csv,
    })
}

pub fn bulk_campaign(csv: &str) -> serde_json::Value {
    serde_json::json!({
        "subject": "Announcement",
        "template": "Hello all",
        "mode": "bulk",
        "recipients_csv": csv,
    })
}
