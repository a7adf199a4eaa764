use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_actix_web::TracingLogger;

use crate::configuration::{DatabaseSettings, Settings};
use crate::dispatch::Dispatcher;
use crate::email_client::{MailTransport, SmtpMailTransport};
use crate::rate_limit::{self, RateLimiter};
use crate::routes::{
    campaign_history, campaign_report, health_check, preview_campaign, send_campaign,
    send_test_email, verify_credentials,
};
use crate::store::{CampaignStore, PgCampaignStore};

/// Recipient lists travel inline as CSV, so the default JSON limit is too tight.
const JSON_PAYLOAD_LIMIT: usize = 16 * 1024 * 1024;

/// Number of campaigns listed by `GET /campaigns`.
pub struct HistoryLimit(pub usize);

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    /// Builds the production application: Postgres store and SMTP relay.
    pub async fn build(configuration: Settings) -> Result<Self, std::io::Error> {
        let connection_pool = get_connection_pool(&configuration.database);
        let store = Arc::new(PgCampaignStore::new(connection_pool));
        let transport = Arc::new(SmtpMailTransport::from_settings(&configuration.smtp));

        Self::build_with(configuration, store, transport).await
    }

    /// Builds the application on top of the given store and mail transport.
    pub async fn build_with(
        configuration: Settings,
        store: Arc<dyn CampaignStore>,
        transport: Arc<dyn MailTransport>,
    ) -> Result<Self, std::io::Error> {
        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        // Port 0 lets the OS pick, the actual one is read back from the listener
        let listener = TcpListener::bind(&address)?;
        let port = listener.local_addr()?.port();

        let rate_limiter: Arc<dyn RateLimiter> =
            Arc::from(rate_limit::from_settings(&configuration.dispatch.rate_limit));
        let dispatcher = Dispatcher::new(
            transport,
            Arc::clone(&store),
            rate_limiter,
            configuration.dispatch.persist_every,
        );

        let server = run(
            listener,
            store,
            dispatcher,
            HistoryLimit(configuration.dispatch.history_limit),
        )?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    // Only returns once the application is stopped
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

/// Connections are only opened on first use.
pub fn get_connection_pool(configuration: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .connect_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(configuration.with_db())
}

fn run(
    listener: TcpListener,
    store: Arc<dyn CampaignStore>,
    dispatcher: Dispatcher,
    history_limit: HistoryLimit,
) -> Result<Server, std::io::Error> {
    // `web::Data` is an `Arc`, every worker gets a cheap clone of the same state
    let store = web::Data::from(store);
    let dispatcher = web::Data::new(dispatcher);
    let history_limit = web::Data::new(history_limit);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::JsonConfig::default().limit(JSON_PAYLOAD_LIMIT))
            .route("/health_check", web::get().to(health_check))
            .route("/credentials/verify", web::post().to(verify_credentials))
            .service(
                web::scope("/campaigns")
                    .route("", web::get().to(campaign_history))
                    .route("", web::post().to(send_campaign))
                    .route("/preview", web::post().to(preview_campaign))
                    .route("/test", web::post().to(send_test_email))
                    .route("/{campaign_id}", web::get().to(campaign_report)),
            )
            .app_data(store.clone())
            .app_data(dispatcher.clone())
            .app_data(history_limit.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
