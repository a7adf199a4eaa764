pub mod authentication;
pub mod configuration;
pub mod dispatch;
pub mod domain;
pub mod email_client;
pub mod email_request;
pub mod mocks;
pub mod rate_limit;
pub mod recipients;
pub mod routes;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod template;
