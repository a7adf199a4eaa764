mod helpers;
mod test_campaign_history;
mod test_campaign_report;
mod test_health_check;
mod test_preview_campaign;
mod test_send_campaign;
mod test_send_test_email;
mod test_verify_credentials;
