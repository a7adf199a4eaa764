use crate::helpers::{spawn_app, SENDER};

#[tokio::test]
async fn test_valid_credentials_log_in_and_hang_up() {
    let app = spawn_app().await;

    let response = app.post_verify_credentials().await;

    assert_eq!(200, response.status().as_u16());
    let outcome: serde_json::Value = response.json().await.unwrap();
    assert_eq!(outcome["success"], true);
    assert_eq!(
        outcome["message"],
        format!("Credentials verified for {}", SENDER)
    );
    assert_eq!(app.transport.logins(), vec![SENDER.to_string()]);
    assert_eq!(app.transport.closed_sessions(), 1);
    assert!(app.transport.sent_emails().is_empty());
}

#[tokio::test]
async fn test_rejected_login_is_reported_as_an_authentication_failure() {
    let app = spawn_app().await;
    app.transport.reject_login();

    let response = app.post_verify_credentials().await;

    assert_eq!(200, response.status().as_u16());
    let outcome: serde_json::Value = response.json().await.unwrap();
    assert_eq!(outcome["success"], false);
    assert!(outcome["message"]
        .as_str()
        .unwrap()
        .starts_with("Authentication failed"));
}

#[tokio::test]
async fn test_unreachable_relay_is_reported_as_a_connection_failure() {
    let app = spawn_app().await;
    app.transport.refuse_connection();

    let response = app.post_verify_credentials().await;

    assert_eq!(200, response.status().as_u16());
    let outcome: serde_json::Value = response.json().await.unwrap();
    assert_eq!(outcome["success"], false);
    let message = outcome["message"].as_str().unwrap();
    assert!(message.starts_with("Could not reach the mail relay"));
    assert!(message.contains("Connection refused"));
    assert!(app.transport.logins().is_empty());
}

#[tokio::test]
async fn test_verification_without_credentials_is_rejected() {
    let app = spawn_app().await;

    let response = app
        .api_client
        .post(&format!("{}/credentials/verify", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    assert_eq!(
        r#"Basic realm="campaigns""#,
        response.headers()["WWW-Authenticate"]
    );
    assert!(app.transport.logins().is_empty());
}
