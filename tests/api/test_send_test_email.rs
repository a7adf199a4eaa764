use crate::helpers::{spawn_app, SENDER};

fn test_email() -> serde_json::Value {
    serde_json::json!({
        "subject": "Your results",
        "template": "Hi <Name>, your score is <Score>",
        "test_email": "me@example.com",
        "sample": { "Name": "Sam", "Score": "42" },
    })
}

#[tokio::test]
async fn test_test_email_is_sent_with_a_marked_subject() {
    let app = spawn_app().await;

    let response = app.post_test_email(&test_email()).await;

    assert_eq!(200, response.status().as_u16());
    let outcome: serde_json::Value = response.json().await.unwrap();
    assert_eq!(outcome["success"], true);

    let sent = app.transport.sent_emails();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "[TEST] Your results");
    assert_eq!(sent[0].text, "Hi Sam, your score is 42");
    assert_eq!(sent[0].to.as_ref(), "me@example.com");
    assert_eq!(app.transport.logins(), vec![SENDER.to_string()]);
}

#[tokio::test]
async fn test_missing_sample_values_are_left_empty() {
    let app = spawn_app().await;
    let mut body = test_email();
    body["sample"] = serde_json::json!({ "Name": "Sam" });

    let response = app.post_test_email(&body).await;

    assert_eq!(200, response.status().as_u16());
    assert_eq!(
        app.transport.sent_emails()[0].text,
        "Hi Sam, your score is "
    );
}

#[tokio::test]
async fn test_requests_without_credentials_are_rejected() {
    let app = spawn_app().await;

    let response = app
        .api_client
        .post(&format!("{}/campaigns/test", &app.address))
        .json(&test_email())
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

#[tokio::test]
async fn test_invalid_destination_is_rejected() {
    let app = spawn_app().await;
    let mut body = test_email();
    body["test_email"] = serde_json::json!("not-an-email");

    let response = app.post_test_email(&body).await;

    assert_eq!(400, response.status().as_u16());
    assert!(app.transport.logins().is_empty());
}

#[tokio::test]
async fn test_blank_template_is_rejected() {
    let app = spawn_app().await;
    let mut body = test_email();
    body["template"] = serde_json::json!("  \n\t ");

    let response = app.post_test_email(&body).await;

    assert_eq!(400, response.status().as_u16());
    let error: serde_json::Value = response.json().await.unwrap();
    assert_eq!(error["error"], "The email template cannot be empty.");
    assert!(app.transport.logins().is_empty());
}

#[tokio::test]
async fn test_relay_failures_are_reported_in_the_body() {
    let app = spawn_app().await;
    app.transport.reject_login();

    let response = app.post_test_email(&test_email()).await;

    assert_eq!(200, response.status().as_u16());
    let outcome: serde_json::Value = response.json().await.unwrap();
    assert_eq!(outcome["success"], false);
    assert!(outcome["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to send test email"));
}
