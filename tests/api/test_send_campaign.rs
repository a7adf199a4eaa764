use crate::helpers::{bulk_campaign, personalized_campaign, spawn_app, SENDER};

#[tokio::test]
async fn test_personalized_campaign_is_sent_to_every_valid_row() {
    let app = spawn_app().await;
    app.transport.fail_for("bob@example.com");
    let body = personalized_campaign(
        "Email,Name,Score\n\
         alice@example.com,Alice,90\n\
         bob@example.com,Bob,80\n\
         carol@example.com,Carol,70\n\
         nobody,Dan,60\n",
    );

    let outcome = app.send_campaign(&body).await;

    assert_eq!(outcome["status"], "completed");
    assert_eq!(outcome["total"], 3);
    assert_eq!(outcome["sent"], 2);
    assert_eq!(outcome["failed"], 1);
    assert_eq!(outcome["message"], "Campaign completed. Sent: 2, Failed: 1");
    let success_rate = outcome["success_rate"].as_f64().unwrap();
    assert!((success_rate - 200.0 / 3.0).abs() < 1e-9);

    let sent = app.transport.sent_emails();
    let bodies: Vec<&str> = sent.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(
        bodies,
        vec!["Hi Alice, your score is 90", "Hi Carol, your score is 70"]
    );
    assert!(sent.iter().all(|e| e.from.as_ref() == SENDER));
    assert_eq!(app.transport.closed_sessions(), 1);
}

#[tokio::test]
async fn test_bulk_campaign_is_a_single_message() {
    let app = spawn_app().await;
    let body = bulk_campaign("Email\none@example.com\ntwo@example.com\nthree@example.com\n");

    let outcome = app.send_campaign(&body).await;

    assert_eq!(outcome["sent"], 3);
    assert_eq!(outcome["failed"], 0);
    assert_eq!(outcome["success_rate"], 100.0);
    let bulk = app.transport.bulk_emails();
    assert_eq!(bulk.len(), 1);
    assert_eq!(bulk[0].bcc.len(), 3);
    assert!(app.transport.sent_emails().is_empty());
}

#[tokio::test]
async fn test_failed_bulk_send_is_reported_as_a_completed_campaign() {
    let app = spawn_app().await;
    app.transport.fail_bulk();

    let outcome = app
        .send_campaign(&bulk_campaign("Email\none@example.com\ntwo@example.com\n"))
        .await;

    assert_eq!(outcome["status"], "completed");
    assert_eq!(outcome["sent"], 0);
    assert_eq!(outcome["failed"], 2);
    assert_eq!(outcome["success_rate"], 0.0);
}

#[tokio::test]
async fn test_requests_missing_authorization_are_rejected() {
    let app = spawn_app().await;

    let response = app
        .api_client
        .post(&format!("{}/campaigns", &app.address))
        .json(&bulk_campaign("Email\none@example.com\n"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    assert_eq!(
        r#"Basic realm="campaigns""#,
        response.headers()["WWW-Authenticate"]
    );
    assert!(app.transport.bulk_emails().is_empty());
}

#[tokio::test]
async fn test_rejected_relay_login_returns_401() {
    let app = spawn_app().await;
    app.transport.reject_login();

    let response = app
        .post_campaign(&personalized_campaign("Email,Name,Score\na@example.com,A,1\n"))
        .await;

    assert_eq!(401, response.status().as_u16());
    assert!(app.transport.sent_emails().is_empty());
    assert_eq!(app.transport.logins(), vec![SENDER.to_string()]);
}

#[tokio::test]
async fn test_unreachable_relay_returns_502() {
    let app = spawn_app().await;
    app.transport.refuse_connection();

    let response = app
        .post_campaign(&bulk_campaign("Email\none@example.com\n"))
        .await;

    assert_eq!(502, response.status().as_u16());
}

#[tokio::test]
async fn test_campaign_without_valid_recipients_is_never_started() {
    let app = spawn_app().await;

    let response = app
        .post_campaign(&personalized_campaign("Email,Name,Score\nbad-email,X,1\n"))
        .await;

    assert_eq!(400, response.status().as_u16());
    let error: serde_json::Value = response.json().await.unwrap();
    assert_eq!(error["error"], "There are no valid recipients to send to.");
    assert!(app.transport.logins().is_empty());
}
