use crate::helpers::{bulk_campaign, personalized_campaign, spawn_app};
use campaign_mailer::store::CampaignStore;

#[tokio::test]
async fn test_preview_reports_placeholders_and_rejected_rows() {
    let app = spawn_app().await;
    let body = personalized_campaign(
        "Email,Name,Score\n\
         alice@example.com,Alice,90\n\
         not-an-email,Bob,80\n\
         carol@example.com,,70\n",
    );

    let response = app.post_preview(&body).await;

    assert_eq!(200, response.status().as_u16());
    let preview: serde_json::Value = response.json().await.unwrap();
    assert_eq!(preview["placeholders"], serde_json::json!(["Name", "Score"]));
    assert_eq!(preview["valid_recipients"], 1);
    assert_eq!(preview["invalid_recipients"], 2);
    assert_eq!(preview["preview"], "Hi Alice, your score is 90");

    let invalid_rows = preview["invalid_rows"].as_array().unwrap();
    assert_eq!(invalid_rows[0]["row"]["row_number"], 2);
    assert_eq!(invalid_rows[0]["reasons"], serde_json::json!(["Email (Invalid)"]));
    assert_eq!(invalid_rows[1]["reasons"], serde_json::json!(["Name"]));
}

#[tokio::test]
async fn test_preview_never_sends_or_stores_anything() {
    let app = spawn_app().await;

    let response = app
        .post_preview(&bulk_campaign("Email\none@example.com\n"))
        .await;

    assert_eq!(200, response.status().as_u16());
    assert!(app.transport.logins().is_empty());
    assert!(app.store.history(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_preview_without_valid_rows_has_no_merged_body() {
    let app = spawn_app().await;

    let response = app
        .post_preview(&personalized_campaign("Email,Name,Score\nbad-email,X,1\n"))
        .await;

    assert_eq!(200, response.status().as_u16());
    let preview: serde_json::Value = response.json().await.unwrap();
    assert_eq!(preview["valid_recipients"], 0);
    assert!(preview["preview"].is_null());
}

#[tokio::test]
async fn test_preview_returns_400_for_invalid_campaigns() {
    let app = spawn_app().await;
    let test_cases = vec![
        (
            serde_json::json!({
                "subject": "Hello",
                "template": "Hi <Name>",
                "mode": "bulk",
                "recipients_csv": "Email,Name\na@example.com,A\n",
            }),
            "bulk mode with placeholders",
        ),
        (
            serde_json::json!({
                "subject": "Hello",
                "template": "Hello",
                "mode": "personalized",
                "recipients_csv": "Name\nA\n",
            }),
            "no Email column",
        ),
        (
            serde_json::json!({
                "subject": "   ",
                "template": "Hello",
                "mode": "personalized",
                "recipients_csv": "Email\na@example.com\n",
            }),
            "empty subject",
        ),
        (
            serde_json::json!({
                "subject": "Hello",
                "template": "",
                "mode": "personalized",
                "recipients_csv": "Email\na@example.com\n",
            }),
            "empty template",
        ),
        (
            serde_json::json!({
                "subject": "Hello",
                "template": "Hello",
                "mode": "broadcast",
                "recipients_csv": "Email\na@example.com\n",
            }),
            "unknown mode",
        ),
        (
            serde_json::json!({
                "subject": "Hello",
                "template": "Hello",
                "mode": "bulk",
            }),
            "missing recipients",
        ),
    ];

    for (invalid_body, error_message) in test_cases {
        let response = app.post_preview(&invalid_body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload had {}.",
            error_message
        );
    }
}
