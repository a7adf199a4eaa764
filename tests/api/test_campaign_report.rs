use crate::helpers::{personalized_campaign, spawn_app};

#[tokio::test]
async fn test_report_lists_log_entries_in_send_order() {
    let app = spawn_app().await;
    app.transport.fail_for("b@example.com");
    let outcome = app
        .send_campaign(&personalized_campaign(
            "Email,Name,Score\n\
             a@example.com,A,1\n\
             b@example.com,B,2\n\
             c@example.com,C,3\n",
        ))
        .await;
    let campaign_id = outcome["campaign_id"].as_str().unwrap();

    let response = app.get_report(campaign_id).await;

    assert_eq!(200, response.status().as_u16());
    let report: serde_json::Value = response.json().await.unwrap();
    assert_eq!(report["campaign"]["status"], "completed");
    assert_eq!(report["campaign"]["placeholders"], serde_json::json!(["Name", "Score"]));
    assert_eq!(
        report["summary"],
        serde_json::json!({ "total": 3, "sent": 2, "failed": 1 })
    );

    let logs = report["logs"].as_array().unwrap();
    let recipients: Vec<&str> = logs
        .iter()
        .map(|entry| entry["recipient_email"].as_str().unwrap())
        .collect();
    assert_eq!(recipients, vec!["a@example.com", "b@example.com", "c@example.com"]);
    assert_eq!(logs[1]["outcome"], "failed");
    assert!(logs[1]["error_message"].as_str().unwrap().contains("550"));
    assert!(logs[0]["error_message"].is_null());
}

#[tokio::test]
async fn test_unknown_campaign_returns_404() {
    let app = spawn_app().await;

    let response = app.get_report(&uuid::Uuid::new_v4().to_string()).await;

    assert_eq!(404, response.status().as_u16());
}
