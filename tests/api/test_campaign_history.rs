use crate::helpers::{bulk_campaign, personalized_campaign, spawn_app};

#[tokio::test]
async fn test_history_lists_completed_campaigns_newest_first() {
    let app = spawn_app().await;
    app.transport.fail_for("b@example.com");

    app.send_campaign(&bulk_campaign("Email\nx@example.com\n")).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    app.send_campaign(&personalized_campaign(
        "Email,Name,Score\na@example.com,A,1\nb@example.com,B,2\n",
    ))
    .await;

    let response = app.get_history().await;

    assert_eq!(200, response.status().as_u16());
    let history: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["subject"], "Your results");
    assert_eq!(history[0]["total_recipients"], 2);
    assert_eq!(history[0]["sent_successfully"], 1);
    assert_eq!(history[0]["failed_to_send"], 1);
    assert_eq!(history[0]["success_rate"], 50.0);
    assert_eq!(history[1]["subject"], "Announcement");
}

#[tokio::test]
async fn test_failed_runs_are_not_part_of_the_history() {
    let app = spawn_app().await;
    app.transport.reject_login();

    let response = app
        .post_campaign(&bulk_campaign("Email\nx@example.com\n"))
        .await;
    assert_eq!(401, response.status().as_u16());

    let history: Vec<serde_json::Value> = app.get_history().await.json().await.unwrap();
    assert!(history.is_empty());
}
