use reqwest::Client;
use serde_json::json;

mod common;
use common::utils::spawn_app;

#[tokio::test]
async fn planned_transfers_round_trip() {
    let test_app = spawn_app().await;
    let client = Client::new();

    let response = client
        .post(&format!("{}/api/manager/42/transfers/7", &test_app.address))
        .json(&json!([
            {"out_player_id": 3, "in_player_id": 99},
            {"out_player_id": 11, "in_player_id": 120}
        ]))
        .send()
        .await
        .expect("Failed to execute request.");
    assert!(response.status().is_success());

    let response = client
        .get(&format!("{}/api/manager/42/transfers/7", &test_app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Invalid json body.");
    let transfers = body["data"].as_array().unwrap();
    assert_eq!(transfers.len(), 2);
    assert_eq!(transfers[0]["out_player_id"], json!(3));
    assert_eq!(transfers[0]["in_player_id"], json!(99));
}

#[tokio::test]
async fn storing_again_replaces_the_list() {
    let test_app = spawn_app().await;
    let client = Client::new();

    for payload in [
        json!([{"out_player_id": 1, "in_player_id": 2}]),
        json!([{"out_player_id": 5, "in_player_id": 6}]),
    ] {
        let response = client
            .post(&format!("{}/api/manager/42/transfers/7", &test_app.address))
            .json(&payload)
            .send()
            .await
            .expect("Failed to execute request.");
        assert!(response.status().is_success());
    }

    let response = client
        .get(&format!("{}/api/manager/42/transfers/7", &test_app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    let body: serde_json::Value = response.json().await.expect("Invalid json body.");
    let transfers = body["data"].as_array().unwrap();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0]["out_player_id"], json!(5));
}

#[tokio::test]
async fn unknown_manager_has_no_planned_transfers() {
    let test_app = spawn_app().await;
    let client = Client::new();

    let response = client
        .get(&format!("{}/api/manager/7777/transfers/7", &test_app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Invalid json body.");
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn oversized_transfer_list_is_rejected() {
    let test_app = spawn_app().await;
    let client = Client::new();

    let oversized: Vec<_> = (1..=16)
        .map(|i| json!({"out_player_id": i, "in_player_id": i + 100}))
        .collect();
    let response = client
        .post(&format!("{}/api/manager/42/transfers/7", &test_app.address))
        .json(&oversized)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn negative_player_ids_are_rejected() {
    let test_app = spawn_app().await;
    let client = Client::new();

    let response = client
        .post(&format!("{}/api/manager/42/transfers/7", &test_app.address))
        .json(&json!([{"out_player_id": -1, "in_player_id": 5}]))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 400);
}
