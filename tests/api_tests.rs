// tests/api_tests.rs

mod common;

use std::path::PathBuf;
use std::time::Duration;

use common::{quiz_file, scenario_json, temp_dir};
use serde_json::{Value, json};
use trivia_engine::{
    config::Config,
    routes,
    services::{
        catalog::{JsonFileSource, QuestionCatalog},
        ledger::ScoreLedger,
        score_store::JsonFileScoreStore,
    },
    state::AppState,
};

struct TestApp {
    address: String,
    data_path: PathBuf,
    scores_path: PathBuf,
}

/// Helper function to spawn the app on a random port for testing.
/// Question data and scores live in a fresh temp directory.
async fn spawn_app(questions: Vec<Value>) -> TestApp {
    // 1. Write the question pack
    let dir = temp_dir();
    let data_path = dir.join("valorantData.json");
    let scores_path = dir.join("quizPoints.json");
    std::fs::write(&data_path, quiz_file(questions).to_string()).unwrap();

    // 2. Create test configuration
    let config = Config {
        rust_log: "error".to_string(),
        port: 0,
        quiz_data_path: data_path.clone(),
        scores_path: scores_path.clone(),
        database_url: None,
        answer_timeout: Duration::from_secs(60),
        max_ranking_players: 10,
        message_retention: Duration::from_secs(300),
    };

    // 3. Build the services and the state
    let catalog = QuestionCatalog::new(JsonFileSource::new(&data_path));
    catalog.load().await;
    let ledger = ScoreLedger::new(std::sync::Arc::new(JsonFileScoreStore::new(&scores_path)));
    let state = AppState::new(catalog, ledger, config);

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        data_path,
        scores_path,
    }
}

async fn open_session(client: &reqwest::Client, app: &TestApp, body: Value) -> reqwest::Response {
    client
        .post(format!("{}/api/quiz/sessions", app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn keep_alive_responds() {
    let app = spawn_app(vec![]).await;

    let response = reqwest::get(&app.address).await.expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    assert!(response.text().await.unwrap().contains("online"));
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app(vec![]).await;

    let response = reqwest::get(format!("{}/random_path_that_does_not_exist", app.address))
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn correct_answer_flow_updates_leaderboard() {
    let app = spawn_app(vec![scenario_json()]).await;
    let client = reqwest::Client::new();

    // 1. Open a session
    let response = open_session(&client, &app, json!({ "user_id": "u1" })).await;
    assert_eq!(response.status().as_u16(), 201);
    let opened: Value = response.json().await.unwrap();
    let session_id = opened["session_id"].as_str().unwrap().to_string();
    assert_eq!(opened["question"]["id"], "q1");
    assert_eq!(opened["question"]["points"], 2);
    assert!(opened["question"].get("correct_index").is_none());

    // 2. The rendered message is open with enabled buttons
    let message: Value = client
        .get(format!("{}/api/quiz/sessions/{}", app.address, session_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(message["status"], "open");
    assert_eq!(message["buttons"][0]["enabled"], true);

    // 3. Answer correctly
    let submission: Value = client
        .post(format!("{}/api/quiz/sessions/{}/answer", app.address, session_id))
        .json(&json!({ "user_id": "u1", "selected_index": 1 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(submission["status"], "resolved");
    assert_eq!(submission["outcome"]["is_correct"], true);
    assert_eq!(submission["outcome"]["points_awarded"], 2);
    assert_eq!(submission["outcome"]["new_total_score"], 2);

    // 4. The session is finished; late answers find nothing
    let late = client
        .post(format!("{}/api/quiz/sessions/{}/answer", app.address, session_id))
        .json(&json!({ "user_id": "u1", "selected_index": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(late.status().as_u16(), 404);

    let message: Value = client
        .get(format!("{}/api/quiz/sessions/{}", app.address, session_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(message["status"], "finished");
    assert_eq!(message["terminal_updates"], 1);
    assert_eq!(message["buttons"][1]["mark"], "correct");

    // 5. Leaderboard and rank reflect the score
    let leaderboard: Value = client
        .get(format!("{}/api/quiz/leaderboard", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        leaderboard,
        json!([{ "position": 1, "user_id": "u1", "score": 2 }])
    );

    let standings: Value = client
        .get(format!("{}/api/quiz/rank/u1", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(standings["viewer"]["status"], "ranked");
    assert_eq!(standings["viewer"]["position"], 1);

    // 6. The score was persisted
    let persisted: Value =
        serde_json::from_str(&std::fs::read_to_string(&app.scores_path).unwrap()).unwrap();
    assert_eq!(persisted, json!([{ "user_id": "u1", "score": 2 }]));
}

#[tokio::test]
async fn foreign_selection_is_ignored() {
    let app = spawn_app(vec![scenario_json()]).await;
    let client = reqwest::Client::new();

    let opened: Value = open_session(&client, &app, json!({ "user_id": "u1" }))
        .await
        .json()
        .await
        .unwrap();
    let session_id = opened["session_id"].as_str().unwrap();

    let submission: Value = client
        .post(format!("{}/api/quiz/sessions/{}/answer", app.address, session_id))
        .json(&json!({ "user_id": "u2", "selected_index": 1 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(submission["status"], "ignored");
    assert_eq!(submission["reason"], "foreign_user");
}

#[tokio::test]
async fn second_open_for_same_user_conflicts() {
    let app = spawn_app(vec![scenario_json()]).await;
    let client = reqwest::Client::new();

    let first = open_session(&client, &app, json!({ "user_id": "u1" })).await;
    assert_eq!(first.status().as_u16(), 201);

    let second = open_session(&client, &app, json!({ "user_id": "u1" })).await;
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
async fn unmatched_filters_are_404() {
    let app = spawn_app(vec![scenario_json()]).await;
    let client = reqwest::Client::new();

    let response = open_session(
        &client,
        &app,
        json!({ "user_id": "u1", "category": "armas", "difficulty": "imposible" }),
    )
    .await;

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn invalid_open_request_is_400() {
    let app = spawn_app(vec![scenario_json()]).await;
    let client = reqwest::Client::new();

    let response = open_session(&client, &app, json!({ "user_id": "" })).await;

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn never_played_user_is_not_ranked() {
    let app = spawn_app(vec![]).await;

    let standings: Value = reqwest::get(format!("{}/api/quiz/rank/never-played-user", app.address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(standings["viewer"]["status"], "not_ranked");
    assert_eq!(standings["top"], json!([]));
}

#[tokio::test]
async fn reload_picks_up_new_questions() {
    let app = spawn_app(vec![]).await;
    let client = reqwest::Client::new();

    let before = open_session(&client, &app, json!({ "user_id": "u1" })).await;
    assert_eq!(before.status().as_u16(), 404);

    std::fs::write(&app.data_path, quiz_file(vec![scenario_json()]).to_string()).unwrap();
    let report: Value = client
        .post(format!("{}/api/quiz/reload", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["loaded"], 1);

    let after = open_session(&client, &app, json!({ "user_id": "u1" })).await;
    assert_eq!(after.status().as_u16(), 201);
}

#[tokio::test]
async fn categories_autocomplete() {
    let app = spawn_app(vec![]).await;

    let categories: Value = reqwest::get(format!("{}/api/quiz/categories?q=ar", app.address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(
        categories,
        json!([{ "name": "armas", "description": "Preguntas sobre las armas y combate" }])
    );
}
