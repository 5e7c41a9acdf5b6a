use futures_util::{SinkExt, StreamExt};
use kids_learning_api::{
    config::{Config, ContentProvider},
    router::create_router,
    state::AppState,
};
use kids_learning_core::sample::SampleContentClient;
use serde_json::{Value, json};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::Level;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> SocketAddr {
    let config = Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        content_provider: ContentProvider::Sample,
        content_service_url: String::new(),
        content_timeout: Duration::from_secs(5),
        translation_locale: "te-IN".to_string(),
        log_level: Level::INFO,
    };
    let state = Arc::new(AppState {
        content_client: Arc::new(SampleContentClient::seeded(11)),
        config: Arc::new(config),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    addr
}

async fn connect() -> Client {
    let addr = spawn_server().await;
    let (ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    ws
}

async fn send(ws: &mut Client, msg: Value) {
    ws.send(Message::Text(msg.to_string().into())).await.unwrap();
}

async fn recv(ws: &mut Client) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Message::Text(text) = ws.next().await.unwrap().unwrap() {
                return serde_json::from_str::<Value>(&text).unwrap();
            }
        }
    })
    .await
    .expect("server should reply")
}

#[tokio::test]
async fn test_story_quiz_and_score_over_websocket() {
    let mut ws = connect().await;

    send(&mut ws, json!({"type": "enter_story", "age": 6, "topic": "forest"})).await;
    assert_eq!(recv(&mut ws).await, json!({"type": "loading", "mode": "story"}));

    let passage = recv(&mut ws).await;
    assert_eq!(passage["type"], "passage");
    assert_eq!(passage["sentences"].as_array().unwrap().len(), 3);
    let story = passage["text"].as_str().unwrap().to_string();
    assert!(story.contains("forest"));

    let speak = recv(&mut ws).await;
    assert_eq!(speak["type"], "speak");
    assert_eq!(speak["text"], story.as_str());
    assert_eq!(speak["locale"], "en-US");

    send(&mut ws, json!({"type": "enter_quiz"})).await;
    assert_eq!(recv(&mut ws).await, json!({"type": "loading", "mode": "quiz"}));
    let quiz = recv(&mut ws).await;
    assert_eq!(quiz["type"], "quiz");
    assert_eq!(quiz["questions"].as_array().unwrap().len(), 2);

    send(&mut ws, json!({"type": "record_answer", "index": 0, "value": "3"})).await;
    assert_eq!(recv(&mut ws).await, json!({"type": "answer_recorded", "index": 0}));
    send(&mut ws, json!({"type": "record_answer", "index": 1, "value": "Moon"})).await;
    assert_eq!(recv(&mut ws).await, json!({"type": "answer_recorded", "index": 1}));

    send(&mut ws, json!({"type": "submit"})).await;
    let score = recv(&mut ws).await;
    assert_eq!(score["type"], "score");
    assert_eq!(score["correct"], 1);
    assert_eq!(score["total"], 2);
    assert_eq!(score["review"][1]["expected"], "Once");

    send(&mut ws, json!({"type": "record_answer", "index": 1, "value": "Once"})).await;
    let locked = recv(&mut ws).await;
    assert_eq!(locked["type"], "error");
    assert_eq!(locked["kind"], "invalid_state");
    assert_eq!(locked["retryable"], false);
}

#[tokio::test]
async fn test_invalid_requests_are_reported() {
    let mut ws = connect().await;

    send(&mut ws, json!({"type": "translate"})).await;
    let reply = recv(&mut ws).await;
    assert_eq!(reply["kind"], "invalid_precondition");

    send(&mut ws, json!({"type": "enter_math", "age": 30, "operation": "addition"})).await;
    let reply = recv(&mut ws).await;
    assert_eq!(reply["kind"], "invalid_precondition");

    send(&mut ws, json!({"type": "dance"})).await;
    let reply = recv(&mut ws).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["kind"], "bad_request");
}

#[tokio::test]
async fn test_routine_translation_is_narrated_in_second_language() {
    let mut ws = connect().await;

    send(&mut ws, json!({"type": "enter_daily_routine", "age": 5})).await;
    assert_eq!(recv(&mut ws).await["type"], "loading");
    assert_eq!(recv(&mut ws).await["mode"], "daily_routine");

    send(&mut ws, json!({"type": "translate"})).await;
    let translation = recv(&mut ws).await;
    assert_eq!(translation["type"], "translation");
    assert_eq!(translation["sentences"].as_array().unwrap().len(), 4);

    let speak = recv(&mut ws).await;
    assert_eq!(speak["type"], "speak");
    assert_eq!(speak["locale"], "te-IN");
}
