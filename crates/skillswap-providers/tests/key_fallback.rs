use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skillswap_providers::GenAiClient;

const GENERATE_PATH: &str = "/models/gemini-1.5-flash:generateContent";

fn model_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [
            { "content": { "parts": [ { "text": text } ] } }
        ]
    })
}

#[tokio::test]
async fn failing_key_falls_through_to_the_next_one() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", "dead-key"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", "live-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_reply("yes")))
        .mount(&server)
        .await;

    let client = GenAiClient::new(vec!["dead-key".into(), "live-key".into()])
        .unwrap()
        .with_base_url(server.uri());

    // The dead key errors, the live key answers; the caller sees success.
    assert!(client.screen_skill("Guitar lessons", "Beginner chords").await.unwrap());
}

#[tokio::test]
async fn exhausting_every_key_surfaces_one_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = GenAiClient::new(vec!["k1".into(), "k2".into(), "k3".into()])
        .unwrap()
        .with_base_url(server.uri());

    let err = client.generate("hello").await.unwrap_err();
    assert!(err.to_string().contains("exhausted"), "got: {err:#}");
}

#[tokio::test]
async fn no_verdict_means_no() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_reply("No, that is spam")))
        .mount(&server)
        .await;

    let client = GenAiClient::new(vec!["key".into()])
        .unwrap()
        .with_base_url(server.uri());

    assert!(!client.screen_skill("FREE MONEY", "click here").await.unwrap());
}
