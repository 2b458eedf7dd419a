//! End-to-end tests: real proxy, real target, real sockets.

use cors_forward_proxy::config::ProxyConfig;
use cors_forward_proxy::error::RATE_LIMITED_MESSAGE;
use cors_forward_proxy::http::response::NO_RESPONSE_DETAILS;
use serde_json::{json, Value};

mod common;

#[tokio::test]
async fn test_round_trip_through_echo_target() {
    let target = common::start_echo_target().await;
    let (proxy, shutdown) = common::start_proxy(ProxyConfig::default()).await;
    let client = common::http_client();

    let echo_url = format!("http://{}/echo", target);
    let direct: Value = client
        .post(&echo_url)
        .header("content-type", "application/json")
        .body(r#"{"a":1}"#)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let res = client
        .post(format!("http://{}/proxy?url={}", proxy, common::encode(&echo_url)))
        .header("content-type", "application/json")
        .header("cookie", "session=secret")
        .header("language", "fr")
        .body(r#"{"a":1}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "application/json");
    let via_proxy: Value = res.json().await.unwrap();

    assert_eq!(via_proxy, direct);
    assert_eq!(via_proxy["method"], "POST");
    assert_eq!(via_proxy["body"], json!({ "a": 1 }));
    assert_eq!(via_proxy["headers"]["cookie"], Value::Null);
    // Not in the passthrough list by default.
    assert_eq!(via_proxy["headers"]["language"], Value::Null);

    shutdown.trigger();
}

#[tokio::test]
async fn test_authorization_and_passthrough_headers() {
    let target = common::start_echo_target().await;
    let mut config = ProxyConfig::default();
    config.forwarding.passthrough_headers = vec!["language".into()];
    let (proxy, shutdown) = common::start_proxy(config).await;
    let client = common::http_client();

    let echo_url = format!("http://{}/echo", target);
    let body: Value = client
        .get(format!("http://{}/proxy?url={}", proxy, common::encode(&echo_url)))
        .header("Authorization", "Bearer caller-token")
        .header("language", "de")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["method"], "GET");
    assert_eq!(body["headers"]["authorization"], "Bearer caller-token");
    assert_eq!(body["headers"]["content-type"], "application/json");
    assert_eq!(body["headers"]["language"], "de");

    shutdown.trigger();
}

#[tokio::test]
async fn test_target_404_passes_through_unchanged() {
    let target = common::start_echo_target().await;
    let (proxy, shutdown) = common::start_proxy(ProxyConfig::default()).await;

    let missing = format!("http://{}/missing", target);
    let res = common::http_client()
        .get(format!("http://{}/proxy?url={}", proxy, common::encode(&missing)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 404);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({ "x": "y" }));

    shutdown.trigger();
}

#[tokio::test]
async fn test_text_target_relayed_as_json_string() {
    let target = common::start_echo_target().await;
    let (proxy, shutdown) = common::start_proxy(ProxyConfig::default()).await;

    let text = format!("http://{}/text", target);
    let res = common::http_client()
        .get(format!("http://{}/proxy?url={}", proxy, common::encode(&text)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.json::<Value>().await.unwrap(), json!("plain words"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_target_is_500_with_details() {
    let dead = common::refused_addr().await;
    let (proxy, shutdown) = common::start_proxy(ProxyConfig::default()).await;

    let url = format!("http://{}/anything", dead);
    let res = common::http_client()
        .get(format!("http://{}/proxy?url={}", proxy, common::encode(&url)))
        .header("origin", "https://app.example")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    assert_eq!(res.headers()["access-control-allow-origin"], "https://app.example");
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    assert_eq!(body["details"], NO_RESPONSE_DETAILS);

    shutdown.trigger();
}

#[tokio::test]
async fn test_rate_limit_over_real_connections() {
    let target = common::start_echo_target().await;
    let mut config = ProxyConfig::default();
    config.rate_limit.max_requests = 2;
    let (proxy, shutdown) = common::start_proxy(config).await;
    let client = common::http_client();

    let echo_url = format!("http://{}/echo", target);
    let url = format!("http://{}/proxy?url={}", proxy, common::encode(&echo_url));

    for _ in 0..2 {
        assert_eq!(client.get(&url).send().await.unwrap().status(), 200);
    }
    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), 429);
    assert_eq!(res.text().await.unwrap(), RATE_LIMITED_MESSAGE);

    shutdown.trigger();
}

#[tokio::test]
async fn test_liveness_and_unknown_path() {
    let (proxy, shutdown) = common::start_proxy(ProxyConfig::default()).await;
    let client = common::http_client();

    let res = client.get(format!("http://{}/", proxy)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "Dynamic CORS proxy server is running.");

    let res = client.get(format!("http://{}/elsewhere", proxy)).send().await.unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
}
