//! Route-level rate limiting

mod harness;

use std::time::Duration;

use harness::config::ConfigBuilder;
use harness::mock_model::MockModel;
use harness::server::TestServer;

#[tokio::test]
async fn global_limit_answers_429_with_retry_after() {
    let mock = MockModel::start().await.unwrap();
    let config = ConfigBuilder::new(&mock.base_url())
        .with_global_rate_limit(2, Duration::from_secs(60))
        .build();
    let server = TestServer::start(config).await.unwrap();

    for _ in 0..2 {
        let resp = server.client().get(server.url("/health")).send().await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    let resp = server.client().get(server.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), 429);
    assert!(resp.headers().contains_key("retry-after"));

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["type"], "rate_limit_error");
}

#[tokio::test]
async fn per_user_limit_degrades_instead_of_failing() {
    let mock = MockModel::start().await.unwrap();
    let config = ConfigBuilder::new(&mock.base_url())
        .with_user_rate_limit(1, Duration::from_secs(60))
        .build();
    let server = TestServer::start(config).await.unwrap();

    let body = server.govern("assistant_reply", "u1", "one").await;
    assert_eq!(body["status"], "generated");

    let body = server.govern("assistant_reply", "u1", "two").await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["fallback_action"], "basic_mode");
    assert!(body["message"].as_str().unwrap().contains("seconds"));

    let body = server.govern("assistant_reply", "u2", "one").await;
    assert_eq!(body["status"], "generated");
    assert_eq!(mock.cheap_calls(), 2);
}
