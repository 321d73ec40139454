//! End-to-end tests for `GET /subs/{token}` against mock providers.

use axum::http::StatusCode;
use serde_yaml::Value;
use std::time::Duration;

use subs_merger::config::ServiceConfig;
use subs_merger::subscription::Source;

mod common;

const TOKEN: &str = "s3cret";

const PROVIDER_A: &str = "\
port: 7890
proxies:
  - name: a1
    type: ss
    server: a1.example.com
    port: 8388
    cipher: aes-256-gcm
    password: pw
  - name: a2
    type: vmess
    server: a2.example.com
    port: 443
    uuid: 00000000-0000-0000-0000-000000000000
    alterId: 0
    ws-opts:
      path: /very/long/path/that/should/never/be/folded/by/the/emitter/even/when/it/is/far/beyond/eighty/columns
rules:
  - MATCH,DIRECT
";

const PROVIDER_C: &str = "\
proxies:
  - {name: c1, type: trojan, server: c1.example.com, port: 443, password: x}
";

fn config_with(sources: Vec<Source>) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.store.bootstrap_token = Some(TOKEN.to_string());
    config.store.bootstrap_sources = sources;
    config
}

fn names(seq: &Value) -> Vec<String> {
    seq.as_sequence()
        .unwrap()
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other["name"].as_str().unwrap().to_string(),
        })
        .collect()
}

#[tokio::test]
async fn test_merged_profile_skips_failed_source() {
    let (a_addr, a_seen) = common::start_mock_provider(200, PROVIDER_A).await;
    let (b_addr, _) = common::start_mock_provider(500, "internal error").await;

    let service = common::start_service(config_with(vec![
        Source::new("A", format!("http://{}/sub", a_addr)),
        Source::new("B", format!("http://{}/sub", b_addr)),
    ]))
    .await;

    let res = common::client()
        .get(service.url(&format!("/subs/{}", TOKEN)))
        .send()
        .await
        .expect("service unreachable");

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-type"],
        "application/x-yaml; charset=utf-8"
    );
    assert!(res.headers().contains_key("x-request-id"));

    let text = res.text().await.unwrap();
    assert!(!text.contains('&') && !text.contains('*'), "no anchors or aliases");
    assert!(text.contains("/very/long/path/that/should/never/be/folded/by/the/emitter/even/when/it/is/far/beyond/eighty/columns"));

    let doc: Value = serde_yaml::from_str(&text).unwrap();
    assert_eq!(names(&doc["proxies"]), ["a1", "a2"]);
    assert_eq!(doc["proxies"][0]["cipher"], "aes-256-gcm");
    assert_eq!(doc["proxies"][1]["ws-opts"]["path"].as_str().unwrap().len(), 100);

    let groups = &doc["proxy-groups"];
    assert_eq!(names(groups), ["PROXY", "A", "AUTO"]);
    assert_eq!(names(&groups[0]["proxies"]), ["A", "AUTO"]);
    assert_eq!(names(&groups[1]["proxies"]), ["a1", "a2"]);
    assert_eq!(names(&groups[2]["proxies"]), ["a1", "a2"]);
    assert_eq!(groups[2]["type"], "url-test");

    // template settings survive, provider settings do not leak in
    assert_eq!(doc["mixed-port"].as_u64(), Some(7890));
    assert!(doc.get("port").is_none());
    let rules = doc["rules"].as_sequence().unwrap();
    assert_eq!(rules.last().unwrap(), "MATCH,PROXY");

    let head = a_seen.lock().unwrap()[0].to_lowercase();
    assert!(head.contains("user-agent: clash-verge/v2.2.3"));
}

#[tokio::test]
async fn test_source_order_is_config_order() {
    let (slow_addr, _) = common::start_programmable_provider(|| async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        (200, PROVIDER_C.to_string())
    })
    .await;
    let (fast_addr, _) = common::start_mock_provider(200, PROVIDER_A).await;

    let service = common::start_service(config_with(vec![
        Source::new("Slow", format!("http://{}/sub", slow_addr)),
        Source::new("Fast", format!("http://{}/sub", fast_addr)),
    ]))
    .await;

    let text = common::client()
        .get(service.url(&format!("/subs/{}", TOKEN)))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let doc: Value = serde_yaml::from_str(&text).unwrap();

    assert_eq!(names(&doc["proxies"]), ["c1", "a1", "a2"]);
    assert_eq!(names(&doc["proxy-groups"]), ["PROXY", "Slow", "Fast", "AUTO"]);
}

#[tokio::test]
async fn test_timed_out_source_is_skipped() {
    let (hang_addr, _) = common::start_programmable_provider(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        (200, PROVIDER_A.to_string())
    })
    .await;
    let (c_addr, _) = common::start_mock_provider(200, PROVIDER_C).await;

    let mut config = config_with(vec![
        Source::new("Hang", format!("http://{}/sub", hang_addr)),
        Source::new("C", format!("http://{}/sub", c_addr)),
    ]);
    config.fetch.timeout_secs = 1;
    let service = common::start_service(config).await;

    let res = common::client()
        .get(service.url(&format!("/subs/{}", TOKEN)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let doc: Value = serde_yaml::from_str(&res.text().await.unwrap()).unwrap();
    assert_eq!(names(&doc["proxies"]), ["c1"]);
    assert_eq!(names(&doc["proxy-groups"]), ["PROXY", "C", "AUTO"]);
}

#[tokio::test]
async fn test_slow_sources_do_not_fail_request() {
    let (a_addr, _) = common::start_mock_provider(200, PROVIDER_A).await;
    let slow = || async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        (200, PROVIDER_C.to_string())
    };
    let (slow1_addr, _) = common::start_programmable_provider(slow).await;
    let (slow2_addr, _) = common::start_programmable_provider(slow).await;

    // one fetch at a time: the second slow source would finish past the
    // request timeout without the merge deadline
    let mut config = config_with(vec![
        Source::new("A", format!("http://{}/sub", a_addr)),
        Source::new("Slow1", format!("http://{}/sub", slow1_addr)),
        Source::new("Slow2", format!("http://{}/sub", slow2_addr)),
    ]);
    config.listener.request_timeout_secs = 3;
    config.fetch.timeout_secs = 2;
    config.fetch.max_concurrency = 1;
    let service = common::start_service(config).await;

    let res = common::client()
        .get(service.url(&format!("/subs/{}", TOKEN)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let doc: Value = serde_yaml::from_str(&res.text().await.unwrap()).unwrap();
    assert_eq!(names(&doc["proxies"]), ["a1", "a2"]);
    assert_eq!(names(&doc["proxy-groups"]), ["PROXY", "A", "AUTO"]);
}

#[tokio::test]
async fn test_oversized_source_is_skipped() {
    let (big_addr, _) = common::start_mock_provider(200, PROVIDER_A).await;
    let (c_addr, _) = common::start_mock_provider(200, PROVIDER_C).await;

    let mut config = config_with(vec![
        Source::new("Big", format!("http://{}/sub", big_addr)),
        Source::new("C", format!("http://{}/sub", c_addr)),
    ]);
    config.fetch.max_body_bytes = 128;
    let service = common::start_service(config).await;

    let res = common::client()
        .get(service.url(&format!("/subs/{}", TOKEN)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let doc: Value = serde_yaml::from_str(&res.text().await.unwrap()).unwrap();
    assert_eq!(names(&doc["proxies"]), ["c1"]);
    assert_eq!(names(&doc["proxy-groups"]), ["PROXY", "C", "AUTO"]);
}

#[tokio::test]
async fn test_all_sources_unusable_is_error() {
    let (down_addr, _) = common::start_mock_provider(503, "maintenance").await;
    let (empty_addr, _) = common::start_mock_provider(200, "proxies: []\n").await;

    let service = common::start_service(config_with(vec![
        Source::new("Down", format!("http://{}/sub", down_addr)),
        Source::new("Empty", format!("http://{}/sub", empty_addr)),
    ]))
    .await;

    let res = common::client()
        .get(service.url(&format!("/subs/{}", TOKEN)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body = res.text().await.unwrap();
    assert!(body.contains("no usable subscriptions"), "body: {}", body);
}

#[tokio::test]
async fn test_rejections_before_merge() {
    let (a_addr, a_seen) = common::start_mock_provider(200, PROVIDER_A).await;
    let service = common::start_service(config_with(vec![Source::new(
        "A",
        format!("http://{}/sub", a_addr),
    )]))
    .await;
    let client = common::client();

    let res = client.get(service.url("/subs/wrong")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.text().await.unwrap().contains("invalid token"));
    assert!(a_seen.lock().unwrap().is_empty(), "no fetch for a bad token");

    let res = client.get(service.url("/other")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.get(service.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_no_sources_configured() {
    let service = common::start_service(config_with(Vec::new())).await;

    let res = common::client()
        .get(service.url(&format!("/subs/{}", TOKEN)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(res
        .text()
        .await
        .unwrap()
        .contains("no subscription sources configured"));
}

#[tokio::test]
async fn test_sources_read_per_request() {
    let (a_addr, _) = common::start_mock_provider(200, PROVIDER_A).await;
    let (c_addr, _) = common::start_mock_provider(200, PROVIDER_C).await;
    let service = common::start_service(config_with(vec![Source::new(
        "A",
        format!("http://{}/sub", a_addr),
    )]))
    .await;
    let client = common::client();
    let url = service.url(&format!("/subs/{}", TOKEN));

    let first: Value =
        serde_yaml::from_str(&client.get(&url).send().await.unwrap().text().await.unwrap())
            .unwrap();
    assert_eq!(names(&first["proxies"]), ["a1", "a2"]);

    service
        .store
        .set_sources(&[Source::new("C", format!("http://{}/sub", c_addr))])
        .unwrap();

    let second: Value =
        serde_yaml::from_str(&client.get(&url).send().await.unwrap().text().await.unwrap())
            .unwrap();
    assert_eq!(names(&second["proxies"]), ["c1"]);
    assert_eq!(names(&second["proxy-groups"]), ["PROXY", "C", "AUTO"]);
}
